//! Log verbosity levels.
//!
//! The host configures the process-global log sink once at boot from one of
//! these levels; library crates emit through `tracing` and never consult the
//! level directly.

use std::fmt;
use std::str::FromStr;

use tracing::level_filters::LevelFilter;

use crate::error::ArchiError;

/// Log verbosity level, ordered from silent to chatty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum Verbosity {
    /// Disable all logging.
    Quiet = 0,
    /// Print errors only.
    Error = 1,
    /// Print errors and warnings only.
    Warning = 2,
    /// Print errors, warnings and notices.
    #[default]
    Notice = 3,
    /// Print errors, warnings, notices and info messages.
    Info = 4,
    /// Print everything.
    Debug = 5,
}

/// The highest verbosity level.
pub const VERBOSITY_MAX: Verbosity = Verbosity::Debug;

impl Verbosity {
    /// Returns the numeric level, `0` to `5`.
    pub fn level(self) -> i32 {
        self as i32
    }

    /// Converts a numeric level, rejecting out-of-range values.
    pub fn from_level(level: i32) -> Option<Self> {
        match level {
            0 => Some(Self::Quiet),
            1 => Some(Self::Error),
            2 => Some(Self::Warning),
            3 => Some(Self::Notice),
            4 => Some(Self::Info),
            5 => Some(Self::Debug),
            _ => None,
        }
    }
}

impl FromStr for Verbosity {
    type Err = ArchiError;

    /// Accepts a numeral `0`–`5` or one of
    /// `quiet|error|warning|notice|info|debug|max`.
    fn from_str(text: &str) -> Result<Self, Self::Err> {
        match text {
            "quiet" => Ok(Self::Quiet),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "notice" => Ok(Self::Notice),
            "info" => Ok(Self::Info),
            "debug" => Ok(Self::Debug),
            "max" => Ok(VERBOSITY_MAX),
            _ => text
                .parse::<i32>()
                .ok()
                .and_then(Self::from_level)
                .ok_or_else(|| {
                    ArchiError::value("verbosity", "expected 0-5 or a level name")
                }),
        }
    }
}

impl fmt::Display for Verbosity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Quiet => "quiet",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Notice => "notice",
            Self::Info => "info",
            Self::Debug => "debug",
        };
        f.write_str(name)
    }
}

impl From<Verbosity> for LevelFilter {
    /// `tracing` has no NOTICE level; notices and info messages share INFO.
    fn from(verbosity: Verbosity) -> Self {
        match verbosity {
            Verbosity::Quiet => LevelFilter::OFF,
            Verbosity::Error => LevelFilter::ERROR,
            Verbosity::Warning => LevelFilter::WARN,
            Verbosity::Notice | Verbosity::Info => LevelFilter::INFO,
            Verbosity::Debug => LevelFilter::DEBUG,
        }
    }
}
