//! Process-global log sink.
//!
//! Initialised exactly once at boot, before any log call, and read-only
//! thereafter. Library crates emit through `tracing` macros and never see
//! this module.

use archi_core::Verbosity;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::fmt;

/// Installs the global subscriber: stderr writer, colors on request, level
/// derived from the verbosity.
pub fn init(verbosity: Verbosity, no_color: bool) {
    fmt()
        .with_max_level(LevelFilter::from(verbosity))
        .with_ansi(!no_color)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
