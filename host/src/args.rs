//! Command-line arguments of the host executable.

use std::path::PathBuf;

use archi_core::Verbosity;
use clap::Parser;

/// Command-line arguments.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "archi",
    version = env!("CARGO_PKG_VERSION"),
    about = "Archipelago - a plugin-driven execution host",
    long_about = "Applies memory-image configuration blobs in command-line order: \
                  opens the declared libraries, registers their interfaces, and \
                  replays each blob's configuration script against the context \
                  registry."
)]
pub struct Args {
    /// Pathnames of configuration blobs, applied in order.
    #[arg(value_name = "BLOB")]
    pub inputs: Vec<PathBuf>,

    /// Do a dry run: parse and log every step, execute nothing.
    #[arg(short = 'n', long = "dry-run")]
    pub dry_run: bool,

    /// Don't display the logo.
    #[arg(short = 'L', long = "no-logo")]
    pub no_logo: bool,

    /// Disable the use of colors for log messages.
    #[arg(short = 'm', long = "no-color")]
    pub no_color: bool,

    /// Set the logging verbosity: 0-5 or one of
    /// quiet/error/warning/notice/info/debug/max. Without an argument the
    /// level is `info`.
    #[arg(
        short = 'v',
        long = "verbose",
        value_name = "LEVEL",
        num_args = 0..=1,
        default_missing_value = "info"
    )]
    pub verbose: Option<Verbosity>,
}

impl Args {
    /// The effective verbosity: `notice` unless `--verbose` was given.
    pub fn verbosity(&self) -> Verbosity {
        self.verbose.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::parse_from(["archi"]);
        assert!(args.inputs.is_empty());
        assert!(!args.dry_run);
        assert!(!args.no_logo);
        assert!(!args.no_color);
        assert_eq!(args.verbosity(), Verbosity::Notice);
    }

    #[test]
    fn verbose_without_argument_means_info() {
        let args = Args::parse_from(["archi", "--verbose"]);
        assert_eq!(args.verbosity(), Verbosity::Info);
    }

    #[test]
    fn verbose_accepts_levels_and_names() {
        let args = Args::parse_from(["archi", "-v", "2"]);
        assert_eq!(args.verbosity(), Verbosity::Warning);

        let args = Args::parse_from(["archi", "--verbose", "debug"]);
        assert_eq!(args.verbosity(), Verbosity::Debug);
    }

    #[test]
    fn invalid_verbosity_is_rejected() {
        assert!(Args::try_parse_from(["archi", "-v", "shouty"]).is_err());
        assert!(Args::try_parse_from(["archi", "-v", "9"]).is_err());
    }

    #[test]
    fn inputs_keep_command_line_order() {
        let args = Args::parse_from(["archi", "b.blob", "a.blob"]);
        let names: Vec<_> = args
            .inputs
            .iter()
            .map(|path| path.to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["b.blob", "a.blob"]);
    }

    #[test]
    fn flags_parse() {
        let args = Args::parse_from(["archi", "-n", "-L", "-m", "x.blob"]);
        assert!(args.dry_run);
        assert!(args.no_logo);
        assert!(args.no_color);
        assert_eq!(args.inputs.len(), 1);
    }
}
