//! The Archipelago host executable.
//!
//! Boot sequence: parse arguments, install the log sink, show the logo,
//! populate the reserved contexts, then apply every configuration blob in
//! command-line order. The first failure maps its status code to the
//! process exit code; teardown finalizes the surviving contexts in reverse
//! creation order.

mod args;
mod banner;
mod logging;
mod runtime;

use std::process::ExitCode;

use archi_core::{exit_code, ArchiError};
use clap::error::ErrorKind;
use clap::Parser;
use tracing::{error, info};

use crate::args::Args;
use crate::runtime::Runtime;

fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(err)
            if matches!(
                err.kind(),
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion
            ) =>
        {
            let _ = err.print();
            return ExitCode::SUCCESS;
        }
        Err(err) => {
            let _ = err.print();
            return to_exit_code(ArchiError::misuse("invalid command line arguments").code());
        }
    };

    logging::init(args.verbosity(), args.no_color);

    if !args.no_logo {
        banner::print_logo(args.no_color);
    }

    if args.inputs.is_empty() {
        return ExitCode::SUCCESS;
    }

    to_exit_code(run(&args))
}

fn run(args: &Args) -> i32 {
    info!(
        inputs = args.inputs.len(),
        dry_run = args.dry_run,
        "initializing the application"
    );

    let mut runtime = match Runtime::new(args.dry_run) {
        Ok(runtime) => runtime,
        Err(err) => {
            error!(code = err.code(), "boot failed: {err}");
            return err.code();
        }
    };

    for path in &args.inputs {
        if let Err(err) = runtime.apply_file(path) {
            error!(
                path = %path.display(),
                code = err.code(),
                "configuration failed: {err}"
            );
            return err.code();
        }
    }

    info!("all configurations applied");
    0
}

fn to_exit_code(status: i32) -> ExitCode {
    ExitCode::from(exit_code(status).clamp(0, 255) as u8)
}
