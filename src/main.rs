//! `caravan` command-line entry point.
use std::process::ExitCode;
use std::sync::Arc;

use caravan::cli::Cli;
use caravan::commands;
use caravan::error::ExitReason;
use caravan::logging::{self, Logger};
use clap::{CommandFactory, Parser};

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();

    if std::env::args_os().len() <= 1 {
        let _ = Cli::command().print_help();
        return ExitCode::SUCCESS;
    }

    let args = Cli::parse();
    logging::init_subscriber(args.verbose, "caravan");
    let log = Arc::new(Logger::new("caravan"));

    let interrupt_log = Arc::clone(&log);
    if let Err(e) = ctrlc::set_handler(move || {
        interrupt_log.warn("Interrupted; changes made so far are kept");
        std::process::exit(i32::from(ExitReason::Interrupted.code()));
    }) {
        log.debug(&format!("cannot install interrupt handler: {e}"));
    }

    match commands::install::run(&args, &log) {
        Ok(report) => report.exit_reason().into(),
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitReason::from_error(&e).into()
        }
    }
}
