//! `aquila-install` binary entry point.
use std::process::ExitCode;

use aquila_install::cli::{Cli, Command};
use aquila_install::commands;
use aquila_install::logging::{self, Logger};
use clap::Parser;

fn main() -> ExitCode {
    let _ = enable_ansi_support::enable_ansi_support();
    let args = Cli::parse();
    let log_file = args.global.log_file.as_deref();
    let file_ok = logging::init_subscriber(args.verbose, log_file);
    let log = Logger::new();
    if !file_ok && let Some(path) = log_file {
        log.warn(&format!("cannot open log file {}", path.display()));
    }

    let result = match args.command.unwrap_or(Command::Install) {
        Command::Install => commands::install::run(&args.global, &log),
        Command::Paths => commands::paths::run(&args.global, &log),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log.error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}
