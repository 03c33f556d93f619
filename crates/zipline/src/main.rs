use std::io::{self, IsTerminal};
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;

mod cli;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cli.log_level()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_ansi(io::stderr().is_terminal())
        .init();

    let config = cli.session_config();
    let mut stdout = io::stdout().lock();

    match zipline::run(io::stdin().lock(), &mut stdout, &config) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("zipline: {}: {}", err.kind(), err);
            ExitCode::from(err.exit_code())
        }
    }
}
