//! PiGFX command sender
//!
//! Sends bitmap, blit and palette commands to a PiGFX terminal over a
//! serial port, or prints them with `--dry-run`.

use std::io;
use std::process::ExitCode;

use clap::Parser;
use pigfx_link::cli::{self, CliArgs};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> ExitCode {
    // Logs go to stderr so dry-run output on stdout stays byte-exact
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args = CliArgs::parse();

    match cli::run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        },
    }
}
