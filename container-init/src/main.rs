//! Container entrypoint that runs as PID 1.
//!
//! Startup sequence:
//! 1. Parse flags and the optional YAML config
//! 2. Run the init command, if any (exit immediately if it fails)
//! 3. Become child subreaper when not PID 1
//! 4. Block all signals, spawn the program and the optional sidecar
//! 5. Relay signals and reap children until both have exited
//!
//! The process exits with the program's status, or the sidecar's if the
//! program exited cleanly.

mod cli;
mod config;
mod error;
mod init_command;
mod pid1;
mod sidecar;

use std::fmt;
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use supervisor::{Supervisor, SupervisorConfig, SystemHost};
use tracing::error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use crate::cli::Cli;
use crate::config::FileConfig;
use crate::error::InitResult;

/// Environment variable holding the log filter directive.
const LOG_ENV: &str = "CONTAINER_INIT_LOG";

/// Uptime since startup as `[hh:mm:ss.mmm]`. An init process can run for
/// days, so hours are shown rather than wrapping at sixty minutes.
struct Elapsed(Instant);

impl FormatTime for Elapsed {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> fmt::Result {
        let d = self.0.elapsed();
        let total_secs = d.as_secs();
        let hours = total_secs / 3600;
        let mins = (total_secs / 60) % 60;
        let secs = total_secs % 60;
        let millis = d.subsec_millis();
        write!(w, "[{hours:02}:{mins:02}:{secs:02}.{millis:03}]")
    }
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(Elapsed(Instant::now()))
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(status) => ExitCode::from(status),
        Err(e) => {
            error!("{e}");
            ExitCode::from(e.exit_code())
        }
    }
}

fn run(cli: Cli) -> InitResult<u8> {
    let file = match &cli.config {
        Some(path) => config::load(path)?,
        None => FileConfig::default(),
    };
    let settings = config::resolve(cli, file)?;

    if let Some(argv) = &settings.init_command {
        init_command::run(argv)?;
    }

    let secondary = settings.sidecar.as_ref().and_then(sidecar::command);

    pid1::setup();

    let host = SystemHost::new()?;
    let supervisor = Supervisor::start(
        host,
        SupervisorConfig {
            primary: settings.program,
            secondary,
            mapping: settings.mapping,
            shutdown_signal: settings.shutdown_signal,
        },
    )?;
    let status = supervisor.run()?;
    Ok(u8::try_from(status).unwrap_or(u8::MAX))
}
