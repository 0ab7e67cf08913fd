//! The optional init step, run to completion before any signal is blocked or
//! any supervised child is started.

use std::process::Command;

use tracing::info;

use crate::error::{InitError, InitResult};

/// Run `argv` and wait for it. Anything other than a zero exit is an error.
pub fn run(argv: &[String]) -> InitResult<()> {
    let Some((program, args)) = argv.split_first() else {
        return Err(InitError::InitCommand("empty command".into()));
    };
    let command = argv.join(" ");
    info!(command = %command, "running init command");

    let status = Command::new(program)
        .args(args)
        .status()
        .map_err(|e| InitError::InitCommand(format!("{command}: {e}")))?;

    if status.success() {
        info!(command = %command, "init command finished");
        Ok(())
    } else {
        Err(InitError::InitCommand(format!("{command}: {status}")))
    }
}
