//! Fork/exec of supervised children.
//!
//! The child undoes the supervisor's signal setup before exec: the blocked
//! mask is lifted and SIGPIPE (ignored by the Rust runtime) goes back to its
//! default disposition. It then moves into a new session so terminal signals
//! only reach it through the supervisor's relay.

use std::ffi::{CStr, CString};

use nix::sys::signal::{SigHandler, SigSet, Signal};
use nix::unistd::{ForkResult, Pid, execvp, fork, setsid};
use tracing::error;

use crate::error::SpawnError;

/// Exit status of a child that could not create its own session.
pub const SETSID_FAILED: i32 = 1;
/// Exit status of a child whose exec failed.
pub const EXEC_FAILED: i32 = 2;

fn to_cstrings(argv: &[String]) -> Result<Vec<CString>, SpawnError> {
    if argv.is_empty() {
        return Err(SpawnError::EmptyCommand);
    }
    argv.iter()
        .map(|arg| {
            CString::new(arg.as_str()).map_err(|_| SpawnError::InvalidArgument { arg: arg.clone() })
        })
        .collect()
}

/// Fork and exec `argv`, returning the child's pid.
///
/// Only a failed `fork` is reported here. A failed `setsid` or exec shows up
/// later as the child exiting with [`SETSID_FAILED`] or [`EXEC_FAILED`].
pub(crate) fn spawn(argv: &[String], blocked: &SigSet) -> Result<Pid, SpawnError> {
    let args = to_cstrings(argv)?;
    let Some(program) = args.first() else {
        return Err(SpawnError::EmptyCommand);
    };

    // SAFETY: the supervisor is single-threaded, so the child inherits no
    // locks held by other threads. It only resets signal state, calls setsid
    // and execs (or exits).
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => Ok(child),
        Ok(ForkResult::Child) => exec_child(program, &args, blocked),
        Err(source) => Err(SpawnError::Fork {
            program: program.to_string_lossy().into_owned(),
            source,
        }),
    }
}

fn exec_child(program: &CStr, args: &[CString], blocked: &SigSet) -> ! {
    let _ = blocked.thread_unblock();
    // SAFETY: restoring the default disposition installs no handler.
    let _ = unsafe { nix::sys::signal::signal(Signal::SIGPIPE, SigHandler::SigDfl) };

    if let Err(e) = setsid() {
        error!(program = %program.to_string_lossy(), error = %e, "unable to setsid");
        exit_child(SETSID_FAILED);
    }

    let errno = match execvp(program, args) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    error!(program = %program.to_string_lossy(), error = %errno, "exec failed");
    exit_child(EXEC_FAILED)
}

fn exit_child(status: i32) -> ! {
    // SAFETY: `_exit` skips atexit handlers and stdio flushing that belong to
    // the parent's copy of the address space.
    unsafe { libc::_exit(status) }
}
