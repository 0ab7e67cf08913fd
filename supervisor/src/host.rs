use nix::errno::Errno;
use nix::sys::signal::{SigSet, Signal, kill};
use nix::unistd::Pid;
use tracing::warn;

use crate::error::{Result, SpawnError, SupervisorError};
use crate::process::Reaped;
use crate::spawn;

/// A signal taken off the pending set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Received {
    Named(Signal),
    /// A signal number with no [`Signal`] variant, such as a real-time signal.
    Raw(libc::c_int),
}

impl From<Signal> for Received {
    fn from(signal: Signal) -> Self {
        Received::Named(signal)
    }
}

/// Operating-system operations the supervisor loop depends on.
///
/// [`SystemHost`] talks to the kernel; tests drive the loop with a scripted
/// implementation.
pub trait Host {
    /// Start `argv` as a child in its own session.
    fn spawn(&mut self, argv: &[String]) -> std::result::Result<Pid, SpawnError>;
    /// Block until the next pending signal is available and return it.
    fn next_signal(&mut self) -> std::result::Result<Received, Errno>;
    /// Collect one exited child without blocking. `None` once nothing is left.
    fn reap(&mut self) -> Option<Reaped>;
    /// Deliver `signal` to `pid`.
    fn send(&mut self, pid: Pid, signal: Signal) -> std::result::Result<(), Errno>;
    /// Deliver a signal by number, for signals [`Signal`] cannot name.
    fn send_raw(&mut self, pid: Pid, signum: libc::c_int) -> std::result::Result<(), Errno>;
}

impl<H: Host + ?Sized> Host for &mut H {
    fn spawn(&mut self, argv: &[String]) -> std::result::Result<Pid, SpawnError> {
        (**self).spawn(argv)
    }

    fn next_signal(&mut self) -> std::result::Result<Received, Errno> {
        (**self).next_signal()
    }

    fn reap(&mut self) -> Option<Reaped> {
        (**self).reap()
    }

    fn send(&mut self, pid: Pid, signal: Signal) -> std::result::Result<(), Errno> {
        (**self).send(pid, signal)
    }

    fn send_raw(&mut self, pid: Pid, signum: libc::c_int) -> std::result::Result<(), Errno> {
        (**self).send_raw(pid, signum)
    }
}

/// The real host: every signal blocked on the calling thread, retrieved with
/// `sigwait`, children collected with `waitpid(-1, WNOHANG)`.
pub struct SystemHost {
    blocked: SigSet,
}

impl SystemHost {
    /// Block all signals on the calling thread.
    ///
    /// Must be called before any child is spawned and from the thread that
    /// will run the supervisor loop.
    pub fn new() -> Result<Self> {
        let blocked = SigSet::all();
        blocked.thread_block().map_err(SupervisorError::SignalMask)?;
        Ok(Self { blocked })
    }
}

impl Host for SystemHost {
    fn spawn(&mut self, argv: &[String]) -> std::result::Result<Pid, SpawnError> {
        spawn::spawn(argv, &self.blocked)
    }

    fn next_signal(&mut self) -> std::result::Result<Received, Errno> {
        let mut signum: libc::c_int = 0;
        // SAFETY: `blocked` wraps an initialized sigset_t and `signum` is a
        // valid out-pointer for the duration of the call.
        let rc = unsafe { libc::sigwait(self.blocked.as_ref(), &mut signum) };
        if rc != 0 {
            return Err(Errno::from_raw(rc));
        }
        Ok(match Signal::try_from(signum) {
            Ok(signal) => Received::Named(signal),
            Err(_) => Received::Raw(signum),
        })
    }

    fn reap(&mut self) -> Option<Reaped> {
        loop {
            let mut status: libc::c_int = 0;
            // SAFETY: `status` is a valid out-pointer for the duration of the
            // call. nix's `waitpid` cannot decode real-time signal deaths, so
            // the raw status is decoded by `Reaped`.
            let rc = unsafe { libc::waitpid(-1, &mut status, libc::WNOHANG) };
            match Errno::result(rc) {
                Ok(0) | Err(Errno::ECHILD) => return None,
                Ok(pid) => {
                    if let Some(reaped) = Reaped::from_raw_status(Pid::from_raw(pid), status) {
                        return Some(reaped);
                    }
                }
                Err(Errno::EINTR) => {}
                Err(e) => {
                    warn!(error = %e, "waitpid failed");
                    return None;
                }
            }
        }
    }

    fn send(&mut self, pid: Pid, signal: Signal) -> std::result::Result<(), Errno> {
        kill(pid, signal)
    }

    fn send_raw(&mut self, pid: Pid, signum: libc::c_int) -> std::result::Result<(), Errno> {
        // SAFETY: kill(2) takes plain integers and touches no memory.
        let rc = unsafe { libc::kill(pid.as_raw(), signum) };
        Errno::result(rc).map(drop)
    }
}
