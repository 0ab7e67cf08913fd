use std::fmt;

use nix::unistd::Pid;

/// Which tracked slot a child occupies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The user's program.
    Primary,
    /// The sidecar agent.
    Secondary,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Primary => f.write_str("primary"),
            Role::Secondary => f.write_str("secondary"),
        }
    }
}

/// A tracked child.
///
/// Starts alive and transitions exactly once, when it is reaped. A finished
/// slot keeps its terminal status for the final exit code computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedProcess {
    role: Role,
    pid: Pid,
    alive: bool,
    exit_status: i32,
}

impl ManagedProcess {
    pub fn spawned(role: Role, pid: Pid) -> Self {
        Self {
            role,
            pid,
            alive: true,
            exit_status: 0,
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn is_alive(&self) -> bool {
        self.alive
    }

    /// Terminal status, `None` while the process is still running.
    pub fn exit_status(&self) -> Option<i32> {
        (!self.alive).then_some(self.exit_status)
    }

    /// `true` if `pid` belongs to this slot and it has not been reaped yet.
    ///
    /// Once reaped the pid may be recycled by an unrelated process, so a dead
    /// slot never matches.
    pub fn matches(&self, pid: Pid) -> bool {
        self.alive && self.pid == pid
    }

    pub(crate) fn mark_exited(&mut self, status: i32) {
        if self.alive {
            self.alive = false;
            self.exit_status = status;
        }
    }
}

/// A child collected by `waitpid`, with its shell-style exit status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reaped {
    pub pid: Pid,
    pub status: i32,
}

impl Reaped {
    /// Convert a raw `waitpid` status: the exit code for a normal exit,
    /// `128 + signo` for a signal death. Non-terminal statuses yield `None`.
    ///
    /// Works on the raw status so signal numbers outside [`nix::sys::signal::Signal`]
    /// (real-time signals) still produce a terminal status.
    pub fn from_raw_status(pid: Pid, status: libc::c_int) -> Option<Self> {
        if libc::WIFEXITED(status) {
            Some(Self {
                pid,
                status: libc::WEXITSTATUS(status),
            })
        } else if libc::WIFSIGNALED(status) {
            Some(Self {
                pid,
                status: 128 + libc::WTERMSIG(status),
            })
        } else {
            None
        }
    }
}
