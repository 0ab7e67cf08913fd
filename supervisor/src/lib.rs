//! PID 1 supervisor core: runs a primary program and an optional sidecar,
//! relays signals through a remapping table, reaps zombies, and sequences a
//! two-phase shutdown.

mod error;
mod host;
mod mapping;
mod process;
mod signals;
mod spawn;
mod supervisor;

pub use error::{Result, SpawnError, SupervisorError};
pub use host::{Host, Received, SystemHost};
pub use mapping::SignalMapping;
pub use nix::sys::signal::Signal;
pub use nix::unistd::Pid;
pub use process::{ManagedProcess, Reaped, Role};
pub use signals::{UnknownSignal, parse_signal};
pub use spawn::{EXEC_FAILED, SETSID_FAILED};
pub use supervisor::{Supervisor, SupervisorConfig};
