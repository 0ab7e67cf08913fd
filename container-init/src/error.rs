use supervisor::SupervisorError;

/// Exit code for a bad config file or a supervisor failure after startup.
pub const RUNTIME_FAILED: u8 = 1;
/// Exit code when the init command does not succeed.
pub const INIT_COMMAND_FAILED: u8 = 1;
/// Exit code when a child process cannot be created at all.
pub const SPAWN_FAILED: u8 = 255;

#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("config error: {0}")]
    Config(String),

    #[error("init command failed: {0}")]
    InitCommand(String),

    #[error("supervisor error: {0}")]
    Supervisor(#[from] SupervisorError),
}

impl InitError {
    /// Process exit code for a failure that happens before or instead of the
    /// supervisor loop finishing normally.
    pub fn exit_code(&self) -> u8 {
        match self {
            InitError::Config(_) => RUNTIME_FAILED,
            InitError::InitCommand(_) => INIT_COMMAND_FAILED,
            InitError::Supervisor(SupervisorError::Spawn(_)) => SPAWN_FAILED,
            InitError::Supervisor(_) => RUNTIME_FAILED,
        }
    }
}

pub type InitResult<T> = Result<T, InitError>;

#[cfg(test)]
mod tests {
    use nix::errno::Errno;
    use supervisor::SpawnError;

    use super::*;

    #[test]
    fn exit_codes() {
        assert_eq!(InitError::Config("bad".into()).exit_code(), RUNTIME_FAILED);
        assert_eq!(
            InitError::InitCommand("exit 4".into()).exit_code(),
            INIT_COMMAND_FAILED
        );
        let spawn = SupervisorError::Spawn(SpawnError::Fork {
            program: "app".into(),
            source: Errno::EAGAIN,
        });
        assert_eq!(InitError::from(spawn).exit_code(), SPAWN_FAILED);
        let wait = SupervisorError::SignalWait(Errno::EINVAL);
        assert_eq!(InitError::from(wait).exit_code(), RUNTIME_FAILED);
    }
}
