use nix::errno::Errno;

#[derive(Debug, thiserror::Error)]
pub enum SpawnError {
    #[error("empty command")]
    EmptyCommand,

    #[error("invalid argument {arg:?}: contains a NUL byte")]
    InvalidArgument { arg: String },

    #[error("unable to fork {program}: {source}")]
    Fork {
        program: String,
        #[source]
        source: Errno,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum SupervisorError {
    #[error("spawn error: {0}")]
    Spawn(#[from] SpawnError),

    #[error("unable to block signals: {0}")]
    SignalMask(#[source] Errno),

    #[error("waiting for signals failed: {0}")]
    SignalWait(#[source] Errno),
}

pub type Result<T> = std::result::Result<T, SupervisorError>;
