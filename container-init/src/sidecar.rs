//! Sidecar directory preconditions.
//!
//! The sidecar is optional: when its data or config directory is missing the
//! container still runs, just without the agent.

use std::path::{Path, PathBuf};

use nix::errno::Errno;
use nix::unistd::{AccessFlags, access};
use tracing::warn;

use crate::config::SidecarConfig;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Unavailable {
    #[error("{} does not exist", .0.display())]
    Missing(PathBuf),

    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("{} access error: {source}", .path.display())]
    Access {
        path: PathBuf,
        #[source]
        source: Errno,
    },
}

fn check_dir(path: &Path) -> Result<(), Unavailable> {
    match access(path, AccessFlags::F_OK) {
        Ok(()) if path.is_dir() => Ok(()),
        Ok(()) | Err(Errno::ENOTDIR) => Err(Unavailable::NotADirectory(path.to_path_buf())),
        Err(Errno::ENOENT) => Err(Unavailable::Missing(path.to_path_buf())),
        Err(source) => Err(Unavailable::Access {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Verify the sidecar's data and config directories.
pub fn check(config: &SidecarConfig) -> Result<(), Unavailable> {
    check_dir(&config.data_dir)?;
    check_dir(&config.config_dir)
}

/// Sidecar command line, or `None` (with a warning) when its directories are
/// not usable.
pub fn command(config: &SidecarConfig) -> Option<Vec<String>> {
    match check(config) {
        Ok(()) => Some(config.argv()),
        Err(e) => {
            warn!(error = %e, "sidecar will not be started");
            None
        }
    }
}
