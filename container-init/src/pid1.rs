//! PID 1 responsibilities outside the supervisor loop.
//!
//! As PID 1 the kernel reparents every orphan to us. When started anywhere
//! else (a test harness, `docker run --init` with another init in front) we
//! ask to become a child subreaper so orphans of our children still end up
//! here and get reaped by the supervisor's SIGCHLD handling.

use tracing::{debug, info, warn};

pub fn is_pid1() -> bool {
    nix::unistd::getpid().as_raw() == 1
}

/// Make sure orphaned descendants are reparented to this process.
pub fn setup() {
    if is_pid1() {
        debug!("running as PID 1");
        return;
    }
    match set_child_subreaper() {
        Ok(()) => info!("not PID 1, registered as child subreaper"),
        Err(e) => warn!(error = %e, "not PID 1 and unable to become child subreaper"),
    }
}

#[cfg(target_os = "linux")]
fn set_child_subreaper() -> std::io::Result<()> {
    let enable: libc::c_ulong = 1;
    let unused: libc::c_ulong = 0;
    // SAFETY: PR_SET_CHILD_SUBREAPER only reads its integer argument.
    let rc = unsafe { libc::prctl(libc::PR_SET_CHILD_SUBREAPER, enable, unused, unused, unused) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}

#[cfg(not(target_os = "linux"))]
fn set_child_subreaper() -> std::io::Result<()> {
    Ok(())
}
