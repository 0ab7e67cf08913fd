//! The supervisor event loop.
//!
//! One thread, one blocking call: wait for the next signal, dispatch it,
//! repeat until every tracked child has been reaped. All state changes happen
//! in ordinary control flow, never in a signal handler.

use nix::sys::signal::Signal;
use nix::unistd::Pid;
use tracing::{info, warn};

use crate::error::{Result, SupervisorError};
use crate::host::{Host, Received};
use crate::mapping::SignalMapping;
use crate::process::{ManagedProcess, Role};

/// Signal the sidecar receives when a graceful shutdown starts.
const SECONDARY_STOP_SIGNAL: Signal = Signal::SIGINT;

/// Everything needed to start supervising, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct SupervisorConfig {
    /// Program and arguments of the primary process.
    pub primary: Vec<String>,
    /// Sidecar command, `None` when the sidecar is disabled.
    pub secondary: Option<Vec<String>>,
    /// Rewrites applied to signals relayed to the primary.
    pub mapping: SignalMapping,
    /// Extra graceful-shutdown trigger besides SIGTERM and SIGINT.
    pub shutdown_signal: Option<Signal>,
}

pub struct Supervisor<H: Host> {
    host: H,
    primary: ManagedProcess,
    secondary: Option<ManagedProcess>,
    mapping: SignalMapping,
    shutdown_signal: Option<Signal>,
    /// The sidecar has already been told to stop.
    shutdown_initiated: bool,
}

impl<H: Host> Supervisor<H> {
    /// Spawn the primary and, if configured, the secondary.
    ///
    /// The host must already have all signals blocked. If the secondary cannot
    /// be forked the primary is killed so nothing is left running unsupervised.
    pub fn start(mut host: H, config: SupervisorConfig) -> Result<Self> {
        let SupervisorConfig {
            primary,
            secondary,
            mapping,
            shutdown_signal,
        } = config;

        let primary_pid = host.spawn(&primary)?;
        info!(pid = %primary_pid, command = %primary.join(" "), "started primary");

        let secondary = match secondary {
            Some(argv) => match host.spawn(&argv) {
                Ok(pid) => {
                    info!(pid = %pid, command = %argv.join(" "), "started secondary");
                    Some(ManagedProcess::spawned(Role::Secondary, pid))
                }
                Err(e) => {
                    if let Err(kill_err) = host.send(primary_pid, Signal::SIGKILL) {
                        warn!(pid = %primary_pid, error = %kill_err, "unable to kill primary");
                    }
                    return Err(SupervisorError::Spawn(e));
                }
            },
            None => None,
        };

        Ok(Self {
            host,
            primary: ManagedProcess::spawned(Role::Primary, primary_pid),
            secondary,
            mapping,
            shutdown_signal,
            shutdown_initiated: false,
        })
    }

    /// Run the event loop until both children are gone and return the
    /// combined exit status.
    pub fn run(mut self) -> Result<i32> {
        while self.is_running() {
            let received = self
                .host
                .next_signal()
                .map_err(SupervisorError::SignalWait)?;
            self.dispatch(received);
        }
        Ok(self.report())
    }

    /// `true` while any tracked child is alive.
    pub fn is_running(&self) -> bool {
        self.primary.is_alive() || self.secondary.as_ref().is_some_and(ManagedProcess::is_alive)
    }

    pub fn primary(&self) -> &ManagedProcess {
        &self.primary
    }

    pub fn secondary(&self) -> Option<&ManagedProcess> {
        self.secondary.as_ref()
    }

    pub fn shutdown_initiated(&self) -> bool {
        self.shutdown_initiated
    }

    /// Handle one signal.
    ///
    /// Signals without a [`Signal`] name cannot appear in the mapping or as a
    /// shutdown trigger, so they go to the primary unchanged.
    pub fn dispatch(&mut self, received: Received) {
        match received {
            Received::Named(signal) => self.handle(signal),
            Received::Raw(signum) => self.forward_raw(signum),
        }
    }

    fn handle(&mut self, signal: Signal) {
        info!(%signal, "received signal");
        if signal == Signal::SIGCHLD {
            self.reap_children();
        } else if signal == Signal::SIGKILL {
            self.hard_shutdown();
        } else if self.is_shutdown_signal(signal) {
            self.graceful_shutdown(signal);
        } else if self.primary.is_alive() {
            let target = self.mapping.translate(signal);
            self.send(Role::Primary, self.primary.pid(), target);
        }
    }

    fn forward_raw(&mut self, signum: libc::c_int) {
        info!(signum, "received signal");
        if !self.primary.is_alive() {
            return;
        }
        let pid = self.primary.pid();
        match self.host.send_raw(pid, signum) {
            Ok(()) => info!(role = %Role::Primary, pid = %pid, signum, "signalled process"),
            Err(e) => {
                warn!(role = %Role::Primary, pid = %pid, signum, error = %e, "unable to signal process")
            }
        }
    }

    /// Combined status: the primary's if nonzero, else the secondary's.
    pub fn exit_status(&self) -> i32 {
        let primary = self.primary.exit_status().unwrap_or(0);
        let secondary = self
            .secondary
            .as_ref()
            .and_then(ManagedProcess::exit_status)
            .unwrap_or(0);
        if primary != 0 { primary } else { secondary }
    }

    fn is_shutdown_signal(&self, signal: Signal) -> bool {
        matches!(signal, Signal::SIGTERM | Signal::SIGINT) || self.shutdown_signal == Some(signal)
    }

    /// Drain every exited child; SIGCHLDs coalesce, so one notification may
    /// stand for several exits.
    fn reap_children(&mut self) {
        while let Some(reaped) = self.host.reap() {
            if self.primary.matches(reaped.pid) {
                self.primary.mark_exited(reaped.status);
                info!(role = %Role::Primary, pid = %reaped.pid, status = reaped.status, "process exited");
                self.stop_secondary();
            } else if let Some(secondary) =
                self.secondary.as_mut().filter(|s| s.matches(reaped.pid))
            {
                secondary.mark_exited(reaped.status);
                info!(role = %Role::Secondary, pid = %reaped.pid, status = reaped.status, "process exited");
            } else {
                info!(pid = %reaped.pid, status = reaped.status, "reaped orphaned process");
            }
        }
    }

    fn graceful_shutdown(&mut self, signal: Signal) {
        info!(%signal, "starting graceful shutdown");
        self.stop_secondary();
        if self.primary.is_alive() {
            let target = self.mapping.translate(signal);
            self.send(Role::Primary, self.primary.pid(), target);
        }
    }

    fn hard_shutdown(&mut self) {
        info!("starting hard shutdown");
        if self.primary.is_alive() {
            self.send(Role::Primary, self.primary.pid(), Signal::SIGKILL);
        }
        if let Some(pid) = self.live_secondary_pid() {
            self.shutdown_initiated = true;
            self.send(Role::Secondary, pid, Signal::SIGKILL);
        }
    }

    /// Ask the sidecar to stop, at most once.
    fn stop_secondary(&mut self) {
        if self.shutdown_initiated {
            return;
        }
        if let Some(pid) = self.live_secondary_pid() {
            self.shutdown_initiated = true;
            self.send(Role::Secondary, pid, SECONDARY_STOP_SIGNAL);
        }
    }

    fn live_secondary_pid(&self) -> Option<Pid> {
        self.secondary
            .as_ref()
            .filter(|s| s.is_alive())
            .map(ManagedProcess::pid)
    }

    fn send(&mut self, role: Role, pid: Pid, signal: Signal) {
        match self.host.send(pid, signal) {
            Ok(()) => info!(%role, pid = %pid, %signal, "signalled process"),
            Err(e) => warn!(%role, pid = %pid, %signal, error = %e, "unable to signal process"),
        }
    }

    fn report(&self) -> i32 {
        let status = self.exit_status();
        let primary = self.primary.exit_status().unwrap_or(0);
        let secondary = self.secondary.as_ref().and_then(ManagedProcess::exit_status);
        if status == 0 {
            info!("clean exit");
        } else {
            warn!(primary, secondary = ?secondary, status, "dirty exit");
        }
        status
    }
}
