//! Signal name lookup for command-line and config arguments.

use std::str::FromStr;

use nix::sys::signal::Signal;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown signal: {0:?}")]
pub struct UnknownSignal(pub String);

/// Historical names accepted on top of the canonical `SIG*` names.
const ALIASES: &[(&str, Signal)] = &[
    ("CLD", Signal::SIGCHLD),
    ("IOT", Signal::SIGABRT),
    ("POLL", Signal::SIGIO),
    ("STP", Signal::SIGTSTP),
];

/// Parse a signal given as a number (`15`), a name (`TERM`) or a prefixed
/// name (`SIGTERM`). Names are case-insensitive.
pub fn parse_signal(input: &str) -> Result<Signal, UnknownSignal> {
    let unknown = || UnknownSignal(input.to_string());
    let trimmed = input.trim();

    if let Ok(num) = trimmed.parse::<i32>() {
        return Signal::try_from(num).map_err(|_| unknown());
    }

    let upper = trimmed.to_ascii_uppercase();
    let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
    if bare.is_empty() {
        return Err(unknown());
    }
    if let Some((_, signal)) = ALIASES.iter().find(|(name, _)| *name == bare) {
        return Ok(*signal);
    }
    Signal::from_str(&format!("SIG{bare}")).map_err(|_| unknown())
}
