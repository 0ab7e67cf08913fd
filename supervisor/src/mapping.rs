use nix::sys::signal::Signal;

/// Ordered table of `(from, to)` signal rewrites applied before a signal is
/// relayed to the primary process.
///
/// Lookups scan in insertion order and the first matching `from` wins, so a
/// later duplicate entry never overrides an earlier one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SignalMapping {
    entries: Vec<(Signal, Signal)>,
}

impl SignalMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a rewrite. Entries added earlier take precedence.
    pub fn push(&mut self, from: Signal, to: Signal) {
        self.entries.push((from, to));
    }

    /// Rewrite `signal` according to the table. Unmapped signals pass through.
    pub fn translate(&self, signal: Signal) -> Signal {
        self.entries
            .iter()
            .find(|(from, _)| *from == signal)
            .map_or(signal, |(_, to)| *to)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Signal, Signal)> {
        self.entries.iter()
    }
}

impl FromIterator<(Signal, Signal)> for SignalMapping {
    fn from_iter<I: IntoIterator<Item = (Signal, Signal)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
        }
    }
}

impl Extend<(Signal, Signal)> for SignalMapping {
    fn extend<I: IntoIterator<Item = (Signal, Signal)>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_mapping_is_identity() {
        let mapping = SignalMapping::new();
        for signal in Signal::iterator() {
            assert_eq!(mapping.translate(signal), signal);
        }
    }

    #[test]
    fn mapped_signal_is_rewritten() {
        let mapping: SignalMapping = [(Signal::SIGTERM, Signal::SIGQUIT)].into_iter().collect();
        assert_eq!(mapping.translate(Signal::SIGTERM), Signal::SIGQUIT);
    }

    #[test]
    fn unmapped_signals_pass_through() {
        let mapping: SignalMapping = [
            (Signal::SIGTERM, Signal::SIGQUIT),
            (Signal::SIGHUP, Signal::SIGUSR2),
        ]
        .into_iter()
        .collect();
        for signal in Signal::iterator().filter(|s| ![Signal::SIGTERM, Signal::SIGHUP].contains(s)) {
            assert_eq!(mapping.translate(signal), signal);
        }
    }

    #[test]
    fn first_match_wins_over_later_duplicates() {
        let mut mapping = SignalMapping::new();
        mapping.push(Signal::SIGINT, Signal::SIGHUP);
        mapping.push(Signal::SIGINT, Signal::SIGUSR1);
        mapping.push(Signal::SIGINT, Signal::SIGUSR2);
        assert_eq!(mapping.translate(Signal::SIGINT), Signal::SIGHUP);
        assert_eq!(mapping.len(), 3);
    }

    #[test]
    fn mapping_is_not_transitive() {
        let mapping: SignalMapping = [
            (Signal::SIGTERM, Signal::SIGQUIT),
            (Signal::SIGQUIT, Signal::SIGKILL),
        ]
        .into_iter()
        .collect();
        assert_eq!(mapping.translate(Signal::SIGTERM), Signal::SIGQUIT);
        assert_eq!(mapping.translate(Signal::SIGQUIT), Signal::SIGKILL);
    }

    #[test]
    fn extend_appends_with_lower_precedence() {
        let mut mapping: SignalMapping = [(Signal::SIGTERM, Signal::SIGQUIT)].into_iter().collect();
        mapping.extend([(Signal::SIGTERM, Signal::SIGINT), (Signal::SIGHUP, Signal::SIGUSR1)]);
        assert_eq!(mapping.translate(Signal::SIGTERM), Signal::SIGQUIT);
        assert_eq!(mapping.translate(Signal::SIGHUP), Signal::SIGUSR1);
        assert_eq!(
            mapping.iter().copied().collect::<Vec<_>>(),
            vec![
                (Signal::SIGTERM, Signal::SIGQUIT),
                (Signal::SIGTERM, Signal::SIGINT),
                (Signal::SIGHUP, Signal::SIGUSR1),
            ]
        );
    }
}
