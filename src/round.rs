/// Logical round counter for the bulk-synchronous scheduler.
///
/// A round is one batch of message deliveries. Everything a handler sends
/// during round `N` is delivered in round `N + 1` at the earliest, so the
/// round number is the only notion of time in the simulator.

/// A round index. Round 0 is the setup phase before the first delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Round(u64);

impl Round {
    /// The setup phase, before any message has been delivered.
    pub const ZERO: Round = Round(0);

    /// Create a round from a raw counter value.
    #[inline]
    pub fn new(n: u64) -> Self {
        Round(n)
    }

    /// Return the raw counter value.
    #[inline]
    pub fn number(self) -> u64 {
        self.0
    }

    /// The round after this one. Saturates at `u64::MAX`.
    #[inline]
    pub fn next(self) -> Round {
        Round(self.0.saturating_add(1))
    }
}

impl std::fmt::Display for Round {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "R{}", self.0)
    }
}
