//! Router protocol state.

/// What pushed a router into a diffusing computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum ActiveReason {
    /// The feasibility check failed during the router's own recompute.
    DirectViolation,
    /// The feasibility check failed while answering a neighbor's query,
    /// or the current successor itself sent the query.
    QueryViolation,
}

/// PASSIVE, or ACTIVE with at most one diffusing computation in flight.
///
/// | variant | classic name |
/// |---|---|
/// | `Passive` | PASSIVE |
/// | `Active { DirectViolation, false }` | ACTIVE_DIRECT |
/// | `Active { QueryViolation, false }` | ACTIVE_FD_VIOLATION |
/// | `Active { _, true }` | ACTIVE_AWAIT (successor already answered) |
///
/// With `awaiting_successor` set, the successor's new distance is known
/// and the router only waits for the remaining replies. The reply owed to
/// the successor is held until the computation completes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeState {
    #[default]
    Passive,
    Active {
        reason: ActiveReason,
        awaiting_successor: bool,
    },
}

impl NodeState {
    #[inline]
    pub fn is_passive(self) -> bool {
        matches!(self, NodeState::Passive)
    }

    #[inline]
    pub fn is_active(self) -> bool {
        !self.is_passive()
    }

    /// The same computation after the successor's query has been absorbed.
    /// `Passive` is returned unchanged.
    pub(crate) fn awaiting(self) -> NodeState {
        match self {
            NodeState::Active { reason, .. } => NodeState::Active {
                reason,
                awaiting_successor: true,
            },
            NodeState::Passive => NodeState::Passive,
        }
    }
}

impl std::fmt::Display for NodeState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            NodeState::Passive => "passive",
            NodeState::Active { awaiting_successor: true, .. } => "active/await-successor",
            NodeState::Active { reason: ActiveReason::DirectViolation, .. } => "active/direct",
            NodeState::Active { reason: ActiveReason::QueryViolation, .. } => "active/fd-violation",
        };
        f.write_str(label)
    }
}
