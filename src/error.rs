//! Structured error types for the simulator.
//!
//! All fallible public APIs return [`DualResult`]. [`DualError::kind`]
//! groups the variants into the four failure classes callers react to
//! differently: bad topology input, protocol invariant breaches, round-cap
//! exhaustion and topology changes that collide with a running diffusing
//! computation.

use thiserror::Error;

use crate::node::{LinkId, NodeId, NodeState};

/// Coarse classification of a [`DualError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Topology,
    Protocol,
    NonConvergence,
    ActiveTopologyChange,
    Config,
}

/// A router was asked to do something its state forbids.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("feasibility check requested while {0}")]
    ChecksWhileActive(NodeState),

    #[error("reply from {from} received while passive")]
    ReplyWhilePassive { from: NodeId },

    #[error("cannot pin the destination while {0}")]
    PinWhileActive(NodeState),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum DualError {
    // ── Topology ──────────────────────────────────────────

    #[error("node {0} is not registered")]
    UnknownNode(NodeId),

    #[error("no node named {0:?}")]
    UnknownNodeName(String),

    #[error("node name {0:?} is already registered")]
    DuplicateNode(String),

    #[error("link {0} is not registered")]
    UnknownLink(LinkId),

    #[error("link from {0} to itself")]
    SelfLoop(NodeId),

    #[error("invalid link cost {0}")]
    InvalidCost(f64),

    #[error("{a} and {b} are already linked")]
    ParallelLink { a: NodeId, b: NodeId },

    #[error("routing entry for {neighbor} at {node} has no link")]
    MissingLink { node: NodeId, neighbor: NodeId },

    #[error("topology has not been finalized")]
    NotFinalized,

    // ── Protocol ──────────────────────────────────────────

    #[error("protocol violation at {node}: {violation}")]
    Protocol {
        node: NodeId,
        violation: ProtocolViolation,
    },

    // ── Run outcome ───────────────────────────────────────

    #[error("no convergence after {rounds} rounds, {pending} messages still pending")]
    NonConvergence { rounds: u64, pending: usize },

    #[error("change to link {link} rejected: {node} is {state}")]
    TopologyChangeDuringActiveComputation {
        link: LinkId,
        node: NodeId,
        state: NodeState,
    },

    // ── Config ────────────────────────────────────────────

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl DualError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DualError::UnknownNode(_)
            | DualError::UnknownNodeName(_)
            | DualError::DuplicateNode(_)
            | DualError::UnknownLink(_)
            | DualError::SelfLoop(_)
            | DualError::InvalidCost(_)
            | DualError::ParallelLink { .. }
            | DualError::MissingLink { .. }
            | DualError::NotFinalized => ErrorKind::Topology,
            DualError::Protocol { .. } => ErrorKind::Protocol,
            DualError::NonConvergence { .. } => ErrorKind::NonConvergence,
            DualError::TopologyChangeDuringActiveComputation { .. } => {
                ErrorKind::ActiveTopologyChange
            }
            DualError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn protocol(node: NodeId, violation: ProtocolViolation) -> Self {
        DualError::Protocol { node, violation }
    }
}

/// Convenience alias for `Result<T, DualError>`.
pub type DualResult<T> = Result<T, DualError>;
