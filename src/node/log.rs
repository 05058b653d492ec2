//! Per-router event log.
//!
//! Append-only and advisory: protocol logic writes to it but never reads
//! it. Entries are structured; `Display` renders the one-line
//! human-readable form a presentation layer shows next to the router.

use crate::message::MessageKind;
use crate::round::Round;

use super::distance::{Distance, DistanceState};
use super::id::NodeId;
use super::state::NodeState;

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum LogEvent {
    /// A message arrived carrying the sender's current distance.
    Received {
        kind: MessageKind,
        from: NodeId,
        distance: Distance,
    },
    /// Updates or queries went out to every neighbor.
    Broadcast { kind: MessageKind, distance: Distance },
    SentReply { to: NodeId, distance: Distance },
    /// A reply is owed to `to` but held until the computation completes.
    ReplyHeld { to: NodeId },
    FeasibilityFailed {
        reported: Distance,
        feasible: Distance,
    },
    RouteChanged(DistanceState),
    RouteLost,
    EnteredActive(NodeState),
    BecamePassive,
    Pinned,
    LinkAdded { neighbor: NodeId, cost: Distance },
    LinkCostChanged { neighbor: NodeId, cost: Distance },
    LinkRemoved { neighbor: NodeId },
    Violation(String),
}

impl LogEvent {
    /// Render the line with routers named by `name`.
    pub fn render(&self, name: impl Fn(NodeId) -> String) -> String {
        match self {
            LogEvent::Received { kind, from, distance } => {
                format!("got {}={} from {}", kind.tag(), distance, name(*from))
            }
            LogEvent::Broadcast { kind, distance } => {
                format!("send {}={} to neighbours", kind.tag(), distance)
            }
            LogEvent::SentReply { to, distance } => format!("send R={} to {}", distance, name(*to)),
            LogEvent::ReplyHeld { to } => format!("reply to {} held until passive", name(*to)),
            LogEvent::FeasibilityFailed { reported, feasible } => {
                format!("fd not satisfied ({} >= {})", reported, feasible)
            }
            LogEvent::RouteChanged(state) => match state.successor {
                Some(next) => format!(
                    "route {}, {}, {}",
                    state.distance,
                    state.feasible_distance,
                    name(next)
                ),
                None => format!("route {}", state),
            },
            LogEvent::RouteLost => "no route".to_string(),
            LogEvent::EnteredActive(state) => format!("going {}", state),
            LogEvent::BecamePassive => "all replies in, going passive".to_string(),
            LogEvent::Pinned => "pinned as destination".to_string(),
            LogEvent::LinkAdded { neighbor, cost } => {
                format!("link to {} up, cost {}", name(*neighbor), cost)
            }
            LogEvent::LinkCostChanged { neighbor, cost } => {
                format!("link to {} now costs {}", name(*neighbor), cost)
            }
            LogEvent::LinkRemoved { neighbor } => format!("link to {} removed", name(*neighbor)),
            LogEvent::Violation(msg) => format!("error: {}", msg),
        }
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.render(|id| id.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub round: Round,
    pub event: LogEvent,
}

impl LogEntry {
    pub fn render(&self, name: impl Fn(NodeId) -> String) -> String {
        format!("[{}] {}", self.round, self.event.render(name))
    }
}

impl std::fmt::Display for LogEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}] {}", self.round, self.event)
    }
}
