//! `Node`: one router's complete protocol state.

use crate::round::Round;

use super::distance::{Distance, DistanceState};
use super::id::{LinkId, NodeId};
use super::log::{LogEntry, LogEvent};
use super::state::NodeState;
use super::table::RoutingTable;

/// A router tracking its route to the single destination.
///
/// Fields are only mutated by the protocol handlers in
/// [`protocol`](super::protocol) and by topology operations; everything
/// exposed publicly is read-only.
#[derive(Debug, Clone)]
pub struct Node {
    pub(crate) id: NodeId,
    pub(crate) name: String,
    /// Incident links in registration order.
    pub(crate) links: Vec<LinkId>,
    /// Last distance each neighbor reported. One entry per linked neighbor.
    pub(crate) routing_table: RoutingTable,
    /// Replies collected during the current diffusing computation.
    pub(crate) query_status: RoutingTable,
    pub(crate) distance: DistanceState,
    pub(crate) state: NodeState,
    pub(crate) pinned: bool,
    pub(crate) log: Vec<LogEntry>,
}

impl Node {
    pub(crate) fn new(id: NodeId, name: impl Into<String>) -> Self {
        Node {
            id,
            name: name.into(),
            links: Vec::new(),
            routing_table: RoutingTable::new(),
            query_status: RoutingTable::new(),
            distance: DistanceState::UNREACHABLE,
            state: NodeState::Passive,
            pinned: false,
            log: Vec::new(),
        }
    }

    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn links(&self) -> &[LinkId] {
        &self.links
    }

    pub fn routing_table(&self) -> &RoutingTable {
        &self.routing_table
    }

    pub fn query_status(&self) -> &RoutingTable {
        &self.query_status
    }

    pub fn distance(&self) -> DistanceState {
        self.distance
    }

    pub fn state(&self) -> NodeState {
        self.state
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    /// The log rendered one line per entry.
    pub fn log_lines(&self) -> Vec<String> {
        self.log.iter().map(|e| e.to_string()).collect()
    }

    // ── topology hooks ────────────────────────────────────────────

    /// Register an incident link. The neighbor's routing entry starts at
    /// +∞ until it reports.
    pub(crate) fn attach_link(&mut self, link: LinkId, neighbor: NodeId, cost: Distance, round: Round) {
        self.links.push(link);
        if !self.routing_table.contains(neighbor) {
            self.routing_table.set(neighbor, Distance::INFINITY);
        }
        self.record(round, LogEvent::LinkAdded { neighbor, cost });
    }

    /// Forget an incident link and the neighbor's routing entry with it.
    pub(crate) fn detach_link(&mut self, link: LinkId, neighbor: NodeId, round: Round) {
        self.links.retain(|l| *l != link);
        self.routing_table.remove(neighbor);
        self.record(round, LogEvent::LinkRemoved { neighbor });
    }

    pub(crate) fn record(&mut self, round: Round, event: LogEvent) {
        self.log.push(LogEntry { round, event });
    }
}

impl std::fmt::Display for Node {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}) [{}] {}", self.name, self.id, self.distance, self.state)
    }
}
