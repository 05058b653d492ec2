//! What a router handler can see and do.
//!
//! Handlers mutate only their own router. Everything they need to know
//! about the rest of the network is captured in an [`Adjacency`] snapshot
//! built just before the handler runs, and the only side effect they can
//! have on others is enqueueing messages through [`NodeContext`].

use crate::message::{MessageId, MessageKind};
use crate::round::Round;
use crate::scheduler::Scheduler;

use super::distance::Distance;
use super::id::{LinkId, NodeId};

// ── Adjacency ─────────────────────────────────────────────────────────

/// One incident link as seen from a router.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdjacentLink {
    pub link: LinkId,
    pub neighbor: NodeId,
    pub cost: Distance,
    /// The neighbor's own current distance to the destination.
    pub neighbor_distance: Distance,
}

/// A router's incident links, in registration order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Adjacency {
    links: Vec<AdjacentLink>,
}

impl Adjacency {
    pub fn new(links: Vec<AdjacentLink>) -> Self {
        Adjacency { links }
    }

    pub fn iter(&self) -> impl Iterator<Item = &AdjacentLink> + '_ {
        self.links.iter()
    }

    /// Neighbors reachable over a finite-cost link.
    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.links
            .iter()
            .filter(|l| l.cost.is_finite())
            .map(|l| l.neighbor)
    }

    pub fn link_to(&self, neighbor: NodeId) -> Option<&AdjacentLink> {
        self.links.iter().find(|l| l.neighbor == neighbor)
    }

    pub fn cost_to(&self, neighbor: NodeId) -> Option<Distance> {
        self.link_to(neighbor).map(|l| l.cost)
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }
}

// ── NodeContext ───────────────────────────────────────────────────────

/// Mutable context handed to a router handler.
///
/// Borrows the scheduler, so every message a handler sends is appended to
/// the pending list for the next round.
pub struct NodeContext<'a> {
    scheduler: &'a mut Scheduler,
    adjacency: &'a Adjacency,
    round: Round,
}

impl<'a> NodeContext<'a> {
    pub fn new(scheduler: &'a mut Scheduler, adjacency: &'a Adjacency, round: Round) -> Self {
        NodeContext {
            scheduler,
            adjacency,
            round,
        }
    }

    #[inline]
    pub fn round(&self) -> Round {
        self.round
    }

    #[inline]
    pub fn adjacency(&self) -> &'a Adjacency {
        self.adjacency
    }

    pub fn send(&mut self, kind: MessageKind, from: NodeId, to: NodeId) -> MessageId {
        self.scheduler.enqueue(kind, from, to, self.round)
    }

    /// Send `kind` from `from` to every finite-cost neighbor.
    /// Returns the number of messages enqueued.
    pub fn broadcast(&mut self, kind: MessageKind, from: NodeId) -> usize {
        let adjacency = self.adjacency;
        let mut sent = 0;
        for neighbor in adjacency.neighbors() {
            self.scheduler.enqueue(kind, from, neighbor, self.round);
            sent += 1;
        }
        sent
    }
}
