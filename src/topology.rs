//! Network topology: routers and the weighted links between them.
//!
//! The topology owns every [`Node`] and every [`Link`]. Routers only hold
//! the ids of their incident links; costs and endpoints are always looked
//! up here, so a cost change is visible to both endpoints at once.

use std::collections::BTreeMap;

use crate::error::{DualError, DualResult};
use crate::node::{AdjacentLink, Adjacency, Distance, LinkId, LogEvent, Node, NodeId};
use crate::round::Round;

// ── Link ──────────────────────────────────────────────────────────────

/// An undirected link. `cost` may be +∞: the link is present but unusable.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct Link {
    pub id: LinkId,
    pub a: NodeId,
    pub b: NodeId,
    pub cost: Distance,
}

impl Link {
    /// The endpoint opposite `node`, or `None` if `node` is not on this link.
    pub fn other(&self, node: NodeId) -> Option<NodeId> {
        if node == self.a {
            Some(self.b)
        } else if node == self.b {
            Some(self.a)
        } else {
            None
        }
    }

    pub fn connects(&self, x: NodeId, y: NodeId) -> bool {
        (self.a == x && self.b == y) || (self.a == y && self.b == x)
    }

    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.a, self.b)
    }
}

impl std::fmt::Display for Link {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} ↔ {} ({})", self.id, self.a, self.b, self.cost)
    }
}

/// Validate a raw link cost: non-negative or +∞.
pub fn parse_cost(cost: f64) -> DualResult<Distance> {
    Distance::new(cost).ok_or(DualError::InvalidCost(cost))
}

// ── Topology ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct Topology {
    nodes: Vec<Node>,
    names: BTreeMap<String, NodeId>,
    links: BTreeMap<LinkId, Link>,
    next_link: u64,
    finalized: bool,
}

impl Topology {
    pub fn new() -> Self {
        Topology::default()
    }

    // ── Nodes ─────────────────────────────────────────────────────

    pub fn add_node(&mut self, name: &str) -> DualResult<NodeId> {
        if self.names.contains_key(name) {
            return Err(DualError::DuplicateNode(name.to_string()));
        }
        let id = NodeId::new(self.nodes.len() as u64);
        self.nodes.push(Node::new(id, name));
        self.names.insert(name.to_string(), id);
        Ok(id)
    }

    pub fn node(&self, id: NodeId) -> DualResult<&Node> {
        self.nodes.get(id.index()).ok_or(DualError::UnknownNode(id))
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> DualResult<&mut Node> {
        self.nodes.get_mut(id.index()).ok_or(DualError::UnknownNode(id))
    }

    pub fn node_id(&self, name: &str) -> DualResult<NodeId> {
        self.names
            .get(name)
            .copied()
            .ok_or_else(|| DualError::UnknownNodeName(name.to_string()))
    }

    /// All routers in creation order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.iter()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    // ── Links ─────────────────────────────────────────────────────

    /// Register a link. Before [`finalize`](Self::finalize) the link is
    /// only recorded; afterwards it is attached to both endpoints at once.
    pub fn add_link(&mut self, a: NodeId, b: NodeId, cost: f64, round: Round) -> DualResult<LinkId> {
        let link = self.prepare_link(a, b, cost)?;
        let id = link.id;
        self.insert_link(link, round)?;
        Ok(id)
    }

    /// Validate a prospective link and reserve its id without inserting it.
    pub(crate) fn prepare_link(&mut self, a: NodeId, b: NodeId, cost: f64) -> DualResult<Link> {
        self.node(a)?;
        self.node(b)?;
        if a == b {
            return Err(DualError::SelfLoop(a));
        }
        let cost = parse_cost(cost)?;
        if self.link_between(a, b).is_some() {
            return Err(DualError::ParallelLink { a, b });
        }
        let id = LinkId::new(self.next_link);
        self.next_link += 1;
        Ok(Link { id, a, b, cost })
    }

    pub(crate) fn insert_link(&mut self, link: Link, round: Round) -> DualResult<()> {
        if self.link_between(link.a, link.b).is_some() {
            return Err(DualError::ParallelLink { a: link.a, b: link.b });
        }
        self.links.insert(link.id, link);
        if self.finalized {
            self.attach(link, round)?;
        }
        Ok(())
    }

    fn attach(&mut self, link: Link, round: Round) -> DualResult<()> {
        self.node_mut(link.a)?.attach_link(link.id, link.b, link.cost, round);
        self.node_mut(link.b)?.attach_link(link.id, link.a, link.cost, round);
        Ok(())
    }

    /// Attach every recorded link to its endpoints in creation order,
    /// building each router's adjacency and routing-table skeleton.
    /// Calling it again is a no-op.
    pub fn finalize(&mut self, round: Round) -> DualResult<()> {
        if self.finalized {
            return Ok(());
        }
        let links: Vec<Link> = self.links.values().copied().collect();
        for link in links {
            self.attach(link, round)?;
        }
        self.finalized = true;
        Ok(())
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn link(&self, id: LinkId) -> DualResult<&Link> {
        self.links.get(&id).ok_or(DualError::UnknownLink(id))
    }

    pub fn link_between(&self, x: NodeId, y: NodeId) -> Option<&Link> {
        self.links.values().find(|l| l.connects(x, y))
    }

    /// All links in creation order.
    pub fn links(&self) -> impl Iterator<Item = &Link> + '_ {
        self.links.values()
    }

    /// Routers reachable from `node` over a finite-cost link, in link order.
    pub fn neighbors(&self, node: NodeId) -> DualResult<Vec<NodeId>> {
        Ok(self.adjacency(node)?.neighbors().collect())
    }

    /// Snapshot of `node`'s incident links with each neighbor's current
    /// distance.
    pub fn adjacency(&self, node: NodeId) -> DualResult<Adjacency> {
        let router = self.node(node)?;
        let mut links = Vec::with_capacity(router.links().len());
        for id in router.links() {
            let link = self.link(*id)?;
            let neighbor = link.other(node).ok_or(DualError::UnknownLink(*id))?;
            links.push(AdjacentLink {
                link: link.id,
                neighbor,
                cost: link.cost,
                neighbor_distance: self.node(neighbor)?.distance().distance,
            });
        }
        Ok(Adjacency::new(links))
    }

    // ── Mutation ──────────────────────────────────────────────────

    pub(crate) fn set_link_cost(&mut self, id: LinkId, cost: Distance, round: Round) -> DualResult<Link> {
        let link = self.links.get_mut(&id).ok_or(DualError::UnknownLink(id))?;
        link.cost = cost;
        let link = *link;
        self.node_mut(link.a)?
            .record(round, LogEvent::LinkCostChanged { neighbor: link.b, cost });
        self.node_mut(link.b)?
            .record(round, LogEvent::LinkCostChanged { neighbor: link.a, cost });
        Ok(link)
    }

    /// Remove a link and both endpoints' routing entries for each other.
    pub(crate) fn remove_link(&mut self, id: LinkId, round: Round) -> DualResult<Link> {
        let link = self.links.remove(&id).ok_or(DualError::UnknownLink(id))?;
        if self.finalized {
            self.node_mut(link.a)?.detach_link(id, link.b, round);
            self.node_mut(link.b)?.detach_link(id, link.a, round);
        }
        Ok(link)
    }
}
