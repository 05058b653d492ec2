//! Insertion-ordered neighbor → distance table.
//!
//! Used both for the routing table and for the query wait-set. Iteration
//! order is insertion order, and overwriting an existing key keeps its
//! position; the feasibility check breaks ties by taking the first minimal
//! entry, so the order is observable.

use super::distance::Distance;
use super::id::NodeId;

#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct RoutingTable {
    entries: Vec<(NodeId, Distance)>,
}

impl RoutingTable {
    pub fn new() -> Self {
        RoutingTable { entries: Vec::new() }
    }

    /// Reported distance for `neighbor`, if an entry exists.
    pub fn get(&self, neighbor: NodeId) -> Option<Distance> {
        self.entries
            .iter()
            .find(|(id, _)| *id == neighbor)
            .map(|(_, d)| *d)
    }

    pub fn contains(&self, neighbor: NodeId) -> bool {
        self.entries.iter().any(|(id, _)| *id == neighbor)
    }

    /// Insert or overwrite. New keys go to the end.
    pub fn set(&mut self, neighbor: NodeId, distance: Distance) {
        match self.entries.iter_mut().find(|(id, _)| *id == neighbor) {
            Some(entry) => entry.1 = distance,
            None => self.entries.push((neighbor, distance)),
        }
    }

    /// Overwrite only if `neighbor` is already present.
    /// Returns `true` if the entry was updated.
    pub fn update_existing(&mut self, neighbor: NodeId, distance: Distance) -> bool {
        match self.entries.iter_mut().find(|(id, _)| *id == neighbor) {
            Some(entry) => {
                entry.1 = distance;
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, neighbor: NodeId) -> Option<Distance> {
        let pos = self.entries.iter().position(|(id, _)| *id == neighbor)?;
        Some(self.entries.remove(pos).1)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, Distance)> + '_ {
        self.entries.iter().copied()
    }

    pub fn neighbors(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }
}
