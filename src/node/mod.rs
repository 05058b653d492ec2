//! Routers and the DUAL state machine.
//!
//! # Module structure
//!
//! | Sub-module | Contents |
//! |---|---|
//! | [`id`] | [`NodeId`], [`LinkId`] |
//! | [`distance`] | [`Distance`], [`DistanceState`] |
//! | [`state`] | [`NodeState`], [`ActiveReason`] |
//! | [`table`] | [`RoutingTable`] |
//! | [`context`] | [`NodeContext`], [`Adjacency`] |
//! | [`router`] | [`Node`] |
//! | [`protocol`] | handlers and the diffusing computation on [`Node`] |
//! | [`log`] | [`LogEntry`], [`LogEvent`] |

pub mod context;
pub mod distance;
pub mod id;
pub mod log;
pub mod protocol;
pub mod router;
pub mod state;
pub mod table;

pub use context::{AdjacentLink, Adjacency, NodeContext};
pub use distance::{Distance, DistanceState};
pub use id::{LinkId, NodeId};
pub use log::{LogEntry, LogEvent};
pub use router::Node;
pub use state::{ActiveReason, NodeState};
pub use table::RoutingTable;
