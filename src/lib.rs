//! # dualsim: DUAL loop-free distance-vector routing, simulated
//!
//! Every router keeps a route to one destination and converges on a
//! loop-free shortest path after any topology change. A router only
//! switches to a neighbor that satisfies the feasibility condition; when
//! none does, it freezes its route and runs a diffusing computation,
//! querying all neighbors and waiting for every reply before choosing
//! again.
//!
//! Execution is deterministic and bulk-synchronous: messages sent in one
//! round are delivered, in enqueue order, in the next.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────┐
//! │         Simulator          │ ← build / drive / mutate / observe
//! │  ┌──────────────────────┐  │
//! │  │      Topology        │  │ ← routers + weighted links
//! │  │  ┌────────────────┐  │  │
//! │  │  │ Node (DUAL FSM)│  │  │ ← feasibility, diffusion, replies
//! │  │  └────────────────┘  │  │
//! │  └──────────────────────┘  │
//! │  ┌──────────────────────┐  │
//! │  │     Scheduler        │  │ ← one pending list per round
//! │  └──────────────────────┘  │
//! │  ┌──────────────────────┐  │
//! │  │       Trace          │  │ ← what each message carried
//! │  └──────────────────────┘  │
//! └────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```rust
//! use dualsim::{SimConfig, Simulator};
//!
//! let mut sim = Simulator::new(SimConfig::default()).unwrap();
//! let d = sim.create_node("d").unwrap();
//! let a = sim.create_node("a").unwrap();
//! let b = sim.create_node("b").unwrap();
//! sim.create_link(d, a, 1.0).unwrap();
//! let ab = sim.create_link(a, b, 1.0).unwrap();
//! sim.create_link(b, d, 5.0).unwrap();
//! sim.finalize_topology().unwrap();
//!
//! sim.pin_destination(d).unwrap();
//! sim.inject_initial_advertisement(d).unwrap();
//! assert!(sim.run_to_quiescence().unwrap().converged());
//! assert_eq!(sim.node(b).unwrap().distance().distance.value(), 2.0);
//!
//! sim.remove_link(ab).unwrap();
//! assert!(sim.run_to_quiescence().unwrap().converged());
//! assert_eq!(sim.node(b).unwrap().distance().distance.value(), 5.0);
//! ```

pub mod api;
pub mod builder;
pub mod config;
pub mod error;
pub mod message;
pub mod node;
pub mod round;
pub mod scheduler;
pub mod simulation;
pub mod topology;
pub mod trace;
pub mod wasm;

#[cfg(test)]
mod scenarios;

// Re-exports for convenience.
pub use api::{NetworkSnapshot, NodeSnapshot};
pub use builder::ScenarioBuilder;
pub use config::{ActiveChangePolicy, SimConfig};
pub use error::{DualError, DualResult, ErrorKind, ProtocolViolation};
pub use message::{Message, MessageId, MessageKind};
pub use node::{ActiveReason, Distance, DistanceState, LinkId, Node, NodeId, NodeState, RoutingTable};
pub use round::Round;
pub use scheduler::Scheduler;
pub use simulation::{ChangeOutcome, RunReport, RunStatus, Simulator, StepReport, TopologyChange};
pub use topology::{Link, Topology};
pub use trace::{DeliveryOutcome, TraceEntry};
