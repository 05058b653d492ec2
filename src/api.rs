/// Read-only views of a running simulation for presentation layers.
///
/// Snapshots copy out everything a renderer polls: per-router state,
/// distance triple, routing table, wait-set and log lines, plus the links.
/// Taking a snapshot never mutates the simulator. JSON export goes
/// through `serde_json` when the `serialize` feature is on.

use crate::node::{Distance, DistanceState, Node, NodeId, NodeState};
use crate::round::Round;
use crate::simulation::Simulator;
use crate::topology::{Link, Topology};

// ── Snapshots ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NodeSnapshot {
    pub id: NodeId,
    pub name: String,
    pub state: NodeState,
    pub pinned: bool,
    pub distance: DistanceState,
    pub routing_table: Vec<(NodeId, Distance)>,
    pub query_status: Vec<(NodeId, Distance)>,
    pub log: Vec<String>,
}

impl NodeSnapshot {
    /// Log lines name routers as the topology does.
    pub fn of(node: &Node, topology: &Topology) -> Self {
        let name = |id: NodeId| match topology.node(id) {
            Ok(n) => n.name().to_string(),
            Err(_) => id.to_string(),
        };
        NodeSnapshot {
            id: node.id(),
            name: node.name().to_string(),
            state: node.state(),
            pinned: node.is_pinned(),
            distance: node.distance(),
            routing_table: node.routing_table().iter().collect(),
            query_status: node.query_status().iter().collect(),
            log: node.log().iter().map(|e| e.render(name)).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub struct NetworkSnapshot {
    pub round: Round,
    pub pending: usize,
    pub converged: bool,
    pub nodes: Vec<NodeSnapshot>,
    pub links: Vec<Link>,
}

impl NetworkSnapshot {
    pub fn node(&self, name: &str) -> Option<&NodeSnapshot> {
        self.nodes.iter().find(|n| n.name == name)
    }
}

/// Body of a JSON string literal: escapes quotes, backslashes and control
/// characters.
#[cfg(not(feature = "serialize"))]
fn json_escape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out
}

// ── Simulator views ───────────────────────────────────────────────────

impl Simulator {
    pub fn snapshot(&self) -> NetworkSnapshot {
        NetworkSnapshot {
            round: self.round(),
            pending: self.pending().len(),
            converged: self.is_converged(),
            nodes: self
                .nodes()
                .map(|n| NodeSnapshot::of(n, self.topology()))
                .collect(),
            links: self.topology().links().copied().collect(),
        }
    }

    /// Export the current snapshot as pretty-printed JSON.
    #[cfg(feature = "serialize")]
    pub fn state_json(&self) -> String {
        serde_json::to_string_pretty(&self.snapshot()).unwrap_or_else(|_| "{}".into())
    }

    /// Export the current snapshot as JSON (routers only).
    #[cfg(not(feature = "serialize"))]
    pub fn state_json(&self) -> String {
        let nodes: Vec<String> = self
            .nodes()
            .map(|n| {
                let d = n.distance();
                format!(
                    r#"{{"id":{},"name":"{}","state":"{}","distance":"{}","feasible_distance":"{}","successor":{}}}"#,
                    n.id().raw(),
                    json_escape(n.name()),
                    n.state(),
                    d.distance,
                    d.feasible_distance,
                    d.successor.map_or("null".to_string(), |s| s.raw().to_string()),
                )
            })
            .collect();
        format!(
            r#"{{"round":{},"pending":{},"converged":{},"nodes":[{}]}}"#,
            self.round().number(),
            self.pending().len(),
            self.is_converged(),
            nodes.join(",")
        )
    }

    /// Export the delivery trace as JSON.
    #[cfg(feature = "serialize")]
    pub fn trace_json(&self) -> String {
        serde_json::to_string(self.trace()).unwrap_or_else(|_| "[]".into())
    }
}
