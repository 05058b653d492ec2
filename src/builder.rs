/// Fluent builder for scenario setup.
///
/// Routers are referred to by name; the builder resolves names to ids,
/// finalizes the topology and pins the destination, so setup code reads
/// like a description of the network.

use crate::config::SimConfig;
use crate::error::DualResult;
use crate::simulation::{RunReport, Simulator};

/// # Example
/// ```rust
/// use dualsim::builder::ScenarioBuilder;
///
/// let (sim, report) = ScenarioBuilder::new()
///     .nodes(&["d", "a", "b"])
///     .link("d", "a", 1.0)
///     .link("a", "b", 1.0)
///     .destination("d")
///     .run()
///     .unwrap();
/// assert!(report.converged());
/// let b = sim.node(sim.node_id("b").unwrap()).unwrap();
/// assert_eq!(b.distance().distance.value(), 2.0);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ScenarioBuilder {
    nodes: Vec<String>,
    links: Vec<(String, String, f64)>,
    destination: Option<String>,
    config: SimConfig,
}

impl ScenarioBuilder {
    pub fn new() -> Self {
        ScenarioBuilder::default()
    }

    pub fn node(mut self, name: &str) -> Self {
        self.nodes.push(name.to_string());
        self
    }

    pub fn nodes(mut self, names: &[&str]) -> Self {
        self.nodes.extend(names.iter().map(|n| n.to_string()));
        self
    }

    /// Links are registered in call order, which fixes each router's
    /// routing-table order.
    pub fn link(mut self, a: &str, b: &str, cost: f64) -> Self {
        self.links.push((a.to_string(), b.to_string(), cost));
        self
    }

    pub fn destination(mut self, name: &str) -> Self {
        self.destination = Some(name.to_string());
        self
    }

    pub fn config(mut self, config: SimConfig) -> Self {
        self.config = config;
        self
    }

    pub fn max_rounds(mut self, max_rounds: u64) -> Self {
        self.config.max_rounds = max_rounds;
        self
    }

    /// Create the routers and links, finalize, and pin the destination.
    pub fn build(self) -> DualResult<Simulator> {
        let mut sim = Simulator::new(self.config)?;
        for name in &self.nodes {
            sim.create_node(name)?;
        }
        for (a, b, cost) in &self.links {
            let a = sim.node_id(a)?;
            let b = sim.node_id(b)?;
            sim.create_link(a, b, *cost)?;
        }
        sim.finalize_topology()?;
        if let Some(dest) = &self.destination {
            let dest = sim.node_id(dest)?;
            sim.pin_destination(dest)?;
        }
        Ok(sim)
    }

    /// Build, have the destination advertise itself, and run to
    /// quiescence.
    pub fn run(self) -> DualResult<(Simulator, RunReport)> {
        let destination = self.destination.clone();
        let mut sim = self.build()?;
        if let Some(dest) = destination {
            let dest = sim.node_id(&dest)?;
            sim.inject_initial_advertisement(dest)?;
        }
        let report = sim.run_to_quiescence()?;
        Ok((sim, report))
    }
}

/// Two paths from `a` to `d` of equal cost (12): through `b`/`c` and
/// through `u`/`v`/`w`, with a `b`–`v` cross link.
pub fn two_path() -> ScenarioBuilder {
    ScenarioBuilder::new()
        .nodes(&["a", "b", "c", "d", "u", "v", "w"])
        .link("a", "b", 1.0)
        .link("b", "c", 1.0)
        .link("b", "v", 1.0)
        .link("c", "d", 10.0)
        .link("a", "u", 1.0)
        .link("u", "v", 1.0)
        .link("v", "w", 1.0)
        .link("w", "d", 10.0)
        .destination("d")
}
