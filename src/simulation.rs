/// Simulation driver.
///
/// `Simulator` owns the topology, the round scheduler and the
/// configuration. It is the only place where messages are dispatched to
/// routers and where live topology changes are admitted, so every state
/// change in the network happens inside one of its methods.

use tracing::{debug, info, warn};

use crate::config::{ActiveChangePolicy, SimConfig};
use crate::error::{DualError, DualResult, ErrorKind};
use crate::message::{Message, MessageKind};
use crate::node::{Distance, LinkId, Node, NodeContext, NodeId, NodeState};
use crate::round::Round;
use crate::scheduler::Scheduler;
use crate::topology::{parse_cost, Link, Topology};
use crate::trace::{trace_hash, DeliveryOutcome, TraceEntry};

// ── Topology changes ──────────────────────────────────────────────────

/// A live mutation of the topology, possibly waiting for its endpoints to
/// go PASSIVE.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serialize", derive(serde::Serialize, serde::Deserialize))]
pub enum TopologyChange {
    AddLink(Link),
    SetCost { link: LinkId, cost: Distance },
    RemoveLink(LinkId),
}

impl TopologyChange {
    pub fn link(&self) -> LinkId {
        match self {
            TopologyChange::AddLink(link) => link.id,
            TopologyChange::SetCost { link, .. } => *link,
            TopologyChange::RemoveLink(link) => *link,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied,
    Deferred,
}

// ── Reports ───────────────────────────────────────────────────────────

/// Result of a single round.
#[derive(Debug, Clone, PartialEq)]
pub struct StepReport {
    pub round: Round,
    pub delivered: usize,
    pub dropped: usize,
    /// Protocol violations raised by handlers this round. The offending
    /// messages had no effect.
    pub violations: Vec<DualError>,
    /// Deferred topology changes applied at the end of the round.
    pub applied_changes: usize,
    /// Messages waiting for the next round.
    pub pending: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// No messages left and no change waiting.
    Quiescent,
    /// The round cap was hit with messages still pending.
    RoundCapReached { pending: usize },
    /// No messages left, but deferred changes are still blocked by ACTIVE
    /// routers that nothing will wake.
    Stalled { blocked_changes: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub rounds: u64,
    pub delivered: usize,
    pub dropped: usize,
    pub violations: Vec<DualError>,
    pub status: RunStatus,
}

impl RunReport {
    fn new() -> Self {
        RunReport {
            rounds: 0,
            delivered: 0,
            dropped: 0,
            violations: Vec::new(),
            status: RunStatus::Quiescent,
        }
    }

    fn absorb(&mut self, step: StepReport) {
        self.rounds += 1;
        self.delivered += step.delivered;
        self.dropped += step.dropped;
        self.violations.extend(step.violations);
    }

    pub fn converged(&self) -> bool {
        self.status == RunStatus::Quiescent
    }

    /// Turn a capped run into [`DualError::NonConvergence`].
    pub fn into_result(self) -> DualResult<Self> {
        match self.status {
            RunStatus::RoundCapReached { pending } => Err(DualError::NonConvergence {
                rounds: self.rounds,
                pending,
            }),
            _ => Ok(self),
        }
    }
}

// ── Simulator ─────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Simulator {
    topology: Topology,
    scheduler: Scheduler,
    config: SimConfig,
    /// Rounds completed so far.
    round: Round,
    deferred: Vec<TopologyChange>,
    trace: Vec<TraceEntry>,
}

impl Simulator {
    pub fn new(config: SimConfig) -> DualResult<Self> {
        config.validate()?;
        Ok(Simulator {
            topology: Topology::new(),
            scheduler: Scheduler::new(),
            config,
            round: Round::ZERO,
            deferred: Vec::new(),
            trace: Vec::new(),
        })
    }

    // ── Build ─────────────────────────────────────────────────────

    pub fn create_node(&mut self, name: &str) -> DualResult<NodeId> {
        self.topology.add_node(name)
    }

    /// Create a link. After [`finalize_topology`](Self::finalize_topology)
    /// this is a live change: it is subject to the ACTIVE-endpoint policy,
    /// and once applied both endpoints exchange Updates over a finite link.
    pub fn create_link(&mut self, a: NodeId, b: NodeId, cost: f64) -> DualResult<LinkId> {
        if !self.topology.is_finalized() {
            return self.topology.add_link(a, b, cost, self.round);
        }
        let link = self.topology.prepare_link(a, b, cost)?;
        self.submit(TopologyChange::AddLink(link))?;
        Ok(link.id)
    }

    pub fn finalize_topology(&mut self) -> DualResult<()> {
        self.topology.finalize(self.round)?;
        debug!(
            nodes = self.topology.node_count(),
            links = self.topology.links().count(),
            "topology finalized"
        );
        Ok(())
    }

    // ── Drive ─────────────────────────────────────────────────────

    pub fn pin_destination(&mut self, node: NodeId) -> DualResult<()> {
        self.ensure_finalized()?;
        self.topology.node_mut(node)?.pin(self.round)
    }

    /// Have `node` advertise its current distance to every neighbor.
    /// Returns the number of Updates enqueued.
    pub fn inject_initial_advertisement(&mut self, node: NodeId) -> DualResult<usize> {
        self.ensure_finalized()?;
        let before = self.scheduler.len();
        let adjacency = self.topology.adjacency(node)?;
        let mut ctx = NodeContext::new(&mut self.scheduler, &adjacency, self.round);
        self.topology.node_mut(node)?.send_updates(&mut ctx);
        Ok(self.scheduler.len() - before)
    }

    /// Re-run the feasibility check on a PASSIVE router.
    /// Returns the number of messages it enqueued.
    pub fn run_checks(&mut self, node: NodeId) -> DualResult<usize> {
        self.ensure_finalized()?;
        self.recheck(node)
    }

    /// Deliver one round. Returns `None` when nothing is pending.
    ///
    /// With an empty queue, deferred changes that have become unblocked are
    /// applied first; the round then carries whatever they sent and counts
    /// them in `applied_changes`.
    pub fn step(&mut self) -> DualResult<Option<StepReport>> {
        self.ensure_finalized()?;
        let mut applied = 0;
        if self.scheduler.is_empty() {
            applied = self.apply_deferred()?;
            if self.scheduler.is_empty() {
                return Ok(None);
            }
        }

        let round = self.round.next();
        let batch = self.scheduler.take_round();
        let mut report = StepReport {
            round,
            delivered: 0,
            dropped: 0,
            violations: Vec::new(),
            applied_changes: applied,
            pending: 0,
        };
        for message in batch {
            match self.deliver(round, message)? {
                (DeliveryOutcome::Delivered, _) => report.delivered += 1,
                (DeliveryOutcome::Dropped, _) => report.dropped += 1,
                (DeliveryOutcome::Rejected, violation) => report.violations.extend(violation),
            }
        }
        self.round = round;
        report.applied_changes += self.apply_deferred()?;
        report.pending = self.scheduler.len();
        debug!(
            %round,
            delivered = report.delivered,
            pending = report.pending,
            "round complete"
        );
        Ok(Some(report))
    }

    /// Run rounds until nothing is pending or the configured round cap is
    /// reached. Hitting the cap is reported in the status, not as an error.
    pub fn run_to_quiescence(&mut self) -> DualResult<RunReport> {
        self.ensure_finalized()?;
        let mut report = RunReport::new();
        loop {
            if report.rounds >= self.config.max_rounds {
                report.status = self.idle_status();
                break;
            }
            match self.step()? {
                Some(step) => report.absorb(step),
                None => {
                    report.status = self.idle_status();
                    break;
                }
            }
        }
        match report.status {
            RunStatus::Quiescent => info!(rounds = report.rounds, delivered = report.delivered, "converged"),
            status => warn!(rounds = report.rounds, ?status, "run stopped before convergence"),
        }
        Ok(report)
    }

    // ── Mutate ────────────────────────────────────────────────────

    pub fn change_link_cost(&mut self, link: LinkId, cost: f64) -> DualResult<ChangeOutcome> {
        let cost = parse_cost(cost)?;
        self.topology.link(link)?;
        self.submit(TopologyChange::SetCost { link, cost })
    }

    pub fn remove_link(&mut self, link: LinkId) -> DualResult<ChangeOutcome> {
        self.topology.link(link)?;
        self.submit(TopologyChange::RemoveLink(link))
    }

    // ── Observe ───────────────────────────────────────────────────

    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Rounds completed since the simulator was created.
    pub fn round(&self) -> Round {
        self.round
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn node(&self, id: NodeId) -> DualResult<&Node> {
        self.topology.node(id)
    }

    pub fn node_id(&self, name: &str) -> DualResult<NodeId> {
        self.topology.node_id(name)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.topology.nodes()
    }

    /// Messages waiting for the next round, in delivery order.
    pub fn pending(&self) -> &[Message] {
        self.scheduler.pending()
    }

    pub fn deferred_changes(&self) -> &[TopologyChange] {
        &self.deferred
    }

    pub fn trace(&self) -> &[TraceEntry] {
        &self.trace
    }

    pub fn trace_hash(&self) -> u64 {
        trace_hash(&self.trace)
    }

    /// Nothing pending, nothing deferred and every router PASSIVE.
    pub fn is_converged(&self) -> bool {
        self.scheduler.is_empty()
            && self.deferred.is_empty()
            && self.topology.nodes().all(|n| n.state().is_passive())
    }

    // ── Internals ─────────────────────────────────────────────────

    fn ensure_finalized(&self) -> DualResult<()> {
        if self.topology.is_finalized() {
            Ok(())
        } else {
            Err(DualError::NotFinalized)
        }
    }

    fn idle_status(&self) -> RunStatus {
        if !self.scheduler.is_empty() {
            RunStatus::RoundCapReached {
                pending: self.scheduler.len(),
            }
        } else if !self.deferred.is_empty() {
            RunStatus::Stalled {
                blocked_changes: self.deferred.len(),
            }
        } else {
            RunStatus::Quiescent
        }
    }

    /// Hand one message to its target. Protocol violations are returned
    /// alongside the outcome; any other error aborts the run.
    fn deliver(
        &mut self,
        round: Round,
        message: Message,
    ) -> DualResult<(DeliveryOutcome, Option<DualError>)> {
        if self.topology.link_between(message.from, message.to).is_none() {
            debug!(%message, "link gone, message dropped");
            self.record(round, message, Distance::INFINITY, DeliveryOutcome::Dropped);
            return Ok((DeliveryOutcome::Dropped, None));
        }

        let carried = self.topology.node(message.from)?.distance().distance;
        let adjacency = self.topology.adjacency(message.to)?;
        let mut ctx = NodeContext::new(&mut self.scheduler, &adjacency, round);
        let result = self
            .topology
            .node_mut(message.to)?
            .deliver(&mut ctx, message.kind, message.from, carried);

        let (outcome, violation) = match result {
            Ok(()) => (DeliveryOutcome::Delivered, None),
            Err(err) if err.kind() == ErrorKind::Protocol => {
                warn!(%message, error = %err, "message rejected");
                (DeliveryOutcome::Rejected, Some(err))
            }
            Err(err) => return Err(err),
        };
        self.record(round, message, carried, outcome);
        Ok((outcome, violation))
    }

    fn record(&mut self, round: Round, message: Message, carried: Distance, outcome: DeliveryOutcome) {
        if self.config.record_trace {
            self.trace.push(TraceEntry {
                round,
                message,
                carried,
                outcome,
            });
        }
    }

    fn recheck(&mut self, node: NodeId) -> DualResult<usize> {
        let before = self.scheduler.len();
        let adjacency = self.topology.adjacency(node)?;
        let mut ctx = NodeContext::new(&mut self.scheduler, &adjacency, self.round);
        self.topology.node_mut(node)?.run_checks(&mut ctx)?;
        Ok(self.scheduler.len() - before)
    }

    fn endpoints(&self, change: &TopologyChange) -> DualResult<(NodeId, NodeId)> {
        match change {
            TopologyChange::AddLink(link) => Ok(link.endpoints()),
            TopologyChange::SetCost { link, .. } | TopologyChange::RemoveLink(link) => {
                Ok(self.topology.link(*link)?.endpoints())
            }
        }
    }

    /// The first endpoint that is currently ACTIVE, if any.
    fn active_endpoint(&self, a: NodeId, b: NodeId) -> DualResult<Option<(NodeId, NodeState)>> {
        for id in [a, b] {
            let state = self.topology.node(id)?.state();
            if state.is_active() {
                return Ok(Some((id, state)));
            }
        }
        Ok(None)
    }

    fn submit(&mut self, change: TopologyChange) -> DualResult<ChangeOutcome> {
        self.ensure_finalized()?;
        let (a, b) = self.endpoints(&change)?;
        if let Some((node, state)) = self.active_endpoint(a, b)? {
            let link = change.link();
            match self.config.active_change_policy {
                ActiveChangePolicy::Reject => {
                    warn!(%link, %node, %state, "topology change rejected");
                    return Err(DualError::TopologyChangeDuringActiveComputation { link, node, state });
                }
                ActiveChangePolicy::Defer => {
                    debug!(%link, %node, %state, "topology change deferred");
                    self.deferred.push(change);
                    return Ok(ChangeOutcome::Deferred);
                }
            }
        }
        self.apply(change)?;
        Ok(ChangeOutcome::Applied)
    }

    fn apply(&mut self, change: TopologyChange) -> DualResult<()> {
        let round = self.round;
        match change {
            TopologyChange::SetCost { link, cost } => {
                let link = self.topology.set_link_cost(link, cost, round)?;
                debug!(%link, "link cost changed");
                self.recheck(link.a)?;
                self.recheck(link.b)?;
            }
            TopologyChange::RemoveLink(link) => {
                let link = self.topology.remove_link(link, round)?;
                debug!(%link, "link removed");
                self.recheck(link.a)?;
                self.recheck(link.b)?;
            }
            TopologyChange::AddLink(link) => {
                self.topology.insert_link(link, round)?;
                debug!(%link, "link added");
                if link.cost.is_finite() {
                    self.scheduler.enqueue(MessageKind::Update, link.a, link.b, round);
                    self.scheduler.enqueue(MessageKind::Update, link.b, link.a, round);
                }
            }
        }
        Ok(())
    }

    /// Apply queued changes in order, stopping at the first one still
    /// blocked by an ACTIVE endpoint. Changes whose link has meanwhile
    /// disappeared are discarded.
    fn apply_deferred(&mut self) -> DualResult<usize> {
        let mut applied = 0;
        while let Some(change) = self.deferred.first().copied() {
            let (a, b) = match self.endpoints(&change) {
                Ok(ends) => ends,
                Err(err) if err.kind() == ErrorKind::Topology => {
                    warn!(error = %err, "deferred change discarded");
                    self.deferred.remove(0);
                    continue;
                }
                Err(err) => return Err(err),
            };
            if self.active_endpoint(a, b)?.is_some() {
                break;
            }
            self.deferred.remove(0);
            match self.apply(change) {
                Ok(()) => applied += 1,
                Err(err) if err.kind() == ErrorKind::Topology => {
                    warn!(error = %err, "deferred change discarded");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(applied)
    }
}

impl Default for Simulator {
    fn default() -> Self {
        Simulator {
            topology: Topology::new(),
            scheduler: Scheduler::new(),
            config: SimConfig::default(),
            round: Round::ZERO,
            deferred: Vec::new(),
            trace: Vec::new(),
        }
    }
}
