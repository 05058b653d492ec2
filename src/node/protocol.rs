//! DUAL message handlers and the diffusing computation.
//!
//! Every handler runs against a [`NodeContext`] whose adjacency snapshot
//! was taken immediately before the call. Handlers never block: waiting
//! for replies is expressed purely through [`NodeState`].

use tracing::{debug, trace, warn};

use crate::error::{DualError, DualResult, ProtocolViolation};
use crate::message::MessageKind;
use crate::round::Round;

use super::context::{AdjacentLink, Adjacency, NodeContext};
use super::distance::{Distance, DistanceState};
use super::id::NodeId;
use super::log::LogEvent;
use super::router::Node;
use super::state::{ActiveReason, NodeState};

impl Node {
    /// Fix this router as the destination: distance 0, its own successor.
    /// A pinned router never runs the feasibility check and answers every
    /// query straight away.
    pub fn pin(&mut self, round: Round) -> DualResult<()> {
        if self.state.is_active() {
            return Err(self.violation(round, ProtocolViolation::PinWhileActive(self.state)));
        }
        self.pinned = true;
        self.distance = DistanceState::origin(self.id);
        self.record(round, LogEvent::Pinned);
        debug!(node = %self.id, "pinned as destination");
        Ok(())
    }

    /// Dispatch a delivered message. `distance` is the sender's distance
    /// read at delivery time.
    pub fn deliver(
        &mut self,
        ctx: &mut NodeContext<'_>,
        kind: MessageKind,
        from: NodeId,
        distance: Distance,
    ) -> DualResult<()> {
        trace!(node = %self.id, %kind, %from, %distance, "deliver");
        match kind {
            MessageKind::Update => self.on_update(ctx, from, distance),
            MessageKind::Query => self.on_query(ctx, from, distance),
            MessageKind::Reply => self.on_reply(ctx, from, distance),
        }
    }

    // ── Feasibility ───────────────────────────────────────────────

    /// Recompute the route from the routing table.
    ///
    /// Accepts the cheapest neighbor if its reported distance satisfies the
    /// feasibility condition (`rd < FD`); otherwise starts a diffusing
    /// computation. Only valid while PASSIVE.
    pub fn run_checks(&mut self, ctx: &mut NodeContext<'_>) -> DualResult<()> {
        if self.pinned {
            return Ok(());
        }
        if self.state.is_active() {
            return Err(self.violation(
                ctx.round(),
                ProtocolViolation::ChecksWhileActive(self.state),
            ));
        }

        let adjacency = ctx.adjacency();
        let mut min_dist = Distance::INFINITY;
        let mut min_rd = Distance::INFINITY;
        let mut min_neighbor = None;
        for (neighbor, reported) in self.routing_table.iter() {
            let cost = adjacency.cost_to(neighbor).ok_or(DualError::MissingLink {
                node: self.id,
                neighbor,
            })?;
            let candidate = reported + cost;
            if candidate < min_dist {
                min_dist = candidate;
                min_rd = reported;
                min_neighbor = Some(neighbor);
            }
        }

        let feasible = self.distance.feasible_distance;
        if min_dist.is_infinite() {
            if feasible.is_finite() {
                self.record(
                    ctx.round(),
                    LogEvent::FeasibilityFailed {
                        reported: Distance::INFINITY,
                        feasible,
                    },
                );
                return self.go_active(ctx, ActiveReason::DirectViolation);
            }
            if self.distance.distance.is_finite() || self.distance.successor.is_some() {
                self.distance = DistanceState::UNREACHABLE;
                self.record(ctx.round(), LogEvent::RouteLost);
                debug!(node = %self.id, "route lost");
                self.send_updates(ctx);
            }
            return Ok(());
        }

        if min_rd >= feasible {
            self.record(
                ctx.round(),
                LogEvent::FeasibilityFailed {
                    reported: min_rd,
                    feasible,
                },
            );
            return self.go_active(ctx, ActiveReason::DirectViolation);
        }

        let next = DistanceState::new(min_dist, feasible.min(min_dist), min_neighbor);
        if next != self.distance {
            self.distance = next;
            self.record(ctx.round(), LogEvent::RouteChanged(next));
            debug!(node = %self.id, route = %next, "route changed");
            self.send_updates(ctx);
        }
        Ok(())
    }

    // ── Handlers ──────────────────────────────────────────────────

    fn on_update(&mut self, ctx: &mut NodeContext<'_>, from: NodeId, distance: Distance) -> DualResult<()> {
        self.record(
            ctx.round(),
            LogEvent::Received {
                kind: MessageKind::Update,
                from,
                distance,
            },
        );
        self.routing_table.set(from, distance);
        if self.state.is_passive() {
            self.run_checks(ctx)
        } else {
            // Counts toward the wait-set only if `from` already replied.
            self.query_status.update_existing(from, distance);
            Ok(())
        }
    }

    fn on_query(&mut self, ctx: &mut NodeContext<'_>, from: NodeId, distance: Distance) -> DualResult<()> {
        self.record(
            ctx.round(),
            LogEvent::Received {
                kind: MessageKind::Query,
                from,
                distance,
            },
        );
        self.routing_table.set(from, distance);

        match self.state {
            NodeState::Passive => {
                if self.pinned {
                    self.send_reply(ctx, from);
                    return Ok(());
                }
                if self.distance.successor == Some(from) {
                    self.distance.distance = distance;
                    self.distance.feasible_distance = Distance::INFINITY;
                    self.record(ctx.round(), LogEvent::ReplyHeld { to: from });
                    self.enter_active(
                        ctx.round(),
                        NodeState::Active {
                            reason: ActiveReason::QueryViolation,
                            awaiting_successor: true,
                        },
                    );
                    return self.start_diffuse(ctx);
                }
                if let Some(best) = min_from(ctx.adjacency()) {
                    let feasible = self.distance.feasible_distance;
                    if best.neighbor_distance >= feasible {
                        self.record(
                            ctx.round(),
                            LogEvent::FeasibilityFailed {
                                reported: best.neighbor_distance,
                                feasible,
                            },
                        );
                        self.enter_active(
                            ctx.round(),
                            NodeState::Active {
                                reason: ActiveReason::QueryViolation,
                                awaiting_successor: false,
                            },
                        );
                        self.start_diffuse(ctx)?;
                    }
                }
                self.send_reply(ctx, from);
                Ok(())
            }
            NodeState::Active {
                awaiting_successor: false,
                ..
            } => {
                self.query_status.update_existing(from, distance);
                if self.distance.successor == Some(from) {
                    let cost = ctx.adjacency().cost_to(from).ok_or(DualError::MissingLink {
                        node: self.id,
                        neighbor: from,
                    })?;
                    self.distance.distance = cost + distance;
                    self.state = self.state.awaiting();
                    self.record(ctx.round(), LogEvent::ReplyHeld { to: from });
                    debug!(node = %self.id, state = %self.state, "successor query absorbed");
                } else {
                    self.send_reply(ctx, from);
                }
                Ok(())
            }
            NodeState::Active {
                awaiting_successor: true,
                ..
            } => {
                self.send_reply(ctx, from);
                Ok(())
            }
        }
    }

    fn on_reply(&mut self, ctx: &mut NodeContext<'_>, from: NodeId, distance: Distance) -> DualResult<()> {
        if self.state.is_passive() {
            return Err(self.violation(ctx.round(), ProtocolViolation::ReplyWhilePassive { from }));
        }
        self.record(
            ctx.round(),
            LogEvent::Received {
                kind: MessageKind::Reply,
                from,
                distance,
            },
        );
        self.query_status.set(from, distance);
        self.check_state_done(ctx)
    }

    // ── Diffusing computation ─────────────────────────────────────

    fn go_active(&mut self, ctx: &mut NodeContext<'_>, reason: ActiveReason) -> DualResult<()> {
        self.enter_active(
            ctx.round(),
            NodeState::Active {
                reason,
                awaiting_successor: false,
            },
        );
        self.start_diffuse(ctx)
    }

    fn enter_active(&mut self, round: Round, state: NodeState) {
        self.state = state;
        self.record(round, LogEvent::EnteredActive(state));
        debug!(node = %self.id, %state, "entered active");
    }

    /// Reset FD, keep a tentative distance through the old successor and
    /// query every neighbor.
    fn start_diffuse(&mut self, ctx: &mut NodeContext<'_>) -> DualResult<()> {
        let adjacency = ctx.adjacency();
        self.distance.feasible_distance = Distance::INFINITY;
        self.distance.distance = Distance::INFINITY;

        if let Some(successor) = self.distance.successor {
            let link = adjacency.link_to(successor);
            if let (Some(reported), Some(link)) = (self.routing_table.get(successor), link) {
                if reported.is_finite() {
                    self.distance.distance = reported + link.cost;
                }
            }
            if self.distance.distance.is_infinite() && link.is_none() {
                self.distance.successor = None;
            }
        }

        self.query_status.clear();
        let sent = ctx.broadcast(MessageKind::Query, self.id);
        if sent == 0 {
            // Nobody to ask: the wait-set is already complete.
            return self.check_state_done(ctx);
        }
        self.record(
            ctx.round(),
            LogEvent::Broadcast {
                kind: MessageKind::Query,
                distance: self.distance.distance,
            },
        );
        Ok(())
    }

    /// Finish the diffusing computation once every neighbor has replied.
    fn check_state_done(&mut self, ctx: &mut NodeContext<'_>) -> DualResult<()> {
        let adjacency = ctx.adjacency();
        if adjacency.neighbors().any(|n| !self.query_status.contains(n)) {
            return Ok(());
        }

        self.state = NodeState::Passive;
        let mut table = std::mem::take(&mut self.query_status);
        for link in adjacency.iter() {
            if !table.contains(link.neighbor) {
                table.set(link.neighbor, Distance::INFINITY);
            }
        }
        self.routing_table = table;
        self.record(ctx.round(), LogEvent::BecamePassive);
        debug!(node = %self.id, "diffusing computation complete");

        let deferred_reply = self.distance.successor;
        self.run_checks(ctx)?;
        if let Some(to) = deferred_reply {
            self.send_reply(ctx, to);
        }
        Ok(())
    }

    /// Log a refused request and build the error for it. State is left
    /// untouched.
    fn violation(&mut self, round: Round, violation: ProtocolViolation) -> DualError {
        warn!(node = %self.id, %violation, "protocol violation; request ignored");
        self.record(round, LogEvent::Violation(violation.to_string()));
        DualError::protocol(self.id, violation)
    }

    // ── Outbound ──────────────────────────────────────────────────

    /// Advertise the current distance to every finite-cost neighbor.
    pub fn send_updates(&mut self, ctx: &mut NodeContext<'_>) {
        if ctx.broadcast(MessageKind::Update, self.id) > 0 {
            self.record(
                ctx.round(),
                LogEvent::Broadcast {
                    kind: MessageKind::Update,
                    distance: self.distance.distance,
                },
            );
        }
    }

    fn send_reply(&mut self, ctx: &mut NodeContext<'_>, to: NodeId) {
        ctx.send(MessageKind::Reply, self.id, to);
        self.record(
            ctx.round(),
            LogEvent::SentReply {
                to,
                distance: self.distance.distance,
            },
        );
    }
}

/// The link minimizing neighbor distance plus link cost, over every link
/// including infinite-cost ones. Later links win ties.
fn min_from(adjacency: &Adjacency) -> Option<AdjacentLink> {
    let mut best: Option<&AdjacentLink> = None;
    for link in adjacency.iter() {
        best = match best {
            Some(b) if b.neighbor_distance + b.cost < link.neighbor_distance + link.cost => Some(b),
            _ => Some(link),
        };
    }
    best.copied()
}
