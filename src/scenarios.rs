//! End-to-end scenarios: whole networks driven through the simulator.
//!
//! Converged routes are checked against a plain Dijkstra over the current
//! topology.

use std::collections::{BTreeMap, BTreeSet};

use crate::builder::{two_path, ScenarioBuilder};
use crate::config::{ActiveChangePolicy, SimConfig};
use crate::error::{DualError, ErrorKind, ProtocolViolation};
use crate::message::MessageKind;
use crate::node::{ActiveReason, Distance, DistanceState, LinkId, NodeId, NodeState};
use crate::simulation::{ChangeOutcome, RunStatus, Simulator};
use crate::trace::DeliveryOutcome;

// ── Helpers ───────────────────────────────────────────────────────────

fn id(sim: &Simulator, name: &str) -> NodeId {
    sim.node_id(name).unwrap()
}

fn route(sim: &Simulator, name: &str) -> DistanceState {
    sim.node(id(sim, name)).unwrap().distance()
}

fn link(sim: &Simulator, a: &str, b: &str) -> LinkId {
    sim.topology()
        .link_between(id(sim, a), id(sim, b))
        .map(|l| l.id)
        .unwrap()
}

fn state(dist: f64, fd: f64, via: Option<NodeId>) -> DistanceState {
    DistanceState::new(
        Distance::new(dist).unwrap(),
        Distance::new(fd).unwrap(),
        via,
    )
}

/// Shortest distances to `dest` over finite-cost links.
fn dijkstra(sim: &Simulator, dest: NodeId) -> BTreeMap<NodeId, f64> {
    let mut dist: BTreeMap<NodeId, f64> = sim.nodes().map(|n| (n.id(), f64::INFINITY)).collect();
    let mut done: Vec<NodeId> = Vec::new();
    dist.insert(dest, 0.0);
    loop {
        let next = dist
            .iter()
            .filter(|(n, d)| !done.contains(*n) && d.is_finite())
            .min_by(|x, y| x.1.total_cmp(y.1))
            .map(|(n, d)| (*n, *d));
        let Some((node, base)) = next else { break };
        done.push(node);
        for l in sim.topology().links() {
            if let Some(other) = l.other(node) {
                let candidate = base + l.cost.value();
                if candidate < dist[&other] {
                    dist.insert(other, candidate);
                }
            }
        }
    }
    dist
}

/// Every router is PASSIVE, its distance is the true shortest one and
/// its successor lies on a shortest path.
fn assert_optimal(sim: &Simulator, dest: &str) {
    let dest = id(sim, dest);
    let expected = dijkstra(sim, dest);
    for node in sim.nodes() {
        assert!(node.state().is_passive(), "{} still active", node);
        let want = expected[&node.id()];
        let got = node.distance();
        assert_eq!(got.distance.value(), want, "distance of {}", node);
        if node.id() == dest {
            continue;
        }
        match got.successor {
            Some(next) => {
                let cost = sim.topology().link_between(node.id(), next).unwrap().cost.value();
                assert_eq!(expected[&next] + cost, want, "successor of {}", node);
            }
            None => assert!(want.is_infinite(), "{} has no successor", node),
        }
    }
}

/// D, Q, P, R: a cheap path D–Q–P–R and an expensive direct R–D link.
fn square(config: SimConfig) -> Simulator {
    let (sim, report) = ScenarioBuilder::new()
        .nodes(&["D", "Q", "P", "R"])
        .link("D", "Q", 1.0)
        .link("Q", "P", 1.0)
        .link("P", "R", 1.0)
        .link("R", "D", 5.0)
        .destination("D")
        .config(config)
        .run()
        .unwrap();
    assert!(report.converged());
    sim
}

// ── Initial convergence ───────────────────────────────────────────────

#[test]
fn test_two_path_initial_convergence() {
    let (sim, report) = two_path().run().unwrap();
    assert_eq!(report.status, RunStatus::Quiescent);
    assert_eq!(report.rounds, 4);
    assert!(report.violations.is_empty());
    assert!(sim.is_converged());

    assert_eq!(route(&sim, "a"), state(12.0, 12.0, Some(id(&sim, "b"))));
    assert_eq!(route(&sim, "b"), state(11.0, 11.0, Some(id(&sim, "c"))));
    assert_eq!(route(&sim, "c"), state(10.0, 10.0, Some(id(&sim, "d"))));
    assert_eq!(route(&sim, "d"), DistanceState::origin(id(&sim, "d")));
    assert_eq!(route(&sim, "u"), state(12.0, 12.0, Some(id(&sim, "v"))));
    assert_eq!(route(&sim, "v"), state(11.0, 11.0, Some(id(&sim, "w"))));
    assert_eq!(route(&sim, "w"), state(10.0, 10.0, Some(id(&sim, "d"))));
    assert_optimal(&sim, "d");
}

#[test]
fn test_round_cap_reports_pending_messages() {
    let (sim, report) = two_path().max_rounds(2).run().unwrap();
    assert_eq!(report.rounds, 2);
    match report.status {
        RunStatus::RoundCapReached { pending } => {
            assert!(pending > 0);
            assert_eq!(pending, sim.pending().len());
        }
        other => panic!("expected round cap, got {:?}", other),
    }
    assert!(!report.converged());
    assert!(!sim.is_converged());

    let err = report.into_result().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NonConvergence);
}

#[test]
fn test_round_cap_applies_per_run() {
    let (mut sim, report) = two_path().max_rounds(2).run().unwrap();
    assert!(!report.converged());
    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert_optimal(&sim, "d");
}

#[test]
fn test_feasible_distance_never_rises_while_passive() {
    let mut sim = two_path().build().unwrap();
    sim.inject_initial_advertisement(id(&sim, "d")).unwrap();
    let mut last: Vec<Distance> = sim.nodes().map(|n| n.distance().feasible_distance).collect();
    while sim.step().unwrap().is_some() {
        for (node, prev) in sim.nodes().zip(last.iter_mut()) {
            let fd = node.distance().feasible_distance;
            if node.state().is_passive() {
                assert!(fd <= *prev, "{} fd rose from {} to {}", node, prev, fd);
            }
            *prev = fd;
        }
    }
}

#[test]
fn test_messages_never_delivered_in_sending_round() {
    let (sim, _) = two_path().run().unwrap();
    assert!(!sim.trace().is_empty());
    for entry in sim.trace() {
        assert!(entry.round > entry.message.sent_in, "{}", entry);
    }
}

#[test]
fn test_run_checks_after_convergence_is_silent() {
    let (mut sim, _) = two_path().run().unwrap();
    let ids: Vec<NodeId> = sim.nodes().map(|n| n.id()).collect();
    for node in ids {
        assert_eq!(sim.run_checks(node).unwrap(), 0);
    }
    assert!(sim.pending().is_empty());
}

#[test]
fn test_identical_runs_have_identical_traces() {
    let run = || {
        let (mut sim, _) = two_path().run().unwrap();
        let cd = link(&sim, "c", "d");
        sim.change_link_cost(cd, 50.0).unwrap();
        sim.run_to_quiescence().unwrap();
        sim
    };
    let first = run();
    let second = run();
    assert_eq!(first.trace(), second.trace());
    assert_eq!(first.trace_hash(), second.trace_hash());
    assert_ne!(first.trace_hash(), two_path().run().unwrap().0.trace_hash());
}

#[test]
fn test_operations_need_finalized_topology() {
    let mut sim = Simulator::new(SimConfig::default()).unwrap();
    let d = sim.create_node("d").unwrap();
    let a = sim.create_node("a").unwrap();
    sim.create_link(d, a, 1.0).unwrap();

    assert_eq!(sim.pin_destination(d), Err(DualError::NotFinalized));
    assert_eq!(sim.inject_initial_advertisement(d), Err(DualError::NotFinalized));
    assert_eq!(sim.step(), Err(DualError::NotFinalized));
    assert_eq!(sim.run_to_quiescence(), Err(DualError::NotFinalized));

    sim.finalize_topology().unwrap();
    sim.pin_destination(d).unwrap();
    assert_eq!(sim.inject_initial_advertisement(d).unwrap(), 1);
    assert!(sim.run_to_quiescence().unwrap().converged());
    assert_eq!(sim.node(a).unwrap().distance().distance.value(), 1.0);
}

// ── Cost increase ─────────────────────────────────────────────────────

#[test]
fn test_cost_increase_diffuses_to_alternate_path() {
    let mut sim = square(SimConfig::default());
    let (q, p, r) = (id(&sim, "Q"), id(&sim, "P"), id(&sim, "R"));
    assert_eq!(route(&sim, "Q"), state(1.0, 1.0, Some(id(&sim, "D"))));
    assert_eq!(route(&sim, "P"), state(2.0, 2.0, Some(q)));
    assert_eq!(route(&sim, "R"), state(3.0, 3.0, Some(p)));

    let qp = link(&sim, "Q", "P");
    assert_eq!(sim.change_link_cost(qp, 10.0).unwrap(), ChangeOutcome::Applied);

    // R reports 3, which is not below P's FD of 2.
    let p_node = sim.node(p).unwrap();
    assert_eq!(
        p_node.state(),
        NodeState::Active {
            reason: ActiveReason::DirectViolation,
            awaiting_successor: false,
        }
    );
    assert_eq!(p_node.distance().distance.value(), 11.0);
    assert!(p_node.distance().feasible_distance.is_infinite());

    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert_eq!(route(&sim, "P"), state(6.0, 6.0, Some(r)));
    assert_eq!(route(&sim, "R"), state(5.0, 5.0, Some(id(&sim, "D"))));
    assert_eq!(route(&sim, "Q"), state(1.0, 1.0, Some(id(&sim, "D"))));
    assert_optimal(&sim, "D");

    // P owed Q a reply from Q's earlier answer to its query; Q was
    // never waiting for it.
    assert_eq!(
        report.violations,
        vec![DualError::Protocol {
            node: q,
            violation: ProtocolViolation::ReplyWhilePassive { from: p },
        }]
    );
    assert!(sim
        .trace()
        .iter()
        .any(|e| e.outcome == DeliveryOutcome::Rejected && e.message.to == q));
}

#[test]
fn test_successor_query_holds_reply_until_passive() {
    let mut sim = square(SimConfig::default());
    let (p, r) = (id(&sim, "P"), id(&sim, "R"));
    let qp = link(&sim, "Q", "P");
    sim.change_link_cost(qp, 10.0).unwrap();

    let mut r_went_active = false;
    while sim.step().unwrap().is_some() {
        let r_node = sim.node(r).unwrap();
        if r_node.state().is_active() {
            r_went_active = true;
            assert!(
                !sim.pending()
                    .iter()
                    .any(|m| m.kind == MessageKind::Reply && m.from == r && m.to == p),
                "R replied to its successor while active"
            );
        }
    }
    assert!(r_went_active);
    assert!(sim.is_converged());
}

#[test]
fn test_reject_policy_refuses_change_at_active_router() {
    let mut sim = square(SimConfig::default());
    let p = id(&sim, "P");
    sim.change_link_cost(link(&sim, "Q", "P"), 10.0).unwrap();

    let pr = link(&sim, "P", "R");
    let err = sim.remove_link(pr).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ActiveTopologyChange);
    assert!(matches!(
        err,
        DualError::TopologyChangeDuringActiveComputation { node, .. } if node == p
    ));
    // Nothing happened to the link.
    assert!(sim.topology().link(pr).is_ok());
    assert!(sim.run_to_quiescence().unwrap().converged());
}

#[test]
fn test_defer_policy_applies_change_once_passive() {
    let mut sim = square(SimConfig::deferred());
    let r = id(&sim, "R");
    sim.change_link_cost(link(&sim, "Q", "P"), 10.0).unwrap();

    let pr = link(&sim, "P", "R");
    assert_eq!(sim.change_link_cost(pr, 2.0).unwrap(), ChangeOutcome::Deferred);
    assert_eq!(sim.deferred_changes().len(), 1);
    assert_eq!(sim.topology().link(pr).unwrap().cost.value(), 1.0);

    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert!(sim.deferred_changes().is_empty());
    assert_eq!(sim.topology().link(pr).unwrap().cost.value(), 2.0);
    // R (5) is still below P's FD of 6, so P switches without diffusing.
    assert_eq!(route(&sim, "P"), state(7.0, 6.0, Some(r)));
    assert_optimal(&sim, "D");
}

#[test]
fn test_deferred_change_counted_in_its_round() {
    let mut sim = square(SimConfig::deferred());
    let p = id(&sim, "P");
    sim.change_link_cost(link(&sim, "Q", "P"), 10.0).unwrap();
    let pr = link(&sim, "P", "R");
    sim.change_link_cost(pr, 2.0).unwrap();

    let mut applied = Vec::new();
    while let Some(step) = sim.step().unwrap() {
        if step.applied_changes > 0 {
            // Applied at the end of the round that left P passive.
            assert!(sim.node(p).unwrap().state().is_passive());
            assert_eq!(sim.topology().link(pr).unwrap().cost.value(), 2.0);
        }
        applied.push(step.applied_changes);
    }
    assert_eq!(applied.iter().sum::<usize>(), 1);
    assert_eq!(applied.iter().position(|n| *n == 1), Some(3));
    assert!(sim.is_converged());
}

#[test]
fn test_explicit_check_on_active_router_is_logged() {
    let mut sim = square(SimConfig::default());
    let p = id(&sim, "P");
    sim.change_link_cost(link(&sim, "Q", "P"), 10.0).unwrap();
    let before = sim.node(p).unwrap().log().len();

    let err = sim.run_checks(p).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Protocol);
    let node = sim.node(p).unwrap();
    assert_eq!(node.log().len(), before + 1);
    assert!(node.log_lines()[before].contains("feasibility check requested while active/direct"));
    assert!(sim.pending().iter().all(|m| m.kind == MessageKind::Query));
}

// ── Link removal ──────────────────────────────────────────────────────

#[test]
fn test_cut_off_routers_become_unreachable() {
    let (mut sim, _) = ScenarioBuilder::new()
        .nodes(&["D", "P", "Q"])
        .link("D", "P", 1.0)
        .link("P", "Q", 1.0)
        .destination("D")
        .run()
        .unwrap();
    assert_eq!(route(&sim, "P").distance.value(), 1.0);
    assert_eq!(route(&sim, "Q").distance.value(), 2.0);

    let (p, q) = (id(&sim, "P"), id(&sim, "Q"));
    sim.remove_link(link(&sim, "D", "P")).unwrap();
    assert!(sim.node(p).unwrap().state().is_active());

    let mut q_went_active = false;
    while sim.step().unwrap().is_some() {
        if sim.node(q).unwrap().state().is_active() {
            q_went_active = true;
            assert!(!sim
                .pending()
                .iter()
                .any(|m| m.kind == MessageKind::Reply && m.from == q && m.to == p));
        }
    }
    assert!(q_went_active);
    assert!(sim.is_converged());
    assert_eq!(route(&sim, "P"), DistanceState::UNREACHABLE);
    assert_eq!(route(&sim, "Q"), DistanceState::UNREACHABLE);
    assert_optimal(&sim, "D");
}

#[test]
fn test_removal_with_alternate_path() {
    let (mut sim, _) = two_path().run().unwrap();
    sim.remove_link(link(&sim, "w", "d")).unwrap();
    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert_optimal(&sim, "d");
    assert_eq!(route(&sim, "w").distance.value(), 13.0);
    assert_eq!(route(&sim, "u").distance.value(), 13.0);
}

#[test]
fn test_query_in_flight_blocks_removal() {
    let (mut sim, _) = two_path().run().unwrap();
    let (c, d) = (id(&sim, "c"), id(&sim, "d"));
    let cd = link(&sim, "c", "d");
    sim.change_link_cost(cd, 50.0).unwrap();
    assert!(sim
        .pending()
        .iter()
        .any(|m| m.kind == MessageKind::Query && m.from == c && m.to == d));

    assert_eq!(
        sim.remove_link(cd).unwrap_err().kind(),
        ErrorKind::ActiveTopologyChange
    );
    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert_optimal(&sim, "d");
    assert!(sim.topology().link_between(c, d).is_some());
}

#[test]
fn test_removed_link_drops_queued_messages() {
    let (mut sim, _) = two_path().run().unwrap();
    let (a, d) = (id(&sim, "a"), id(&sim, "d"));
    let before = route(&sim, "a");

    let ad = sim.create_link(a, d, 2.0).unwrap();
    assert_eq!(sim.pending().len(), 2);
    assert_eq!(sim.remove_link(ad).unwrap(), ChangeOutcome::Applied);
    assert_eq!(sim.pending().len(), 2);

    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert_eq!(report.delivered, 0);
    assert_eq!(report.dropped, 2);
    assert!(sim
        .trace()
        .iter()
        .rev()
        .take(2)
        .all(|e| e.outcome == DeliveryOutcome::Dropped));
    assert_eq!(route(&sim, "a"), before);
    assert_optimal(&sim, "d");
}

// ── Live link addition ────────────────────────────────────────────────

#[test]
fn test_live_link_carries_distance_at_delivery() {
    let (mut sim, _) = ScenarioBuilder::new()
        .nodes(&["D", "P", "Q"])
        .link("D", "P", 1.0)
        .link("P", "Q", 1.0)
        .destination("D")
        .run()
        .unwrap();
    let (d, q) = (id(&sim, "D"), id(&sim, "Q"));
    let before = sim.round();

    sim.create_link(d, q, 1.0).unwrap();
    assert_eq!(sim.pending().len(), 2);
    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert_eq!(route(&sim, "Q"), state(1.0, 1.0, Some(d)));
    assert_optimal(&sim, "D");

    // Q's Update to D was queued when Q was still at 2, but it carries
    // the 1 Q held once the round reached it.
    let entry = sim
        .trace()
        .iter()
        .find(|e| {
            e.round == before.next()
                && e.message.kind == MessageKind::Update
                && e.message.from == q
                && e.message.to == d
        })
        .unwrap();
    assert_eq!(entry.carried.value(), 1.0);
}

#[test]
fn test_live_link_rejects_parallel_and_self_links() {
    let (mut sim, _) = two_path().run().unwrap();
    let (a, b) = (id(&sim, "a"), id(&sim, "b"));
    assert!(matches!(
        sim.create_link(a, b, 3.0),
        Err(DualError::ParallelLink { .. })
    ));
    assert!(matches!(sim.create_link(a, a, 3.0), Err(DualError::SelfLoop(_))));
    assert!(matches!(
        sim.create_link(a, b, f64::NAN),
        Err(DualError::InvalidCost(_))
    ));
}

#[test]
fn test_shortcut_link_reroutes_network() {
    let (mut sim, _) = two_path().run().unwrap();
    let (a, d) = (id(&sim, "a"), id(&sim, "d"));
    sim.create_link(a, d, 2.0).unwrap();
    let report = sim.run_to_quiescence().unwrap();
    assert!(report.converged());
    assert_optimal(&sim, "d");
    assert_eq!(route(&sim, "a"), state(2.0, 2.0, Some(d)));
    assert_eq!(route(&sim, "b").distance.value(), 3.0);
    assert_eq!(route(&sim, "u").distance.value(), 3.0);
}

// ── Generated topologies ──────────────────────────────────────────────

/// Deterministic ring-with-chords networks, perturbed one link at a time.
#[test]
fn test_generated_networks_converge_to_shortest_paths() {
    let mut seed: u64 = 0x2545_f491_4f6c_dd1d;
    let mut next = move || {
        seed ^= seed << 13;
        seed ^= seed >> 7;
        seed ^= seed << 17;
        seed
    };

    for size in [5usize, 8, 12] {
        let names: Vec<String> = (0..size).map(|i| format!("n{}", i)).collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        let mut builder = ScenarioBuilder::new()
            .nodes(&refs)
            .destination("n0")
            .config(SimConfig::new().with_max_rounds(1_000));
        for i in 0..size {
            let cost = (next() % 9 + 1) as f64;
            builder = builder.link(&names[i], &names[(i + 1) % size], cost);
        }
        let mut chords = BTreeSet::new();
        for i in 0..size / 2 {
            let j = (i + 2 + next() as usize % (size - 3)) % size;
            let pair = (i.min(j), i.max(j));
            let ring = pair.1 - pair.0 == 1 || (pair.0 == 0 && pair.1 == size - 1);
            if pair.0 != pair.1 && !ring && chords.insert(pair) {
                builder = builder.link(&names[pair.0], &names[pair.1], (next() % 9 + 1) as f64);
            }
        }
        let (mut sim, report) = builder.run().unwrap();
        assert!(report.converged());
        assert_optimal(&sim, "n0");

        let links: Vec<LinkId> = sim.topology().links().map(|l| l.id).collect();
        for (k, l) in links.iter().enumerate() {
            let cost = if k % 2 == 0 {
                (next() % 20 + 1) as f64
            } else {
                (next() % 3 + 1) as f64
            };
            sim.change_link_cost(*l, cost).unwrap();
            let report = sim.run_to_quiescence().unwrap();
            assert!(report.converged(), "size {} change {}", size, k);
            assert_optimal(&sim, "n0");
        }
    }
}

#[test]
fn test_link_brought_up_waits_for_advertisement() {
    let (mut sim, _) = ScenarioBuilder::new()
        .nodes(&["d", "a", "b"])
        .link("d", "a", 1.0)
        .link("a", "b", f64::INFINITY)
        .link("b", "d", 4.0)
        .destination("d")
        .run()
        .unwrap();
    let (a, b) = (id(&sim, "a"), id(&sim, "b"));
    assert_eq!(route(&sim, "b"), state(4.0, 4.0, Some(id(&sim, "d"))));
    // Nothing ever crossed the infinite link.
    assert_eq!(sim.node(b).unwrap().routing_table().get(a), Some(Distance::INFINITY));

    sim.change_link_cost(link(&sim, "a", "b"), 1.0).unwrap();
    assert!(sim.run_to_quiescence().unwrap().converged());
    assert_eq!(route(&sim, "b").distance.value(), 4.0);

    assert_eq!(sim.inject_initial_advertisement(a).unwrap(), 2);
    assert!(sim.run_to_quiescence().unwrap().converged());
    assert_eq!(route(&sim, "b"), state(2.0, 2.0, Some(a)));
    assert_optimal(&sim, "d");
}

#[cfg(feature = "serialize")]
#[test]
fn test_policy_configured_from_json() {
    let config = SimConfig::from_json(r#"{"active_change_policy":"defer","max_rounds":50}"#).unwrap();
    assert_eq!(config.active_change_policy, ActiveChangePolicy::Defer);
    let sim = square(config);
    assert_eq!(sim.config().max_rounds, 50);
}
