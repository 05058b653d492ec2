use dualsim::builder::two_path;
use dualsim::{DualResult, Simulator};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    if let Err(e) = run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> DualResult<()> {
    println!("═══════════════════════════════════════════════════════");
    println!("  dualsim: DUAL loop-free distance-vector routing");
    println!("═══════════════════════════════════════════════════════");
    println!();

    let (mut sim, report) = two_path().run()?;
    println!("  Initial convergence: {} rounds, {} messages", report.rounds, report.delivered);
    print_routes(&sim)?;

    // Make the c–d link expensive: b's route has to move over to v.
    let c = sim.node_id("c")?;
    let d = sim.node_id("d")?;
    if let Some(cd) = sim.topology().link_between(c, d).map(|l| l.id) {
        sim.change_link_cost(cd, 50.0)?;
        let report = sim.run_to_quiescence()?.into_result()?;
        println!(
            "  After c–d cost 10 → 50: {} rounds, {} messages, {} violations",
            report.rounds,
            report.delivered,
            report.violations.len()
        );
        print_routes(&sim)?;
    }

    // Cut w–d: everything must fall back to the expensive c–d path.
    let w = sim.node_id("w")?;
    if let Some(wd) = sim.topology().link_between(w, d).map(|l| l.id) {
        sim.remove_link(wd)?;
        let report = sim.run_to_quiescence()?.into_result()?;
        println!("  After removing w–d: {} rounds, {} messages", report.rounds, report.delivered);
        print_routes(&sim)?;
    }

    println!("  Trace hash: {:016x}", sim.trace_hash());
    Ok(())
}

fn print_routes(sim: &Simulator) -> DualResult<()> {
    for node in sim.nodes() {
        let next = match node.distance().successor {
            Some(id) => sim.node(id)?.name().to_string(),
            None => "--".to_string(),
        };
        println!(
            "    {:>2}  dist {:>4}  fd {:>4}  via {:>2}  {}",
            node.name(),
            node.distance().distance,
            node.distance().feasible_distance,
            next,
            node.state()
        );
    }
    println!();
    Ok(())
}
