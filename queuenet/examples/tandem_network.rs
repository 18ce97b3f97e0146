//! Web tier in front of a database, with a retry loop back to the web tier.
//!
//! Run with `cargo run -p queuenet --example tandem_network`. Set `RUST_LOG`
//! to `debug` to see configuration changes and preemptions.

use queuenet::prelude::*;

fn main() -> Result<(), MetricsError> {
    init_simulation_logging();

    let mut env = new_environment(None, None)?.with_options(EnvironmentOptions {
        with_priority: true,
        priority_with_preemption: true,
        time_unit: "ms".to_string(),
        seed: Some(2024),
        retain_jobs: false,
    })?;

    let web = env.add_server(Distribution::exponential(1.0 / 8.0)?, None)?;
    let db = env.add_server(Distribution::uniform(2.0, 6.0)?, Some(Discipline::Fcfs))?;

    let priorities = PriorityDistribution::new([(0, 0.8), (1, 0.2)])?;
    env.add_entry_point(web, Distribution::exponential(1.0 / 20.0)?, Some(priorities))?;
    env.add_servers_connection(web, db, 0.7)?;
    env.add_servers_connection(db, web, 0.1)?;

    let results = env.simulate(100_000.0, 5_000.0)?;
    println!("{results}");

    let out = std::env::temp_dir();
    export_json(&results, out.join("tandem_network.json"), true)?;
    export_csv(&results, out.join("tandem_network.csv"))?;
    tracing::info!(dir = %out.display(), "Exported summary");
    Ok(())
}
