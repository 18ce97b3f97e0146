//! The facade exposes everything needed to build, run and export a network

use queuenet::prelude::*;

fn two_station_network(seed: u64) -> Environment {
    let mut env = new_environment(None, None)
        .unwrap()
        .with_options(EnvironmentOptions {
            seed: Some(seed),
            time_unit: "minutes".to_string(),
            ..EnvironmentOptions::default()
        })
        .unwrap();
    let first = env.add_server(Distribution::exponential(2.0).unwrap(), None).unwrap();
    let second = env
        .add_server(Distribution::constant(0.3).unwrap(), Some(Discipline::round_robin(0.1).unwrap()))
        .unwrap();
    env.add_entry_point(first, Distribution::exponential(1.0).unwrap(), None)
        .unwrap();
    env.add_servers_connection(first, second, 0.5).unwrap();
    env
}

#[test]
fn test_report_lists_every_server() {
    let results = two_station_network(1).simulate(200.0, 20.0).unwrap();
    let report = results.to_string();
    assert!(report.contains("Environment Metrics"));
    assert!(report.contains("minutes"));
    assert!(report.contains("Server 1"));
    assert!(report.contains("Server 2"));
}

#[test]
fn test_exports_write_summary_files() {
    let results = two_station_network(2).simulate(200.0, 0.0).unwrap();
    let dir = std::env::temp_dir();
    let json = dir.join(format!("queuenet_facade_{}.json", std::process::id()));
    let csv = dir.join(format!("queuenet_facade_{}.csv", std::process::id()));

    export_json(&results, &json, false).unwrap();
    export_csv(&results, &csv).unwrap();

    let json_text = std::fs::read_to_string(&json).unwrap();
    let csv_text = std::fs::read_to_string(&csv).unwrap();
    std::fs::remove_file(&json).ok();
    std::fs::remove_file(&csv).ok();

    assert!(json_text.contains("\"time_unit\":\"minutes\""));
    assert_eq!(csv_text.lines().count(), 3);
}

#[test]
fn test_execution_can_be_stepped_by_hand() {
    let env = two_station_network(3);
    let mut execution = env.execution(50.0, 0.0).unwrap();
    let mut last = SimTime::zero();
    Executor::steps(200)
        .side_effect(|execution: &Execution| {
            assert!(execution.current_time() >= last);
            last = execution.current_time();
        })
        .execute(&mut execution)
        .unwrap();
    assert!(execution.current_time() > SimTime::zero());
}

#[test]
fn test_errors_surface_through_the_facade() {
    assert!(matches!(
        new_environment(Some(2), None),
        Err(SimError::InvalidConfiguration(_))
    ));
    assert!(matches!(
        Distribution::exponential(0.0),
        Err(SimError::OutOfRangeDistributionParameter { .. })
    ));
}
