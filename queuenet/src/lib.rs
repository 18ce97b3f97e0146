//! # queuenet - Queueing Network Simulator
//!
//! queuenet is a seedable, single-threaded discrete-event simulator for open
//! and closed queueing networks. Servers use FCFS, LCFS, shortest remaining
//! time, round-robin or priority scheduling, jobs move between them by
//! probabilistic routing, and a run reports utilization, throughput, queue
//! times and populations per server, per priority class and network-wide.
//!
//! ## Quick Start
//!
//! ```
//! use queuenet::prelude::*;
//!
//! let mut env = new_environment(None, None).unwrap();
//! let web = env.add_server(Distribution::exponential(4.0).unwrap(), None).unwrap();
//! let db = env
//!     .add_server(Distribution::exponential(6.0).unwrap(), Some(Discipline::Lcfs))
//!     .unwrap();
//! env.add_entry_point(web, Distribution::exponential(2.0).unwrap(), None).unwrap();
//! env.add_servers_connection(web, db, 0.5).unwrap();
//!
//! let results = env.simulate(500.0, 50.0).unwrap();
//! assert!(results.environment_metrics().number_of_processed_jobs() > 0);
//! println!("{results}");
//! ```
//!
//! ## Crates
//!
//! - [`core`]: time, events, jobs, distributions, randomness, errors, logging
//! - [`metrics`]: statistics accumulators, summaries and exporters
//! - [`components`]: disciplines, servers, topologies, the event loop and
//!   the [`Environment`](components::Environment) builder

pub use des_components as components;
pub use des_core as core;
pub use des_metrics as metrics;

pub use des_components::{new_environment, Environment, EnvironmentOptions};
pub use des_core::SimError;
pub use des_metrics::SimulationResults;

pub mod prelude {
    //! Commonly used types and traits

    pub use des_core::{
        init_simulation_logging, Distribution, Execute, Executor, Priority, ServerId, SimError,
        SimTime, Step,
    };

    pub use des_components::{
        new_environment, Discipline, Environment, EnvironmentOptions, Execution,
        PriorityDistribution,
    };

    pub use des_metrics::export::{export_csv, export_json};
    pub use des_metrics::{MetricsError, SimulationResults, SimulationSummary};
}
