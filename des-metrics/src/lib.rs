//! Statistics and reporting for queueing network simulations
//!
//! This crate holds the online accumulators the event loop feeds
//! ([`EnvironmentMetrics`], [`ServerMetrics`], [`PriorityMetrics`]), the
//! [`SimulationResults`] that groups them for one run, and exporters for the
//! derived figures.

pub mod error;
pub mod export;
pub mod results;
pub mod simulation_metrics;

pub use error::MetricsError;
pub use results::{
    EnvironmentResults, Percentiles, PriorityResults, ServerResults, SimulationResults,
    SimulationSummary,
};
pub use simulation_metrics::{
    EnvironmentMetrics, GeneralMetrics, PopulationIntegral, PriorityMetrics, ServerMetrics,
};
