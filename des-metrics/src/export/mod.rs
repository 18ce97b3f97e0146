//! Export functionality for simulation results
//!
//! Exporters write the [`SimulationSummary`](crate::SimulationSummary) of a
//! run to disk for analysis with external tools.

pub mod csv;
pub mod json;

use crate::error::MetricsError;
use crate::results::SimulationResults;
use std::path::Path;

/// Trait for exporting results to different formats
pub trait MetricsExporter {
    /// Export results to the configured destination
    fn export(&self, results: &SimulationResults) -> Result<(), MetricsError>;
}

/// Export results to JSON format
///
/// # Example
/// ```no_run
/// use des_metrics::SimulationResults;
/// use des_metrics::export::export_json;
/// use des_core::SimTime;
///
/// let results = SimulationResults::new(1, SimTime::from_units(100), "seconds").unwrap();
/// export_json(&results, "results/run.json", true).unwrap();
/// ```
pub fn export_json(
    results: &SimulationResults,
    path: impl AsRef<Path>,
    pretty: bool,
) -> Result<(), MetricsError> {
    let exporter = json::JsonExporter::new(path.as_ref(), pretty);
    exporter.export(results)
}

/// Export per-server results to CSV format, one row per server
///
/// # Example
/// ```no_run
/// use des_metrics::SimulationResults;
/// use des_metrics::export::export_csv;
/// use des_core::SimTime;
///
/// let results = SimulationResults::new(2, SimTime::from_units(100), "seconds").unwrap();
/// export_csv(&results, "results/servers.csv").unwrap();
/// ```
pub fn export_csv(results: &SimulationResults, path: impl AsRef<Path>) -> Result<(), MetricsError> {
    let exporter = csv::CsvExporter::new(path.as_ref());
    exporter.export(results)
}
