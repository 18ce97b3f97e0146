//! JSON export for results
//!
//! Writes the run summary as one JSON document.

use crate::error::MetricsError;
use crate::export::MetricsExporter;
use crate::results::SimulationResults;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

/// JSON exporter for simulation results
#[derive(Debug)]
pub struct JsonExporter {
    path: PathBuf,
    pretty: bool,
}

impl JsonExporter {
    /// Create a new JSON exporter
    ///
    /// # Arguments
    /// * `path` - Output file path
    /// * `pretty` - Whether to pretty-print the JSON
    pub fn new(path: &Path, pretty: bool) -> Self {
        Self {
            path: path.to_path_buf(),
            pretty,
        }
    }

    /// Render the summary without touching the filesystem
    pub fn render(&self, results: &SimulationResults) -> Result<String, MetricsError> {
        let summary = results.summary();
        let json = if self.pretty {
            serde_json::to_string_pretty(&summary)?
        } else {
            serde_json::to_string(&summary)?
        };
        Ok(json)
    }
}

impl MetricsExporter for JsonExporter {
    fn export(&self, results: &SimulationResults) -> Result<(), MetricsError> {
        let json = self.render(results)?;
        let mut file = File::create(&self.path)?;
        file.write_all(json.as_bytes())?;
        tracing::debug!(path = %self.path.display(), "Exported results as JSON");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use des_core::SimTime;

    #[test]
    fn test_render_compact_and_pretty() {
        let results = SimulationResults::new(2, SimTime::from_units(10), "minutes").unwrap();
        let compact = JsonExporter::new(Path::new("unused.json"), false).render(&results).unwrap();
        let pretty = JsonExporter::new(Path::new("unused.json"), true).render(&results).unwrap();
        assert!(!compact.contains('\n'));
        assert!(pretty.contains('\n'));
        assert!(compact.contains("\"time_unit\":\"minutes\""));
    }

    #[test]
    fn test_export_writes_file() {
        let results = SimulationResults::new(1, SimTime::from_units(10), "seconds").unwrap();
        let path = std::env::temp_dir().join(format!("queuenet_json_export_{}.json", std::process::id()));
        JsonExporter::new(&path, true).export(&results).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        std::fs::remove_file(&path).ok();
        let value: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(value["servers"].as_array().unwrap().len(), 1);
    }
}
