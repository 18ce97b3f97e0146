//! Error types for result export

use des_core::SimError;
use thiserror::Error;

/// Errors raised while turning results into files
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Simulation error: {0}")]
    Simulation(#[from] SimError),
}
