//! Error types for the simulation framework

use thiserror::Error;

/// Top-level error type for simulation operations
///
/// The kernel performs no I/O, so none of these are transient: every error is
/// raised synchronously by the call that violated a contract and is fatal to
/// the current run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    /// Bad topology or options: probability mass above 1, unknown server id,
    /// an operation used on the wrong network variant, a malformed priority map.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Negative time or size, or a missing object, passed to an accounting operation.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid {distribution} distribution parameter: {reason}")]
    OutOfRangeDistributionParameter {
        distribution: &'static str,
        reason: String,
    },
}

impl SimError {
    pub fn configuration(message: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(message.into())
    }

    pub fn argument(message: impl Into<String>) -> Self {
        SimError::InvalidArgument(message.into())
    }

    pub fn distribution(distribution: &'static str, reason: impl Into<String>) -> Self {
        SimError::OutOfRangeDistributionParameter {
            distribution,
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert_eq!(
            SimError::configuration("unknown server 3").to_string(),
            "Invalid configuration: unknown server 3"
        );
        assert_eq!(
            SimError::argument("negative time").to_string(),
            "Invalid argument: negative time"
        );
        assert_eq!(
            SimError::distribution("uniform", "high < low").to_string(),
            "Invalid uniform distribution parameter: high < low"
        );
    }
}
