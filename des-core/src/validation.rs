//! Argument and configuration checks shared by the simulator crates
//!
//! Each helper returns the error kind the caller's contract calls for:
//! configuration helpers fail with [`SimError::InvalidConfiguration`],
//! argument helpers with [`SimError::InvalidArgument`].

use crate::dists::Distribution;
use crate::error::SimError;
use crate::time::SimTime;
use crate::types::ServerId;

/// Tolerance used when comparing probability sums.
pub const PROBABILITY_EPSILON: f64 = 1e-9;

/// A routing or priority weight must be a finite probability.
pub fn validate_probability(field: &str, value: f64) -> Result<(), SimError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(SimError::configuration(format!(
            "{field} must be a probability in [0, 1], got {value}"
        )));
    }
    Ok(())
}

/// Helper for validating that a weight is non-negative and finite
pub fn validate_non_negative_weight(field: &str, value: f64) -> Result<(), SimError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::configuration(format!(
            "{field} must be non-negative, got {value}"
        )));
    }
    Ok(())
}

/// The id must refer to one of `server_count` servers.
pub fn validate_server_id(server: ServerId, server_count: usize) -> Result<(), SimError> {
    if server.0 >= server_count {
        return Err(SimError::configuration(format!(
            "{server} does not exist, only {server_count} servers were created (ids start at 0)"
        )));
    }
    Ok(())
}

/// Convert a caller supplied duration into ticks, rejecting negative and non-finite values.
pub fn validate_time(field: &str, value: f64) -> Result<SimTime, SimError> {
    SimTime::try_from_f64(value).map_err(|_| {
        SimError::argument(format!(
            "{field} must be a non-negative finite time, got {value}"
        ))
    })
}

/// A service slice must be strictly positive.
pub fn validate_quantum(value: f64) -> Result<(), SimError> {
    if !value.is_finite() || value <= 0.0 {
        return Err(SimError::configuration(format!(
            "round-robin quantum must be positive and finite, got {value}"
        )));
    }
    Ok(())
}

/// True when the mean of `distribution` rounds below one tick, so drawing
/// from it would not move the clock.
pub fn mean_rounds_to_zero(distribution: &Distribution) -> bool {
    SimTime::try_from_f64(distribution.mean()).is_ok_and(|mean| mean.as_ticks() == 0)
}
