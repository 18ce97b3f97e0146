//! Service, arrival and think-time distributions
//!
//! A [`Distribution`] is a closed set of sampling strategies. Parameters are
//! validated once at construction; afterwards sampling only consumes the
//! caller's random source.

use crate::error::SimError;
use crate::randomness::SimRng;
use serde::{Deserialize, Serialize};

/// Sampling strategy for durations expressed in abstract time units.
///
/// # Examples
///
/// ```
/// use des_core::{Distribution, SimRng};
///
/// let service = Distribution::exponential(2.0).unwrap();
/// let mut rng = SimRng::seeded(7);
/// let sample = service.sample(&mut rng);
/// assert!(sample >= 0.0);
/// assert!((service.mean() - 0.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    /// Always returns `value`.
    Constant { value: f64 },
    /// Exponential with the given `rate` (mean `1 / rate`).
    Exponential { rate: f64 },
    /// Uniform over `[low, high]`.
    Uniform { low: f64, high: f64 },
    /// Gaussian with the given mean and standard deviation. Samples may be
    /// negative; the scheduler treats a negative offset as zero.
    Normal { mean: f64, std_dev: f64 },
}

// =============================================================================
// Construction
// =============================================================================

impl Distribution {
    pub fn constant(value: f64) -> Result<Self, SimError> {
        let dist = Distribution::Constant { value };
        dist.validate()?;
        Ok(dist)
    }

    pub fn exponential(rate: f64) -> Result<Self, SimError> {
        let dist = Distribution::Exponential { rate };
        dist.validate()?;
        Ok(dist)
    }

    pub fn uniform(low: f64, high: f64) -> Result<Self, SimError> {
        let dist = Distribution::Uniform { low, high };
        dist.validate()?;
        Ok(dist)
    }

    pub fn normal(mean: f64, std_dev: f64) -> Result<Self, SimError> {
        let dist = Distribution::Normal { mean, std_dev };
        dist.validate()?;
        Ok(dist)
    }

    /// Check the parameter constraints.
    ///
    /// Constructors call this; values obtained through deserialization must
    /// be checked explicitly before use.
    pub fn validate(&self) -> Result<(), SimError> {
        let name = self.name();
        match *self {
            Distribution::Constant { value } => {
                require_non_negative(name, "value", value)?;
            }
            Distribution::Exponential { rate } => {
                if !rate.is_finite() || rate <= 0.0 {
                    return Err(SimError::distribution(
                        name,
                        format!("rate must be positive and finite, got {rate}"),
                    ));
                }
            }
            Distribution::Uniform { low, high } => {
                require_non_negative(name, "low", low)?;
                require_non_negative(name, "high", high)?;
                if high < low {
                    return Err(SimError::distribution(
                        name,
                        format!("high ({high}) must not be smaller than low ({low})"),
                    ));
                }
            }
            Distribution::Normal { mean, std_dev } => {
                require_non_negative(name, "mean", mean)?;
                require_non_negative(name, "std_dev", std_dev)?;
            }
        }
        Ok(())
    }
}

fn require_non_negative(distribution: &'static str, field: &str, value: f64) -> Result<(), SimError> {
    if !value.is_finite() || value < 0.0 {
        return Err(SimError::distribution(
            distribution,
            format!("{field} must be non-negative and finite, got {value}"),
        ));
    }
    Ok(())
}

// =============================================================================
// Sampling
// =============================================================================

impl Distribution {
    /// Draw one value.
    pub fn sample(&self, rng: &mut SimRng) -> f64 {
        match *self {
            Distribution::Constant { value } => value,
            Distribution::Exponential { rate } => -(1.0 - rng.unit()).ln() / rate,
            Distribution::Uniform { low, high } => rng.uniform(low, high),
            Distribution::Normal { mean, std_dev } => mean + std_dev * rng.standard_normal(),
        }
    }

    /// Analytical mean
    pub fn mean(&self) -> f64 {
        match *self {
            Distribution::Constant { value } => value,
            Distribution::Exponential { rate } => 1.0 / rate,
            Distribution::Uniform { low, high } => (low + high) / 2.0,
            Distribution::Normal { mean, .. } => mean,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Distribution::Constant { .. } => "constant",
            Distribution::Exponential { .. } => "exponential",
            Distribution::Uniform { .. } => "uniform",
            Distribution::Normal { .. } => "normal",
        }
    }
}
