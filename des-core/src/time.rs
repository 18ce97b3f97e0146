//! Simulation time management

use crate::error::SimError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Sub};

/// Number of ticks in one abstract time unit.
pub const TICKS_PER_UNIT: u64 = 10_000;

const TICKS_PER_UNIT_F64: f64 = TICKS_PER_UNIT as f64;

/// Simulation time with a resolution of 1e-4 time units
///
/// SimTime represents either a point in simulation time or a span of it,
/// stored as an integer count of ticks since the simulation start. Every
/// instant the simulator schedules is therefore rounded to four decimal
/// places, and sums and differences of instants are exact.
///
/// The time unit itself is abstract: the environment only carries a label
/// (`"seconds"`, `"minutes"`, ...) for reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct SimTime(u64);

impl SimTime {
    /// Create a new SimTime at the simulation start (time zero)
    pub const fn zero() -> Self {
        SimTime(0)
    }

    /// Create a SimTime from raw ticks
    pub const fn from_ticks(ticks: u64) -> Self {
        SimTime(ticks)
    }

    /// Create a SimTime from a whole number of time units
    pub const fn from_units(units: u64) -> Self {
        SimTime(units.saturating_mul(TICKS_PER_UNIT))
    }

    /// Get the raw tick value
    pub const fn as_ticks(&self) -> u64 {
        self.0
    }

    /// Convert to fractional time units
    pub fn as_f64(&self) -> f64 {
        self.0 as f64 / TICKS_PER_UNIT_F64
    }

    /// Create a SimTime from fractional time units, rounding to the nearest tick.
    ///
    /// # Examples
    /// ```
    /// # use des_core::SimTime;
    /// let t = SimTime::try_from_f64(1.23456).unwrap();
    /// assert_eq!(t.as_ticks(), 12_346);
    /// assert!(SimTime::try_from_f64(-1.0).is_err());
    /// ```
    pub fn try_from_f64(value: f64) -> Result<Self, SimError> {
        if !value.is_finite() {
            return Err(SimError::InvalidArgument(format!(
                "time must be finite, got {value}"
            )));
        }
        if value < 0.0 {
            return Err(SimError::InvalidArgument(format!(
                "time must be non-negative, got {value}"
            )));
        }
        let max_units = u64::MAX as f64 / TICKS_PER_UNIT_F64;
        if value > max_units {
            return Err(SimError::InvalidArgument(format!(
                "time {value} exceeds the representable range ({max_units})"
            )));
        }
        Ok(SimTime((value * TICKS_PER_UNIT_F64).round() as u64))
    }

    /// Advance by a sampled offset expressed in time units.
    ///
    /// The offset is rounded to the nearest tick. Negative and NaN offsets
    /// leave the time unchanged, so the clock never runs backwards.
    pub fn offset(&self, delta: f64) -> SimTime {
        // float-to-int `as` casts saturate: negatives and NaN become 0
        let ticks = (delta * TICKS_PER_UNIT_F64).round() as u64;
        SimTime(self.0.saturating_add(ticks))
    }

    /// Span elapsed since `earlier`, or zero if `earlier` is later
    pub fn saturating_since(&self, earlier: SimTime) -> SimTime {
        SimTime(self.0.saturating_sub(earlier.0))
    }

    /// Span elapsed since `earlier`, or `None` if `earlier` is later
    pub fn checked_since(&self, earlier: SimTime) -> Option<SimTime> {
        self.0.checked_sub(earlier.0).map(SimTime)
    }
}

impl Add<SimTime> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: SimTime) -> Self::Output {
        SimTime(self.0.saturating_add(rhs.0))
    }
}

impl AddAssign<SimTime> for SimTime {
    fn add_assign(&mut self, rhs: SimTime) {
        *self = *self + rhs;
    }
}

impl Sub<SimTime> for SimTime {
    type Output = SimTime;

    fn sub(self, rhs: SimTime) -> Self::Output {
        self.saturating_since(rhs)
    }
}

impl std::iter::Sum for SimTime {
    fn sum<I: Iterator<Item = SimTime>>(iter: I) -> Self {
        iter.fold(SimTime::zero(), |acc, t| acc + t)
    }
}

impl TryFrom<f64> for SimTime {
    type Error = SimError;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        SimTime::try_from_f64(value)
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let whole = self.0 / TICKS_PER_UNIT;
        let frac = self.0 % TICKS_PER_UNIT;
        write!(f, "{whole}.{frac:04}")
    }
}
