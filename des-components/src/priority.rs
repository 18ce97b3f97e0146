//! Priority class distributions for generated jobs

use des_core::validation::validate_non_negative_weight;
use des_core::{Priority, SimError, SimRng};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Discrete distribution over priority values.
///
/// Weights are normalized to sum to 1 unless they already do at four
/// decimal places. Draws walk the priorities in ascending order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Priority, f64>", into = "BTreeMap<Priority, f64>")]
pub struct PriorityDistribution {
    entries: Vec<(Priority, f64)>,
}

impl PriorityDistribution {
    pub fn new<I>(weights: I) -> Result<Self, SimError>
    where
        I: IntoIterator<Item = (Priority, f64)>,
    {
        let weights: BTreeMap<Priority, f64> = weights.into_iter().collect();
        for (priority, weight) in &weights {
            validate_non_negative_weight(&format!("weight of priority {priority}"), *weight)?;
        }
        let total: f64 = weights.values().sum();
        if total <= 0.0 {
            return Err(SimError::configuration(
                "priority distribution needs at least one positive weight",
            ));
        }
        let already_normalized = (total * 10_000.0).round() == 10_000.0;
        let entries = weights
            .into_iter()
            .map(|(priority, weight)| {
                if already_normalized {
                    (priority, weight)
                } else {
                    (priority, weight / total)
                }
            })
            .collect();
        Ok(Self { entries })
    }

    /// Builds a distribution from textual keys, as an external JSON layer
    /// hands them over.
    pub fn parse<I, K>(weights: I) -> Result<Self, SimError>
    where
        I: IntoIterator<Item = (K, f64)>,
        K: AsRef<str>,
    {
        let parsed = weights
            .into_iter()
            .map(|(key, weight)| {
                let key = key.as_ref();
                key.trim()
                    .parse::<Priority>()
                    .map(|priority| (priority, weight))
                    .map_err(|_| {
                        SimError::configuration(format!(
                            "priority keys must be non-negative integers, got {key:?}"
                        ))
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(parsed)
    }

    /// Every job gets `priority`.
    pub fn single(priority: Priority) -> Self {
        Self {
            entries: vec![(priority, 1.0)],
        }
    }

    pub fn draw(&self, rng: &mut SimRng) -> Priority {
        let picked = rng.pick_cumulative(self.entries.iter().map(|(_, weight)| *weight));
        // rounding can leave a sliver of mass past the last entry
        picked
            .or(self.entries.len().checked_sub(1))
            .map_or(0, |index| self.entries[index].0)
    }

    /// Normalized weight of `priority`, 0 if absent
    pub fn weight(&self, priority: Priority) -> f64 {
        self.entries
            .iter()
            .find(|(p, _)| *p == priority)
            .map_or(0.0, |(_, weight)| *weight)
    }

    pub fn priorities(&self) -> impl Iterator<Item = Priority> + '_ {
        self.entries.iter().map(|(priority, _)| *priority)
    }
}

impl TryFrom<BTreeMap<Priority, f64>> for PriorityDistribution {
    type Error = SimError;

    fn try_from(weights: BTreeMap<Priority, f64>) -> Result<Self, Self::Error> {
        Self::new(weights)
    }
}

impl From<PriorityDistribution> for BTreeMap<Priority, f64> {
    fn from(distribution: PriorityDistribution) -> Self {
        distribution.entries.into_iter().collect()
    }
}
