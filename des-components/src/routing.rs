//! Probabilistic routing tables
//!
//! Weights are stored densely by destination server id. Whatever mass the
//! explicit destinations leave uncovered is the "end" route: out of the
//! network for a server table, back to the terminal for a closed network's
//! entry table.

use des_core::validation::{validate_probability, PROBABILITY_EPSILON};
use des_core::{ServerId, SimError, SimRng};

/// Outcome of a routing draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Server(ServerId),
    End,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingTable {
    weights: Vec<f64>,
}

impl RoutingTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the probability of routing to `destination`, replacing any
    /// previous value for it.
    ///
    /// Fails with `InvalidConfiguration` if the explicit destinations would
    /// then sum to more than 1.
    pub fn set(&mut self, destination: ServerId, probability: f64) -> Result<(), SimError> {
        validate_probability("routing probability", probability)?;
        let total = self.total() - self.probability(destination) + probability;
        if total > 1.0 + PROBABILITY_EPSILON {
            return Err(SimError::configuration(format!(
                "routing {probability} toward {destination} brings the total to {total:.6}, values exceeding 1 are not allowed"
            )));
        }
        let index = destination.index();
        if index >= self.weights.len() {
            self.weights.resize(index + 1, 0.0);
        }
        self.weights[index] = probability;
        Ok(())
    }

    pub fn probability(&self, destination: ServerId) -> f64 {
        self.weights.get(destination.index()).copied().unwrap_or(0.0)
    }

    /// Sum of the explicit destinations
    pub fn total(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Mass left for the "end" route
    pub fn end_probability(&self) -> f64 {
        (1.0 - self.total()).max(0.0)
    }

    /// Destinations with a non-zero probability, in id order
    pub fn destinations(&self) -> impl Iterator<Item = (ServerId, f64)> + '_ {
        self.weights
            .iter()
            .enumerate()
            .filter(|(_, weight)| **weight > 0.0)
            .map(|(index, weight)| (ServerId(index), *weight))
    }

    /// Cumulative-sum draw in id order. Falls through to [`Route::End`].
    pub fn draw(&self, rng: &mut SimRng) -> Route {
        match rng.pick_cumulative(self.weights.iter().copied()) {
            Some(index) => Route::Server(ServerId(index)),
            None => Route::End,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_table_always_ends() {
        let table = RoutingTable::new();
        let mut rng = SimRng::seeded(1);
        assert_eq!(table.end_probability(), 1.0);
        for _ in 0..100 {
            assert_eq!(table.draw(&mut rng), Route::End);
        }
    }

    #[test]
    fn test_mass_above_one_is_rejected() {
        let mut table = RoutingTable::new();
        table.set(ServerId(0), 0.6).unwrap();
        let err = table.set(ServerId(1), 0.5).unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(ref m) if m.contains("exceeding 1")));
        assert_eq!(table.probability(ServerId(1)), 0.0);
        assert!((table.total() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_resetting_a_destination_replaces_it() {
        let mut table = RoutingTable::new();
        table.set(ServerId(2), 0.7).unwrap();
        table.set(ServerId(2), 0.9).unwrap();
        assert_eq!(table.probability(ServerId(2)), 0.9);
        assert!((table.end_probability() - 0.1).abs() < 1e-12);
        assert_eq!(table.destinations().collect::<Vec<_>>(), vec![(ServerId(2), 0.9)]);
    }

    #[test]
    fn test_invalid_probabilities() {
        let mut table = RoutingTable::new();
        assert!(table.set(ServerId(0), -0.1).is_err());
        assert!(table.set(ServerId(0), 1.5).is_err());
        assert!(table.set(ServerId(0), f64::NAN).is_err());
    }

    #[test]
    fn test_destinations_and_end_sum_to_one() {
        let mut table = RoutingTable::new();
        for (server, p) in [(0, 0.2), (3, 0.3), (1, 0.1), (3, 0.25)] {
            table.set(ServerId(server), p).unwrap();
        }
        let explicit: f64 = table.destinations().map(|(_, p)| p).sum();
        assert!((explicit + table.end_probability() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_draw_frequencies_follow_weights() {
        let mut table = RoutingTable::new();
        table.set(ServerId(0), 0.5).unwrap();
        table.set(ServerId(1), 0.3).unwrap();
        let mut rng = SimRng::seeded(42);
        let mut counts = [0u32; 3];
        for _ in 0..20_000 {
            match table.draw(&mut rng) {
                Route::Server(server) => counts[server.index()] += 1,
                Route::End => counts[2] += 1,
            }
        }
        let share = |n: u32| f64::from(n) / 20_000.0;
        assert!((share(counts[0]) - 0.5).abs() < 0.02);
        assert!((share(counts[1]) - 0.3).abs() < 0.02);
        assert!((share(counts[2]) - 0.2).abs() < 0.02);
    }

    #[test]
    fn test_full_mass_never_ends() {
        let mut table = RoutingTable::new();
        table.set(ServerId(1), 1.0).unwrap();
        let mut rng = SimRng::seeded(3);
        for _ in 0..1000 {
            assert_eq!(table.draw(&mut rng), Route::Server(ServerId(1)));
        }
    }
}
