//! Public entry point for building and simulating a network
//!
//! # Example
//!
//! ```
//! use des_components::{Environment, EnvironmentOptions};
//! use des_core::Distribution;
//!
//! let mut env = Environment::new(None, None)
//!     .unwrap()
//!     .with_options(EnvironmentOptions {
//!         seed: Some(7),
//!         ..EnvironmentOptions::default()
//!     })
//!     .unwrap();
//! let cpu = env.add_server(Distribution::exponential(2.0).unwrap(), None).unwrap();
//! env.add_entry_point(cpu, Distribution::exponential(1.0).unwrap(), None).unwrap();
//!
//! let results = env.simulate(1_000.0, 100.0).unwrap();
//! let utilization = results.server_metrics()[0].server_utilization();
//! assert!(utilization > 0.3 && utilization < 0.7);
//! ```

use crate::execution::Execution;
use crate::network::Network;
use crate::priority::PriorityDistribution;
use crate::queue::Discipline;
use des_core::logging::{diagnostics, simulation_span};
use des_core::validation::validate_time;
use des_core::{Distribution, ServerId, SimError, SimRng};
use des_metrics::SimulationResults;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Settings that apply to the whole environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentOptions {
    /// Jobs carry priorities and servers default to the priority discipline
    pub with_priority: bool,
    /// The default priority discipline preempts
    pub priority_with_preemption: bool,
    /// Label used in reports
    pub time_unit: String,
    /// Fixed seed for reproducible runs; fresh entropy for every run otherwise
    pub seed: Option<u64>,
    /// Keep the final record of every job counted in the statistics
    pub retain_jobs: bool,
}

impl Default for EnvironmentOptions {
    fn default() -> Self {
        Self {
            with_priority: false,
            priority_with_preemption: false,
            time_unit: "seconds".to_string(),
            seed: None,
            retain_jobs: true,
        }
    }
}

/// A queueing network under construction, ready to be simulated any
/// number of times.
#[derive(Debug, Clone)]
pub struct Environment {
    network: Network,
    options: EnvironmentOptions,
}

/// Same as [`Environment::new`].
pub fn new_environment(
    terminals: Option<usize>,
    think_time: Option<Distribution>,
) -> Result<Environment, SimError> {
    Environment::new(terminals, think_time)
}

impl Environment {
    /// Open network without arguments, closed network with both.
    pub fn new(terminals: Option<usize>, think_time: Option<Distribution>) -> Result<Self, SimError> {
        let network = match (terminals, think_time) {
            (None, None) => Network::open(),
            (Some(terminals), Some(think_time)) => {
                think_time.validate()?;
                Network::closed(terminals, think_time)
            }
            _ => {
                return Err(SimError::configuration(
                    "a closed network needs both a number of terminals and a think time distribution",
                ))
            }
        };
        Ok(Self {
            network,
            options: EnvironmentOptions::default(),
        })
    }

    pub fn with_options(mut self, options: EnvironmentOptions) -> Result<Self, SimError> {
        if options.priority_with_preemption && !options.with_priority {
            return Err(SimError::configuration(
                "priority_with_preemption requires with_priority",
            ));
        }
        self.options = options;
        Ok(self)
    }

    pub fn options(&self) -> &EnvironmentOptions {
        &self.options
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn is_closed(&self) -> bool {
        self.network.is_closed()
    }

    /// Adds a server and returns its id.
    ///
    /// Without a discipline the server uses the priority discipline when the
    /// environment has priorities, FCFS otherwise.
    pub fn add_server(
        &mut self,
        service: Distribution,
        discipline: Option<Discipline>,
    ) -> Result<ServerId, SimError> {
        let discipline = discipline.unwrap_or(if self.options.with_priority {
            Discipline::Priority {
                preemptive: self.options.priority_with_preemption,
            }
        } else {
            Discipline::Fcfs
        });
        let preempts_on_its_own = matches!(
            discipline,
            Discipline::Srt { preemptive: true } | Discipline::RoundRobin { .. }
        );
        if self.options.priority_with_preemption && preempts_on_its_own {
            return Err(SimError::configuration(format!(
                "{} preempts on its own and cannot be combined with priority preemption",
                discipline.name()
            )));
        }
        self.network.add_server(service, discipline)
    }

    /// Adds an arrival stream to `server`. Open networks only.
    ///
    /// Priorities are ignored unless the environment was created with
    /// `with_priority`.
    pub fn add_entry_point(
        &mut self,
        server: ServerId,
        interarrival: Distribution,
        priorities: Option<PriorityDistribution>,
    ) -> Result<(), SimError> {
        let priorities = if self.options.with_priority {
            priorities
        } else {
            if priorities.is_some() {
                diagnostics::ignored_priorities(server);
            }
            None
        };
        self.network.add_entry_point(server, interarrival, priorities)
    }

    pub fn add_servers_connection(
        &mut self,
        origin: ServerId,
        destination: ServerId,
        probability: f64,
    ) -> Result<(), SimError> {
        self.network.add_servers_connection(origin, destination, probability)
    }

    /// Closed networks only.
    pub fn add_terminals_routing_probability(
        &mut self,
        destination: ServerId,
        probability: f64,
    ) -> Result<(), SimError> {
        self.network.add_terminals_routing_probability(destination, probability)
    }

    /// Priorities of the jobs leaving the terminals. Closed networks with
    /// `with_priority` only.
    pub fn add_priority_closed_network(&mut self, priorities: PriorityDistribution) -> Result<(), SimError> {
        if !self.options.with_priority {
            return Err(SimError::configuration(
                "priorities need an environment created with with_priority",
            ));
        }
        self.network.set_closed_priorities(priorities)
    }

    /// Simulates `warmup + horizon` time units and returns the statistics
    /// of the last `horizon`.
    ///
    /// Each call works on a fresh copy of the network, so repeated calls are
    /// independent runs.
    pub fn simulate(&self, horizon: f64, warmup: f64) -> Result<SimulationResults, SimError> {
        let horizon_time = validate_time("horizon", horizon)?;
        let warmup_time = validate_time("warmup", warmup)?;
        let span = simulation_span("queueing-network", horizon_time, warmup_time);
        let _guard = span.enter();

        let execution = self.execution(horizon, warmup)?;
        let results = execution.execute()?;
        info!(
            processed = results.environment_metrics().number_of_processed_jobs(),
            throughput = results.environment_metrics().throughput(),
            "Simulation finished"
        );
        Ok(results)
    }

    /// A prepared run with its initial arrivals already scheduled, for
    /// callers that want to drive the event loop themselves.
    pub fn execution(&self, horizon: f64, warmup: f64) -> Result<Execution, SimError> {
        let horizon = validate_time("horizon", horizon)?;
        let warmup = validate_time("warmup", warmup)?;
        let rng = self
            .options
            .seed
            .map_or_else(SimRng::from_entropy, SimRng::seeded);
        let mut execution = Execution::new(
            self.network.clone(),
            warmup,
            horizon,
            &self.options.time_unit,
            rng,
        )?
        .with_job_retention(self.options.retain_jobs);
        execution.generate_jobs()?;
        Ok(execution)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> Distribution {
        Distribution::constant(value).unwrap()
    }

    fn with_priorities(preemptive: bool) -> EnvironmentOptions {
        EnvironmentOptions {
            with_priority: true,
            priority_with_preemption: preemptive,
            seed: Some(1),
            ..EnvironmentOptions::default()
        }
    }

    #[test]
    fn test_partial_closed_specification_is_rejected() {
        assert!(matches!(
            Environment::new(Some(3), None),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert!(Environment::new(None, Some(constant(1.0))).is_err());
        assert!(new_environment(Some(3), Some(constant(1.0))).unwrap().is_closed());
        assert!(!new_environment(None, None).unwrap().is_closed());
    }

    #[test]
    fn test_preemption_requires_priorities() {
        let options = EnvironmentOptions {
            priority_with_preemption: true,
            ..EnvironmentOptions::default()
        };
        assert!(Environment::new(None, None).unwrap().with_options(options).is_err());
    }

    #[test]
    fn test_default_discipline_follows_options() {
        let mut plain = Environment::new(None, None).unwrap();
        let id = plain.add_server(constant(1.0), None).unwrap();
        assert_eq!(plain.network().servers()[id.index()].discipline(), Discipline::Fcfs);

        let mut prioritized = Environment::new(None, None)
            .unwrap()
            .with_options(with_priorities(true))
            .unwrap();
        let id = prioritized.add_server(constant(1.0), None).unwrap();
        assert_eq!(
            prioritized.network().servers()[id.index()].discipline(),
            Discipline::Priority { preemptive: true }
        );
    }

    #[test]
    fn test_double_preemption_is_rejected() {
        let mut env = Environment::new(None, None)
            .unwrap()
            .with_options(with_priorities(true))
            .unwrap();
        assert!(env
            .add_server(constant(1.0), Some(Discipline::Srt { preemptive: true }))
            .is_err());
        assert!(env.add_server(constant(1.0), Some(Discipline::RoundRobin { quantum: 1.0 })).is_err());
        assert!(env
            .add_server(constant(1.0), Some(Discipline::Srt { preemptive: false }))
            .is_ok());
    }

    #[test]
    fn test_entry_point_validation() {
        let mut env = Environment::new(None, None).unwrap();
        let server = env.add_server(constant(1.0), None).unwrap();
        assert!(env.add_entry_point(ServerId(1), constant(1.0), None).is_err());
        assert!(env.add_entry_point(server, constant(0.0), None).is_err());
        assert!(env.add_entry_point(server, constant(0.00001), None).is_err());
        assert!(env.add_entry_point(server, constant(2.0), None).is_ok());

        let mut closed = Environment::new(Some(2), Some(constant(1.0))).unwrap();
        let server = closed.add_server(constant(1.0), None).unwrap();
        assert!(closed.add_entry_point(server, constant(2.0), None).is_err());
    }

    #[test]
    fn test_priorities_ignored_without_flag() {
        let mut env = Environment::new(None, None)
            .unwrap()
            .with_options(EnvironmentOptions {
                seed: Some(3),
                ..EnvironmentOptions::default()
            })
            .unwrap();
        let server = env.add_server(constant(0.5), None).unwrap();
        env.add_entry_point(server, constant(1.0), Some(PriorityDistribution::single(4)))
            .unwrap();
        let results = env.simulate(20.0, 0.0).unwrap();
        assert_eq!(results.priority_metrics().keys().copied().collect::<Vec<_>>(), vec![0]);
    }

    #[test]
    fn test_closed_priorities_need_flag() {
        let mut env = Environment::new(Some(2), Some(constant(1.0))).unwrap();
        assert!(env.add_priority_closed_network(PriorityDistribution::single(1)).is_err());

        let mut env = Environment::new(Some(2), Some(constant(1.0)))
            .unwrap()
            .with_options(with_priorities(false))
            .unwrap();
        assert!(env.add_priority_closed_network(PriorityDistribution::single(1)).is_ok());
    }

    #[test]
    fn test_negative_times_are_rejected() {
        let env = Environment::new(None, None).unwrap();
        assert!(matches!(env.simulate(-1.0, 0.0), Err(SimError::InvalidArgument(_))));
        assert!(matches!(env.simulate(10.0, -0.5), Err(SimError::InvalidArgument(_))));
        assert!(env.simulate(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_invalid_distribution_is_rejected() {
        let mut env = Environment::new(None, None).unwrap();
        let bad = Distribution::Uniform { low: 2.0, high: 1.0 };
        assert!(matches!(
            env.add_server(bad, None),
            Err(SimError::OutOfRangeDistributionParameter { .. })
        ));
    }

    #[test]
    fn test_options_from_json() {
        let options: EnvironmentOptions =
            serde_json::from_str(r#"{"with_priority": true, "seed": 9}"#).unwrap();
        assert!(options.with_priority);
        assert_eq!(options.seed, Some(9));
        assert_eq!(options.time_unit, "seconds");
        assert!(options.retain_jobs);
    }
}
