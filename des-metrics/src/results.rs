//! Results of one simulation run
//!
//! [`SimulationResults`] receives the observations the event loop makes
//! after warmup and routes them to the environment, server and priority
//! accumulators. [`SimulationSummary`] is the serializable snapshot of the
//! derived figures.

use crate::simulation_metrics::{EnvironmentMetrics, PriorityMetrics, ServerMetrics};
use des_core::validation::validate_server_id;
use des_core::{Job, JobId, KernelCounters, Priority, ServerId, SimError, SimTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Statistics accumulated by one run.
#[derive(Debug, Clone)]
pub struct SimulationResults {
    environment: EnvironmentMetrics,
    servers: Vec<ServerMetrics>,
    priorities: BTreeMap<Priority, PriorityMetrics>,
    jobs: BTreeMap<JobId, Job>,
    retain_jobs: bool,
    total_simulation_time: SimTime,
    time_unit: String,
    counters: KernelCounters,
}

impl SimulationResults {
    pub fn new(
        number_of_servers: usize,
        total_simulation_time: SimTime,
        time_unit: impl Into<String>,
    ) -> Result<Self, SimError> {
        Ok(Self {
            environment: EnvironmentMetrics::new(total_simulation_time)?,
            servers: (0..number_of_servers)
                .map(|id| ServerMetrics::new(ServerId(id), total_simulation_time))
                .collect(),
            priorities: BTreeMap::new(),
            jobs: BTreeMap::new(),
            retain_jobs: true,
            total_simulation_time,
            time_unit: time_unit.into(),
            counters: KernelCounters::default(),
        })
    }

    /// Keep (or drop) the final record of every job that left the network.
    #[must_use]
    pub fn with_job_retention(mut self, retain: bool) -> Self {
        self.retain_jobs = retain;
        self
    }

    /// A job enters the network at `server`.
    pub fn compute_arrival(&mut self, time: SimTime, server: ServerId) -> Result<(), SimError> {
        validate_server_id(server, self.servers.len())?;
        self.environment.compute_arrival(time)?;
        self.servers[server.0].compute_arrival(time)
    }

    /// A job leaves `origin`, either for `destination` or out of the network.
    pub fn reroute(
        &mut self,
        time: SimTime,
        origin: ServerId,
        destination: Option<ServerId>,
    ) -> Result<(), SimError> {
        validate_server_id(origin, self.servers.len())?;
        if let Some(destination) = destination {
            validate_server_id(destination, self.servers.len())?;
        }
        self.servers[origin.0].compute_departure(time)?;
        if let Some(destination) = destination {
            self.servers[destination.0].compute_arrival(time)?;
        }
        Ok(())
    }

    /// `job` leaves the network at `time`.
    pub fn compute_departure(&mut self, job: Job, time: SimTime) -> Result<(), SimError> {
        self.environment.compute_departure(&job, time)?;
        let total_simulation_time = self.total_simulation_time;
        self.priorities
            .entry(job.priority())
            .or_insert_with(|| PriorityMetrics::new(total_simulation_time))
            .compute_departure(&job, time)?;
        for server in &mut self.servers {
            server.compute_environment_departure(&job);
        }
        if self.retain_jobs {
            self.jobs.insert(job.id(), job);
        }
        Ok(())
    }

    pub fn set_kernel_counters(&mut self, counters: KernelCounters) {
        self.counters = counters;
    }

    pub fn environment_metrics(&self) -> &EnvironmentMetrics {
        &self.environment
    }

    /// Per-server metrics, indexed by server id
    pub fn server_metrics(&self) -> &[ServerMetrics] {
        &self.servers
    }

    pub fn priority_metrics(&self) -> &BTreeMap<Priority, PriorityMetrics> {
        &self.priorities
    }

    /// Final records of the jobs counted in the statistics
    pub fn jobs(&self) -> &BTreeMap<JobId, Job> {
        &self.jobs
    }

    pub fn kernel_counters(&self) -> &KernelCounters {
        &self.counters
    }

    pub fn time_unit(&self) -> &str {
        &self.time_unit
    }

    pub fn total_simulation_time(&self) -> SimTime {
        self.total_simulation_time
    }

    /// Largest demand over all servers; the bottleneck
    pub fn max_demand(&self) -> f64 {
        self.servers
            .iter()
            .map(ServerMetrics::demand)
            .fold(0.0, f64::max)
    }

    pub fn summary(&self) -> SimulationSummary {
        let env = &self.environment;
        SimulationSummary {
            time_unit: self.time_unit.clone(),
            total_simulation_time: self.total_simulation_time.as_f64(),
            environment: EnvironmentResults {
                number_of_processed_jobs: env.number_of_processed_jobs(),
                mean_time_in_system: env.mean_time_in_system(),
                mean_queue_time: env.mean_queue_time(),
                mean_number_of_jobs_in_system: env.mean_number_of_jobs_in_system(),
                throughput: env.throughput(),
                max_demand: self.max_demand(),
                time_in_system_percentiles: Percentiles {
                    p50: env.time_in_system_quantile(0.5),
                    p90: env.time_in_system_quantile(0.9),
                    p99: env.time_in_system_quantile(0.99),
                },
            },
            servers: self
                .servers
                .iter()
                .map(|s| ServerResults {
                    server: s.server().0,
                    number_of_processed_jobs: s.number_of_processed_jobs(),
                    mean_time_in_server: s.mean_time_in_server(),
                    mean_queue_time: s.mean_queue_time(),
                    mean_number_of_jobs_in_server: s.mean_number_of_jobs_in_server(),
                    mean_visits_per_job: s.mean_visits_per_job(),
                    server_utilization: s.server_utilization(),
                    throughput: s.throughput(),
                    demand: s.demand(),
                })
                .collect(),
            priorities: self
                .priorities
                .iter()
                .map(|(priority, p)| {
                    (
                        *priority,
                        PriorityResults {
                            number_of_processed_jobs: p.number_of_processed_jobs(),
                            mean_time_in_system: p.mean_time_in_system(),
                            mean_queue_time: p.mean_queue_time(),
                        },
                    )
                })
                .collect(),
        }
    }
}

/// Network-wide figures.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentResults {
    pub number_of_processed_jobs: u64,
    pub mean_time_in_system: f64,
    pub mean_queue_time: f64,
    pub mean_number_of_jobs_in_system: f64,
    pub throughput: f64,
    pub max_demand: f64,
    pub time_in_system_percentiles: Percentiles,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Percentiles {
    pub p50: f64,
    pub p90: f64,
    pub p99: f64,
}

/// Figures of one server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerResults {
    pub server: usize,
    pub number_of_processed_jobs: u64,
    pub mean_time_in_server: f64,
    pub mean_queue_time: f64,
    pub mean_number_of_jobs_in_server: f64,
    pub mean_visits_per_job: f64,
    pub server_utilization: f64,
    pub throughput: f64,
    pub demand: f64,
}

/// Figures of one priority class.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriorityResults {
    pub number_of_processed_jobs: u64,
    pub mean_time_in_system: f64,
    pub mean_queue_time: f64,
}

/// Serializable snapshot of a run's derived statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSummary {
    pub time_unit: String,
    pub total_simulation_time: f64,
    pub environment: EnvironmentResults,
    pub servers: Vec<ServerResults>,
    pub priorities: BTreeMap<Priority, PriorityResults>,
}

const RULE: &str = "====================";

impl fmt::Display for SimulationResults {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary();
        let unit = &summary.time_unit;
        let env = &summary.environment;

        writeln!(f, "{RULE} Environment Metrics {RULE}")?;
        writeln!(f, "Total number of processed jobs: {}", env.number_of_processed_jobs)?;
        writeln!(f, "E[T]: {:.4} {unit} per job", env.mean_time_in_system)?;
        writeln!(f, "E[Tq]: {:.4} {unit} per job", env.mean_queue_time)?;
        writeln!(f, "E[N]: {:.4} jobs", env.mean_number_of_jobs_in_system)?;
        writeln!(f, "X: {:.4} jobs per {unit}", env.throughput)?;
        writeln!(f, "Dmax: {:.4} {unit} per job", env.max_demand)?;
        let p = &env.time_in_system_percentiles;
        writeln!(f, "T p50/p90/p99: {:.4} / {:.4} / {:.4} {unit}", p.p50, p.p90, p.p99)?;

        for server in &summary.servers {
            writeln!(f)?;
            writeln!(f, "{RULE} Server {} Metrics {RULE}", server.server + 1)?;
            writeln!(f, "Total number of processed jobs: {}", server.number_of_processed_jobs)?;
            writeln!(f, "E[T]: {:.4} {unit} per job", server.mean_time_in_server)?;
            writeln!(f, "E[Tq]: {:.4} {unit} per job", server.mean_queue_time)?;
            writeln!(f, "E[N]: {:.4} jobs", server.mean_number_of_jobs_in_server)?;
            writeln!(f, "E[V]: {:.4} visits per job", server.mean_visits_per_job)?;
            writeln!(f, "Utilization: {:.2}%", server.server_utilization * 100.0)?;
            writeln!(f, "X: {:.4} jobs per {unit}", server.throughput)?;
            writeln!(f, "D: {:.4} {unit} per job", server.demand)?;
        }

        if summary.priorities.len() > 1 {
            for (priority, results) in &summary.priorities {
                writeln!(f)?;
                writeln!(f, "{RULE} Priority {priority} Metrics {RULE}")?;
                writeln!(f, "Total number of processed jobs: {}", results.number_of_processed_jobs)?;
                writeln!(f, "E[T]: {:.4} {unit} per job", results.mean_time_in_system)?;
                writeln!(f, "E[Tq]: {:.4} {unit} per job", results.mean_queue_time)?;
            }
        }
        Ok(())
    }
}
