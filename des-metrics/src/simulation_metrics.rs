//! Online statistics accumulators
//!
//! Every scope (the whole network, each server, each priority class) keeps a
//! [`GeneralMetrics`] core: processed-job count, cumulative queue time, and a
//! time-weighted population integral. The specialized accumulators add what
//! their scope needs. All rates are relative to the configured simulation
//! time, which excludes warmup.

use des_core::time::TICKS_PER_UNIT;
use des_core::{Job, ServerId, SimError, SimTime};
use hdrhistogram::Histogram;

/// Running integral of population over time.
///
/// Before each population change at time `t`, `population × (t − watermark)`
/// is added to the sum and the watermark moves to `t`. The sum is kept in
/// job·ticks as an integer, so it is exact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PopulationIntegral {
    population: u64,
    watermark: SimTime,
    weighted_ticks: u128,
}

impl PopulationIntegral {
    pub fn new() -> Self {
        Self::default()
    }

    /// One job enters the scope at `time`.
    pub fn arrive(&mut self, time: SimTime) -> Result<(), SimError> {
        self.advance(time)?;
        self.population += 1;
        Ok(())
    }

    /// One job leaves the scope at `time`.
    pub fn depart(&mut self, time: SimTime) -> Result<(), SimError> {
        if self.population == 0 {
            return Err(SimError::argument(format!(
                "departure at {time} from a scope with no jobs"
            )));
        }
        self.advance(time)?;
        self.population -= 1;
        Ok(())
    }

    fn advance(&mut self, time: SimTime) -> Result<(), SimError> {
        let elapsed = time.checked_since(self.watermark).ok_or_else(|| {
            SimError::argument(format!(
                "provided time {time} is earlier than the registered time {}",
                self.watermark
            ))
        })?;
        self.weighted_ticks += u128::from(self.population) * u128::from(elapsed.as_ticks());
        self.watermark = time;
        Ok(())
    }

    pub fn population(&self) -> u64 {
        self.population
    }

    pub fn watermark(&self) -> SimTime {
        self.watermark
    }

    /// Integral of population over time, in job·time-units
    pub fn weighted_sum(&self) -> f64 {
        self.weighted_ticks as f64 / TICKS_PER_UNIT as f64
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

/// Shared core of every accumulator.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralMetrics {
    total_simulation_time: SimTime,
    processed_jobs: u64,
    population: PopulationIntegral,
    cumulative_queue_time: SimTime,
}

impl GeneralMetrics {
    pub fn new(total_simulation_time: SimTime) -> Self {
        Self {
            total_simulation_time,
            processed_jobs: 0,
            population: PopulationIntegral::new(),
            cumulative_queue_time: SimTime::zero(),
        }
    }

    /// A job enters this scope at `time`.
    pub fn compute_arrival(&mut self, time: SimTime) -> Result<(), SimError> {
        self.population.arrive(time)
    }

    pub fn number_of_processed_jobs(&self) -> u64 {
        self.processed_jobs
    }

    /// Cumulative queue time per processed job
    pub fn mean_queue_time(&self) -> f64 {
        ratio(self.cumulative_queue_time.as_f64(), self.processed_jobs as f64)
    }

    pub fn mean_number_of_jobs(&self) -> f64 {
        ratio(self.population.weighted_sum(), self.total_simulation_time.as_f64())
    }

    pub fn throughput(&self) -> f64 {
        ratio(self.processed_jobs as f64, self.total_simulation_time.as_f64())
    }

    pub fn population(&self) -> &PopulationIntegral {
        &self.population
    }

    pub fn total_simulation_time(&self) -> SimTime {
        self.total_simulation_time
    }

    fn per_time(&self, value: f64) -> f64 {
        ratio(value, self.total_simulation_time.as_f64())
    }
}

/// Network-wide statistics.
#[derive(Debug, Clone)]
pub struct EnvironmentMetrics {
    general: GeneralMetrics,
    cumulative_time_in_system: SimTime,
    time_in_system: Histogram<u64>,
}

impl EnvironmentMetrics {
    pub fn new(total_simulation_time: SimTime) -> Result<Self, SimError> {
        let time_in_system = Histogram::<u64>::new(3).map_err(|e| {
            SimError::configuration(format!("cannot create time-in-system histogram: {e}"))
        })?;
        Ok(Self {
            general: GeneralMetrics::new(total_simulation_time),
            cumulative_time_in_system: SimTime::zero(),
            time_in_system,
        })
    }

    pub fn compute_arrival(&mut self, time: SimTime) -> Result<(), SimError> {
        self.general.compute_arrival(time)
    }

    /// `job` leaves the network at `time`.
    pub fn compute_departure(&mut self, job: &Job, time: SimTime) -> Result<(), SimError> {
        let in_system = time.checked_since(job.arrival_time()).ok_or_else(|| {
            SimError::argument(format!(
                "{} cannot leave at {time} before entering at {}",
                job.id(),
                job.arrival_time()
            ))
        })?;
        self.general.population.depart(time)?;
        self.general.processed_jobs += 1;
        self.general.cumulative_queue_time += job.total_queue_time();
        self.cumulative_time_in_system += in_system;
        self.time_in_system
            .record(in_system.as_ticks())
            .map_err(|e| SimError::argument(format!("cannot record time in system: {e}")))?;
        Ok(())
    }

    pub fn general(&self) -> &GeneralMetrics {
        &self.general
    }

    pub fn number_of_processed_jobs(&self) -> u64 {
        self.general.number_of_processed_jobs()
    }

    pub fn mean_time_in_system(&self) -> f64 {
        ratio(
            self.cumulative_time_in_system.as_f64(),
            self.general.processed_jobs as f64,
        )
    }

    pub fn mean_queue_time(&self) -> f64 {
        self.general.mean_queue_time()
    }

    pub fn mean_number_of_jobs_in_system(&self) -> f64 {
        self.general.mean_number_of_jobs()
    }

    pub fn throughput(&self) -> f64 {
        self.general.throughput()
    }

    /// Time in system at `quantile` (0.0 to 1.0), or 0 when no job finished.
    pub fn time_in_system_quantile(&self, quantile: f64) -> f64 {
        if self.time_in_system.is_empty() {
            return 0.0;
        }
        SimTime::from_ticks(self.time_in_system.value_at_quantile(quantile)).as_f64()
    }
}

/// Statistics of one server.
///
/// Population is tracked per visit. Everything else is credited when a job
/// leaves the network, from the job's own accounting at this server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerMetrics {
    server: ServerId,
    general: GeneralMetrics,
    cumulative_time_in_server: SimTime,
    cumulative_busy_time: SimTime,
    cumulative_visits: u64,
}

impl ServerMetrics {
    pub fn new(server: ServerId, total_simulation_time: SimTime) -> Self {
        Self {
            server,
            general: GeneralMetrics::new(total_simulation_time),
            cumulative_time_in_server: SimTime::zero(),
            cumulative_busy_time: SimTime::zero(),
            cumulative_visits: 0,
        }
    }

    pub fn server(&self) -> ServerId {
        self.server
    }

    pub fn compute_arrival(&mut self, time: SimTime) -> Result<(), SimError> {
        self.general.compute_arrival(time)
    }

    /// A job leaves this server at `time`, to another server or out of the network.
    pub fn compute_departure(&mut self, time: SimTime) -> Result<(), SimError> {
        self.general.population.depart(time)
    }

    /// Credit this server with what `job` did here over its lifetime.
    pub fn compute_environment_departure(&mut self, job: &Job) {
        self.general.processed_jobs += 1;
        if let Some(visits) = job.visits_at(self.server) {
            self.general.cumulative_queue_time += visits.queue_time;
            self.cumulative_time_in_server += visits.total_time;
            self.cumulative_busy_time += visits.service_time();
            self.cumulative_visits += u64::from(visits.visits);
        }
    }

    pub fn general(&self) -> &GeneralMetrics {
        &self.general
    }

    /// Visits completed at this server by jobs that left the network
    pub fn number_of_processed_jobs(&self) -> u64 {
        self.cumulative_visits
    }

    pub fn mean_time_in_server(&self) -> f64 {
        ratio(
            self.cumulative_time_in_server.as_f64(),
            self.cumulative_visits as f64,
        )
    }

    pub fn mean_queue_time(&self) -> f64 {
        self.general.mean_queue_time()
    }

    pub fn mean_number_of_jobs_in_server(&self) -> f64 {
        self.general.mean_number_of_jobs()
    }

    pub fn mean_visits_per_job(&self) -> f64 {
        ratio(self.cumulative_visits as f64, self.general.processed_jobs as f64)
    }

    pub fn server_utilization(&self) -> f64 {
        self.general.per_time(self.cumulative_busy_time.as_f64())
    }

    pub fn throughput(&self) -> f64 {
        self.general.per_time(self.cumulative_visits as f64)
    }

    /// Time in server amortized over every job that left the network
    pub fn demand(&self) -> f64 {
        ratio(
            self.cumulative_time_in_server.as_f64(),
            self.general.processed_jobs as f64,
        )
    }
}

/// Statistics of one priority class. Only departures are observed.
#[derive(Debug, Clone, PartialEq)]
pub struct PriorityMetrics {
    general: GeneralMetrics,
    cumulative_time_in_system: SimTime,
}

impl PriorityMetrics {
    pub fn new(total_simulation_time: SimTime) -> Self {
        Self {
            general: GeneralMetrics::new(total_simulation_time),
            cumulative_time_in_system: SimTime::zero(),
        }
    }

    pub fn compute_departure(&mut self, job: &Job, time: SimTime) -> Result<(), SimError> {
        let in_system = time.checked_since(job.arrival_time()).ok_or_else(|| {
            SimError::argument(format!(
                "{} cannot leave at {time} before entering at {}",
                job.id(),
                job.arrival_time()
            ))
        })?;
        self.general.processed_jobs += 1;
        self.general.cumulative_queue_time += job.total_queue_time();
        self.cumulative_time_in_system += in_system;
        Ok(())
    }

    pub fn number_of_processed_jobs(&self) -> u64 {
        self.general.number_of_processed_jobs()
    }

    pub fn mean_time_in_system(&self) -> f64 {
        ratio(
            self.cumulative_time_in_system.as_f64(),
            self.general.processed_jobs as f64,
        )
    }

    pub fn mean_queue_time(&self) -> f64 {
        self.general.mean_queue_time()
    }
}
