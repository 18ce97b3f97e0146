//! The event loop
//!
//! [`Execution`] owns everything one run touches: a private copy of the
//! network, the scheduler, the live jobs, the random source and the results.
//! Each step pops one event and hands it to the server it targets.
//!
//! Only exogenous and terminal arrivals go through the heap as arrival
//! events. A job routed from one server to another is handed over at the
//! departure instant.

use crate::network::Network;
use crate::routing::Route;
use crate::server::{Admission, Dispatch};
use des_core::logging::{diagnostics, event_span, events, server_span};
use des_core::{
    Event, EventHandle, EventKind, Execute, Executor, Job, JobId, KernelCounters, Scheduler,
    ServerId, SimError, SimRng, SimTime, Step,
};
use des_metrics::SimulationResults;
use std::collections::HashMap;

/// One simulation run.
#[derive(Debug)]
pub struct Execution {
    network: Network,
    scheduler: Scheduler,
    jobs: HashMap<JobId, Job>,
    /// Departure or preemption in flight, per server
    pending: Vec<Option<EventHandle>>,
    results: SimulationResults,
    rng: SimRng,
    warmup: SimTime,
    end: SimTime,
    counters: KernelCounters,
}

impl Execution {
    /// Prepares a run over `network` that ignores everything up to `warmup`
    /// and then observes `horizon` time units.
    pub fn new(
        network: Network,
        warmup: SimTime,
        horizon: SimTime,
        time_unit: &str,
        rng: SimRng,
    ) -> Result<Self, SimError> {
        let servers = network.number_of_servers();
        Ok(Self {
            results: SimulationResults::new(servers, horizon, time_unit)?,
            pending: vec![None; servers],
            network,
            scheduler: Scheduler::new(),
            jobs: HashMap::new(),
            rng,
            warmup,
            end: warmup + horizon,
            counters: KernelCounters::new(),
        })
    }

    #[must_use]
    pub fn with_job_retention(mut self, retain: bool) -> Self {
        self.results = self.results.with_job_retention(retain);
        self
    }

    /// Seeds the heap with the network's initial arrivals.
    pub fn generate_jobs(&mut self) -> Result<(), SimError> {
        self.network
            .generate_jobs(self.end, &mut self.scheduler, &mut self.jobs, &mut self.rng)?;
        events::simulation_started(
            "queueing-network",
            self.network.number_of_servers(),
            self.scheduler.len(),
            self.end,
        );
        Ok(())
    }

    /// Injects an arrival of `job` at its own arrival time and server.
    pub fn schedule_arrival(&mut self, job: Job) -> Result<EventHandle, SimError> {
        if self.jobs.contains_key(&job.id()) {
            return Err(SimError::argument(format!("{} is already in the simulation", job.id())));
        }
        self.network.server(job.current_server())?;
        let handle = self.scheduler.schedule(
            job.arrival_time(),
            EventKind::Arrival,
            job.id(),
            job.current_server(),
        )?;
        self.jobs.insert(job.id(), job);
        Ok(handle)
    }

    /// Runs every event up to `warmup + horizon` and returns the statistics.
    pub fn execute(mut self) -> Result<SimulationResults, SimError> {
        Executor::timed(self.end).execute(&mut self)?;
        Ok(self.into_results())
    }

    /// Statistics gathered so far, with the kernel counters attached.
    pub fn into_results(mut self) -> SimulationResults {
        events::simulation_completed(
            "queueing-network",
            self.scheduler.time(),
            self.counters.events_processed(),
            self.counters.jobs_completed,
        );
        self.results.set_kernel_counters(self.counters);
        self.results
    }

    pub fn current_time(&self) -> SimTime {
        self.scheduler.time()
    }

    pub fn end_time(&self) -> SimTime {
        self.end
    }

    /// Jobs created and not yet out of the network, thinking included
    pub fn jobs_in_flight(&self) -> usize {
        self.jobs.len()
    }

    pub fn job(&self, id: JobId) -> Option<&Job> {
        self.jobs.get(&id)
    }

    /// Live jobs in no particular order
    pub fn jobs(&self) -> impl Iterator<Item = &Job> + '_ {
        self.jobs.values()
    }

    pub fn network(&self) -> &Network {
        &self.network
    }

    pub fn results(&self) -> &SimulationResults {
        &self.results
    }

    pub fn counters(&self) -> &KernelCounters {
        &self.counters
    }

    fn on_arrival(&mut self, event: &Event) -> Result<(), SimError> {
        let time = event.time();
        let server_id = event.server();
        let job = self
            .jobs
            .get(&event.job())
            .ok_or_else(|| SimError::argument(format!("arrival of unknown {}", event.job())))?;
        let counted = job.arrival_time() > self.warmup;

        let admission = self
            .network
            .server_mut(server_id)?
            .job_arrival(job, time, &mut self.rng)?;
        if counted {
            self.results.compute_arrival(time, server_id)?;
        }
        self.apply_admission(server_id, admission, time)
    }

    fn on_service_end(&mut self, event: &Event) -> Result<(), SimError> {
        let time = event.time();
        let server_id = event.server();
        let _span = server_span(server_id).entered();
        self.pending[server_id.index()] = None;

        let completion = self
            .network
            .server_mut(server_id)?
            .finish_execution(time, event.kind() == EventKind::Preemption)?;
        if completion.released != event.job() {
            return Err(SimError::argument(format!(
                "{} ended service at {server_id} but {} held the slot",
                event.job(),
                completion.released
            )));
        }

        if !completion.departed {
            self.job_mut(completion.released)?.suspend(time)?;
        }
        if let Some(next) = completion.next {
            self.start(server_id, next, time)?;
        }
        if completion.departed {
            self.route(server_id, completion.released, time)?;
        }
        Ok(())
    }

    fn apply_admission(&mut self, server_id: ServerId, admission: Admission, time: SimTime) -> Result<(), SimError> {
        match admission {
            Admission::Queued => Ok(()),
            Admission::Started(dispatch) => self.start(server_id, dispatch, time),
            Admission::Preempted {
                dispatch,
                displaced,
                remaining,
            } => {
                self.job_mut(displaced)?.suspend(time)?;
                self.counters.record_preemption(server_id);
                events::job_preempted(server_id, displaced, dispatch.job, remaining.as_f64(), time);
                self.start(server_id, dispatch, time)
            }
        }
    }

    /// Puts `dispatch` in service and schedules the end of its slice,
    /// replacing whatever the server had pending.
    fn start(&mut self, server_id: ServerId, dispatch: Dispatch, time: SimTime) -> Result<(), SimError> {
        if let Some(stale) = self.pending[server_id.index()].take() {
            self.scheduler.cancel(stale);
        }
        self.job_mut(dispatch.job)?.serve(time)?;
        let handle = self
            .scheduler
            .schedule(time + dispatch.slice, dispatch.kind, dispatch.job, server_id)?;
        self.pending[server_id.index()] = Some(handle);
        Ok(())
    }

    fn route(&mut self, origin: ServerId, job_id: JobId, time: SimTime) -> Result<(), SimError> {
        let route = self.network.server(origin)?.route_job(&mut self.rng);
        match route {
            Route::Server(destination) => {
                let job = self
                    .jobs
                    .get_mut(&job_id)
                    .ok_or_else(|| SimError::argument(format!("cannot route unknown {job_id}")))?;
                job.reroute(time, Some(destination))?;
                events::job_routed(job_id, origin, Some(destination), time);
                if job.arrival_time() > self.warmup {
                    self.results.reroute(time, origin, Some(destination))?;
                }
                let admission = self
                    .network
                    .server_mut(destination)?
                    .job_arrival(job, time, &mut self.rng)?;
                self.apply_admission(destination, admission, time)
            }
            Route::End => {
                let mut job = self
                    .jobs
                    .remove(&job_id)
                    .ok_or_else(|| SimError::argument(format!("cannot route unknown {job_id}")))?;
                job.reroute(time, None)?;
                events::job_routed(job_id, origin, None, time);
                if job.arrival_time() > self.warmup {
                    self.results.reroute(time, origin, None)?;
                    self.results.compute_departure(job, time)?;
                }
                self.counters.record_completion();
                self.network
                    .finish_job(time, &mut self.scheduler, &mut self.jobs, &mut self.rng)
            }
        }
    }

    fn job_mut(&mut self, id: JobId) -> Result<&mut Job, SimError> {
        self.jobs
            .get_mut(&id)
            .ok_or_else(|| SimError::argument(format!("unknown {id}")))
    }
}

impl Step for Execution {
    fn next_event_time(&self) -> Option<SimTime> {
        self.scheduler.peek_time()
    }

    fn step(&mut self) -> Result<bool, SimError> {
        let Some(event) = self.scheduler.pop() else {
            return Ok(false);
        };
        if event.is_cancelled() {
            diagnostics::stale_event_discarded(event.id(), event.kind().as_str(), event.time());
            self.counters.record_stale_event();
            return Ok(true);
        }

        self.counters.record_event(event.kind());
        let _span = event_span(event.id(), event.kind().as_str(), event.time()).entered();
        events::event_processing_started(event.id(), event.kind().as_str(), event.time(), event.job());
        match event.kind() {
            EventKind::Arrival => self.on_arrival(&event)?,
            EventKind::Departure | EventKind::Preemption => self.on_service_end(&event)?,
        }
        Ok(true)
    }
}
