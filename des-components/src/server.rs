//! Servers and their service slot
//!
//! A [`Server`] pairs a service-time distribution and a routing table with a
//! [`ServerExecution`], the idle/serving state machine that decides whether
//! an arriving job starts, preempts the job in service, or waits.
//!
//! The server never schedules anything itself. Every state change that needs
//! an event returns a [`Dispatch`], and the event loop turns it into a
//! departure or preemption on the heap.

use crate::queue::{Discipline, QueuedJob, WaitingLine};
use crate::routing::{Route, RoutingTable};
use des_core::logging::diagnostics;
use des_core::{Distribution, EventKind, Job, JobId, ServerId, SimError, SimRng, SimTime};

/// Samples `distribution` as a duration from now.
///
/// Negative samples (possible with a normal distribution) count as zero.
pub(crate) fn sample_duration(distribution: &Distribution, rng: &mut SimRng, context: &str) -> SimTime {
    let sample = distribution.sample(rng);
    if sample < 0.0 {
        diagnostics::negative_sample_clamped(distribution.name(), sample, context);
    }
    SimTime::zero().offset(sample)
}

/// Service to schedule for the job that just took the slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dispatch {
    pub job: JobId,
    /// [`EventKind::Departure`] if the job finishes within this slice,
    /// [`EventKind::Preemption`] if a round-robin quantum cuts it short
    pub kind: EventKind,
    /// Length of the slice, from the moment service starts
    pub slice: SimTime,
}

/// What happened to an arriving job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// The server was idle and the job is now in service
    Started(Dispatch),
    /// The job took the slot from `displaced`, which is waiting again with
    /// `remaining` work left
    Preempted {
        dispatch: Dispatch,
        displaced: JobId,
        remaining: SimTime,
    },
    /// The job joined the waiting line
    Queued,
}

/// Result of ending a service slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Completion {
    /// The job that held the slot
    pub released: JobId,
    /// True if the job finished its work, false if it was sent back to wait
    pub departed: bool,
    /// Service to schedule next, if anyone is in line
    pub next: Option<Dispatch>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InService {
    /// Remaining work as of `started`
    entry: QueuedJob,
    started: SimTime,
}

/// Idle/serving state of one server.
#[derive(Debug, Clone)]
pub struct ServerExecution {
    waiting: WaitingLine,
    in_service: Option<InService>,
}

impl ServerExecution {
    pub fn new(discipline: Discipline) -> Self {
        Self {
            waiting: WaitingLine::new(discipline),
            in_service: None,
        }
    }

    pub fn discipline(&self) -> Discipline {
        self.waiting.discipline()
    }

    /// Offers `entry` to the server at `time`.
    pub fn admit(&mut self, entry: QueuedJob, time: SimTime) -> Result<Admission, SimError> {
        let Some(current) = self.in_service else {
            return Ok(Admission::Started(self.occupy(entry, time)));
        };

        if !self.should_preempt(&current, &entry, time)? {
            self.waiting.insert(entry);
            return Ok(Admission::Queued);
        }

        let remaining = remaining_of(&current, time)?;
        self.waiting.insert(QueuedJob {
            remaining,
            ..current.entry
        });
        Ok(Admission::Preempted {
            dispatch: self.occupy(entry, time),
            displaced: current.entry.job,
            remaining,
        })
    }

    /// Ends the current service slice at `time`.
    ///
    /// For a preemption the job goes back in line with its remaining work;
    /// if nobody else is waiting it resumes at once.
    pub fn finish_execution(&mut self, time: SimTime, is_preemption: bool) -> Result<Completion, SimError> {
        let current = self
            .in_service
            .take()
            .ok_or_else(|| SimError::argument(format!("no job in service to finish at {time}")))?;

        if is_preemption {
            let remaining = remaining_of(&current, time)?;
            self.waiting.insert(QueuedJob {
                remaining,
                ..current.entry
            });
        }

        let next = self.waiting.pop().map(|entry| self.occupy(entry, time));
        Ok(Completion {
            released: current.entry.job,
            departed: !is_preemption,
            next,
        })
    }

    /// Work left for the job in service at `time`
    pub fn remaining_time(&self, time: SimTime) -> Result<SimTime, SimError> {
        let current = self
            .in_service
            .as_ref()
            .ok_or_else(|| SimError::argument("no job in service"))?;
        remaining_of(current, time)
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.in_service.map(|current| current.entry.job)
    }

    pub fn is_busy(&self) -> bool {
        self.in_service.is_some()
    }

    pub fn queue_len(&self) -> usize {
        self.waiting.len()
    }

    fn should_preempt(&self, current: &InService, entry: &QueuedJob, time: SimTime) -> Result<bool, SimError> {
        if !self.waiting.with_preemption() {
            return Ok(false);
        }
        match self.waiting.discipline() {
            Discipline::Srt { .. } => Ok(entry.remaining < remaining_of(current, time)?),
            Discipline::Priority { .. } => Ok(entry.priority > current.entry.priority),
            // round-robin only preempts when the quantum runs out
            _ => Ok(false),
        }
    }

    fn occupy(&mut self, entry: QueuedJob, time: SimTime) -> Dispatch {
        self.in_service = Some(InService {
            entry,
            started: time,
        });
        match self.waiting.discipline().quantum() {
            Some(quantum) if entry.remaining > quantum => Dispatch {
                job: entry.job,
                kind: EventKind::Preemption,
                slice: quantum,
            },
            _ => Dispatch {
                job: entry.job,
                kind: EventKind::Departure,
                slice: entry.remaining,
            },
        }
    }
}

fn remaining_of(current: &InService, time: SimTime) -> Result<SimTime, SimError> {
    let elapsed = time.checked_since(current.started).ok_or_else(|| {
        SimError::argument(format!(
            "{} started service at {}, cannot measure it at {time}",
            current.entry.job, current.started
        ))
    })?;
    Ok(current.entry.remaining - elapsed)
}

/// One service station of the network.
#[derive(Debug, Clone)]
pub struct Server {
    id: ServerId,
    service: Distribution,
    routing: RoutingTable,
    execution: ServerExecution,
}

impl Server {
    pub fn new(id: ServerId, service: Distribution, discipline: Discipline) -> Self {
        Self {
            id,
            service,
            routing: RoutingTable::new(),
            execution: ServerExecution::new(discipline),
        }
    }

    pub fn id(&self) -> ServerId {
        self.id
    }

    pub fn service(&self) -> &Distribution {
        &self.service
    }

    pub fn discipline(&self) -> Discipline {
        self.execution.discipline()
    }

    pub fn routing(&self) -> &RoutingTable {
        &self.routing
    }

    pub fn execution(&self) -> &ServerExecution {
        &self.execution
    }

    /// Route a share of the departing jobs to `destination`.
    pub fn add_destination(&mut self, destination: ServerId, probability: f64) -> Result<(), SimError> {
        self.routing.set(destination, probability)
    }

    /// `job` arrives at `time`; its service time is drawn now.
    pub fn job_arrival(&mut self, job: &Job, time: SimTime, rng: &mut SimRng) -> Result<Admission, SimError> {
        let size = sample_duration(&self.service, rng, "service time");
        self.admit(
            QueuedJob {
                job: job.id(),
                remaining: size,
                priority: job.priority(),
                arrived: time,
            },
            time,
        )
    }

    /// Offers a job whose service time is already known.
    pub fn admit(&mut self, entry: QueuedJob, time: SimTime) -> Result<Admission, SimError> {
        self.execution.admit(entry, time)
    }

    pub fn finish_execution(&mut self, time: SimTime, is_preemption: bool) -> Result<Completion, SimError> {
        self.execution.finish_execution(time, is_preemption)
    }

    pub fn remaining_time(&self, time: SimTime) -> Result<SimTime, SimError> {
        self.execution.remaining_time(time)
    }

    pub fn route_job(&self, rng: &mut SimRng) -> Route {
        self.routing.draw(rng)
    }

    pub fn is_busy(&self) -> bool {
        self.execution.is_busy()
    }

    pub fn queue_len(&self) -> usize {
        self.execution.queue_len()
    }

    pub fn current_job(&self) -> Option<JobId> {
        self.execution.current_job()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(units: f64) -> SimTime {
        SimTime::try_from_f64(units).unwrap()
    }

    fn entry(id: u64, size: f64, priority: u32, arrived: f64) -> QueuedJob {
        QueuedJob {
            job: JobId(id),
            remaining: t(size),
            priority,
            arrived: t(arrived),
        }
    }

    fn server(discipline: Discipline) -> Server {
        Server::new(ServerId(0), Distribution::constant(1.0).unwrap(), discipline)
    }

    #[test]
    fn test_idle_server_starts_immediately() {
        let mut server = server(Discipline::Fcfs);
        let admission = server.admit(entry(1, 3.0, 0, 0.0), t(0.0)).unwrap();
        assert_eq!(
            admission,
            Admission::Started(Dispatch {
                job: JobId(1),
                kind: EventKind::Departure,
                slice: t(3.0),
            })
        );
        assert!(server.is_busy());
        assert_eq!(server.current_job(), Some(JobId(1)));
    }

    #[test]
    fn test_srt_preempts_with_remaining_work() {
        let mut server = server(Discipline::Srt { preemptive: true });
        server.admit(entry(1, 3.0, 0, 0.0), t(0.0)).unwrap();

        let admission = server.admit(entry(2, 1.0, 0, 1.0), t(1.0)).unwrap();
        match admission {
            Admission::Preempted {
                dispatch,
                displaced,
                remaining,
            } => {
                assert_eq!(displaced, JobId(1));
                assert_eq!(remaining, t(2.0));
                assert_eq!(dispatch.job, JobId(2));
                assert_eq!(dispatch.slice, t(1.0));
            }
            other => panic!("expected preemption, got {other:?}"),
        }

        let done = server.finish_execution(t(2.0), false).unwrap();
        assert_eq!(done.released, JobId(2));
        assert!(done.departed);
        assert_eq!(done.next.unwrap().job, JobId(1));
        assert_eq!(done.next.unwrap().slice, t(2.0));
    }

    #[test]
    fn test_srt_without_preemption_keeps_serving() {
        let mut server = server(Discipline::Srt { preemptive: false });
        server.admit(entry(1, 3.0, 0, 0.0), t(0.0)).unwrap();
        assert_eq!(server.admit(entry(2, 1.0, 0, 1.0), t(1.0)).unwrap(), Admission::Queued);
        assert_eq!(server.remaining_time(t(1.0)).unwrap(), t(2.0));

        let done = server.finish_execution(t(3.0), false).unwrap();
        assert_eq!(done.released, JobId(1));
        assert_eq!(done.next.unwrap().job, JobId(2));
    }

    #[test]
    fn test_srt_longer_arrival_waits() {
        let mut server = server(Discipline::Srt { preemptive: true });
        server.admit(entry(1, 3.0, 0, 0.0), t(0.0)).unwrap();
        assert_eq!(server.admit(entry(2, 2.5, 0, 1.0), t(1.0)).unwrap(), Admission::Queued);
    }

    #[test]
    fn test_priority_preempts_only_strictly_higher() {
        let mut server = server(Discipline::Priority { preemptive: true });
        server.admit(entry(1, 2.0, 1, 0.0), t(0.0)).unwrap();
        assert_eq!(server.admit(entry(2, 2.0, 1, 0.5), t(0.5)).unwrap(), Admission::Queued);
        assert!(matches!(
            server.admit(entry(3, 2.0, 2, 1.0), t(1.0)).unwrap(),
            Admission::Preempted { displaced: JobId(1), .. }
        ));

        // job 1 arrived before job 2, so it resumes first
        let done = server.finish_execution(t(3.0), false).unwrap();
        assert_eq!(done.next.unwrap().job, JobId(1));
        assert_eq!(done.next.unwrap().slice, t(1.0));
    }

    #[test]
    fn test_round_robin_cycles_in_arrival_order() {
        let mut server = server(Discipline::round_robin(1.0).unwrap());
        let mut now = t(0.0);
        let started = server.admit(entry(1, 2.0, 0, 0.0), now).unwrap();
        assert!(matches!(
            started,
            Admission::Started(Dispatch { kind: EventKind::Preemption, .. })
        ));
        assert_eq!(server.admit(entry(2, 2.0, 0, 0.5), t(0.5)).unwrap(), Admission::Queued);
        assert_eq!(server.admit(entry(3, 2.0, 0, 1.0), t(1.0)).unwrap(), Admission::Queued);

        let mut order = vec![1];
        let mut departures = Vec::new();
        let mut pending = EventKind::Preemption;
        loop {
            now = now + t(1.0);
            let done = server.finish_execution(now, pending == EventKind::Preemption).unwrap();
            if done.departed {
                departures.push((done.released.0, now));
            }
            match done.next {
                Some(next) => {
                    order.push(next.job.0);
                    pending = next.kind;
                }
                None => break,
            }
        }
        assert_eq!(order, vec![1, 2, 3, 1, 2, 3]);
        assert_eq!(departures, vec![(1, t(4.0)), (2, t(5.0)), (3, t(6.0))]);
    }

    #[test]
    fn test_lone_round_robin_job_resumes() {
        let mut server = server(Discipline::round_robin(1.0).unwrap());
        server.admit(entry(1, 2.5, 0, 0.0), t(0.0)).unwrap();
        let done = server.finish_execution(t(1.0), true).unwrap();
        assert!(!done.departed);
        let next = done.next.unwrap();
        assert_eq!(next.job, JobId(1));
        assert_eq!(next.kind, EventKind::Preemption);
        let done = server.finish_execution(t(2.0), true).unwrap();
        assert_eq!(done.next.unwrap().slice, t(0.5));
        assert_eq!(done.next.unwrap().kind, EventKind::Departure);
    }

    #[test]
    fn test_finish_on_idle_server_is_an_error() {
        let mut server = server(Discipline::Fcfs);
        assert!(matches!(
            server.finish_execution(t(1.0), false),
            Err(SimError::InvalidArgument(_))
        ));
        assert!(server.remaining_time(t(0.0)).is_err());
    }

    #[test]
    fn test_job_arrival_samples_service_time() {
        let mut server = Server::new(ServerId(3), Distribution::constant(2.5).unwrap(), Discipline::Fcfs);
        let job = Job::new(JobId(4), t(1.0), ServerId(3), 0);
        let mut rng = SimRng::seeded(0);
        let admission = server.job_arrival(&job, t(1.0), &mut rng).unwrap();
        assert!(matches!(admission, Admission::Started(Dispatch { slice, .. }) if slice == t(2.5)));
    }

    #[test]
    fn test_negative_samples_become_zero() {
        let mut rng = SimRng::seeded(5);
        let dist = Distribution::normal(0.0, 1.0).unwrap();
        assert!((0..200).all(|_| sample_duration(&dist, &mut rng, "test") <= t(10.0)));

        let negative_mean = Distribution::Normal {
            mean: -10.0,
            std_dev: 0.0,
        };
        assert_eq!(sample_duration(&negative_mean, &mut rng, "test"), SimTime::zero());
    }
}
