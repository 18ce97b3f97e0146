//! Jobs and their per-server time accounting

use crate::error::SimError;
use crate::time::SimTime;
use crate::types::{JobId, Priority, ServerId};
use serde::Serialize;
use std::collections::BTreeMap;

/// What one job accumulated at one server across all its visits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerVisits {
    /// Time spent waiting in line, summed over visits and preemptions
    pub queue_time: SimTime,
    /// Time from arrival to departure, summed over visits
    pub total_time: SimTime,
    pub visits: u32,
    pub arrivals: Vec<SimTime>,
}

impl ServerVisits {
    /// Time actually spent in service
    pub fn service_time(&self) -> SimTime {
        self.total_time - self.queue_time
    }
}

/// One simulated unit of work.
///
/// Identity, arrival time and priority are fixed at creation. The rest is
/// the timing history of the servers the job visits: each visit starts with
/// [`Job::reroute`] (or creation), waiting ends with [`Job::serve`], and a
/// preemption puts the job back to waiting with [`Job::suspend`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Job {
    id: JobId,
    arrival_time: SimTime,
    priority: Priority,
    current_server: ServerId,
    arrival_at_current: SimTime,
    waiting_since: Option<SimTime>,
    servers: BTreeMap<ServerId, ServerVisits>,
}

impl Job {
    /// Create a job that enters `server` at `arrival_time` and starts waiting there.
    pub fn new(id: JobId, arrival_time: SimTime, server: ServerId, priority: Priority) -> Self {
        let mut servers = BTreeMap::new();
        servers.insert(
            server,
            ServerVisits {
                visits: 1,
                arrivals: vec![arrival_time],
                ..ServerVisits::default()
            },
        );
        Self {
            id,
            arrival_time,
            priority,
            current_server: server,
            arrival_at_current: arrival_time,
            waiting_since: Some(arrival_time),
            servers,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    /// Instant the job entered the network
    pub fn arrival_time(&self) -> SimTime {
        self.arrival_time
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn current_server(&self) -> ServerId {
        self.current_server
    }

    pub fn arrival_at_current_server(&self) -> SimTime {
        self.arrival_at_current
    }

    pub fn is_waiting(&self) -> bool {
        self.waiting_since.is_some()
    }

    /// Service starts (or resumes) at `time` on the current server.
    ///
    /// Closes the open waiting interval and adds it to the queue time.
    pub fn serve(&mut self, time: SimTime) -> Result<(), SimError> {
        let since = self.waiting_since.ok_or_else(|| {
            SimError::argument(format!("{} is already in service", self.id))
        })?;
        let waited = time.checked_since(since).ok_or_else(|| {
            SimError::argument(format!(
                "{} cannot start service at {time} before it started waiting at {since}",
                self.id
            ))
        })?;
        self.current_visits_mut().queue_time += waited;
        self.waiting_since = None;
        Ok(())
    }

    /// Service is interrupted at `time`; the job waits again.
    pub fn suspend(&mut self, time: SimTime) -> Result<(), SimError> {
        if self.waiting_since.is_some() {
            return Err(SimError::argument(format!(
                "{} cannot be suspended while waiting",
                self.id
            )));
        }
        if time < self.arrival_at_current {
            return Err(SimError::argument(format!(
                "{} cannot be suspended at {time} before arriving at {}",
                self.id, self.arrival_at_current
            )));
        }
        self.waiting_since = Some(time);
        Ok(())
    }

    /// Close out the visit to the current server at `time`.
    ///
    /// With a destination the job enters that server at the same instant and
    /// starts waiting there; without one it leaves the network.
    pub fn reroute(&mut self, time: SimTime, destination: Option<ServerId>) -> Result<(), SimError> {
        let spent = time.checked_since(self.arrival_at_current).ok_or_else(|| {
            SimError::argument(format!(
                "{} cannot leave {} at {time} before arriving at {}",
                self.id, self.current_server, self.arrival_at_current
            ))
        })?;
        self.current_visits_mut().total_time += spent;

        if let Some(server) = destination {
            self.current_server = server;
            self.arrival_at_current = time;
            self.waiting_since = Some(time);
            let visits = self.servers.entry(server).or_default();
            visits.visits += 1;
            visits.arrivals.push(time);
        }
        Ok(())
    }

    /// Accounting for `server`, if the job has been there
    pub fn visits_at(&self, server: ServerId) -> Option<&ServerVisits> {
        self.servers.get(&server)
    }

    pub fn queue_time_at(&self, server: ServerId) -> SimTime {
        self.servers.get(&server).map(|v| v.queue_time).unwrap_or_default()
    }

    pub fn total_time_at(&self, server: ServerId) -> SimTime {
        self.servers.get(&server).map(|v| v.total_time).unwrap_or_default()
    }

    pub fn visit_count_at(&self, server: ServerId) -> u32 {
        self.servers.get(&server).map(|v| v.visits).unwrap_or_default()
    }

    /// Servers visited, in id order
    pub fn servers(&self) -> impl Iterator<Item = (ServerId, &ServerVisits)> {
        self.servers.iter().map(|(id, visits)| (*id, visits))
    }

    /// Queue time summed over every server
    pub fn total_queue_time(&self) -> SimTime {
        self.servers.values().map(|v| v.queue_time).sum()
    }

    fn current_visits_mut(&mut self) -> &mut ServerVisits {
        self.servers.entry(self.current_server).or_default()
    }
}
