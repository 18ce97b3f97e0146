//! Network topologies and job generation
//!
//! An open network is fed by independent arrival streams and jobs leave it
//! for good. A closed network has a fixed number of terminals; a job that
//! reaches "end" goes back to its terminal, thinks, and re-enters as a new
//! job, so the population never changes.

use crate::priority::PriorityDistribution;
use crate::queue::Discipline;
use crate::routing::{Route, RoutingTable};
use crate::server::{sample_duration, Server};
use des_core::logging::events;
use des_core::validation::{mean_rounds_to_zero, validate_server_id, PROBABILITY_EPSILON};
use des_core::{Distribution, EventKind, Job, JobId, Scheduler, ServerId, SimError, SimRng, SimTime};
use std::collections::HashMap;

/// Exogenous arrivals into one server.
#[derive(Debug, Clone)]
pub struct ArrivalStream {
    pub server: ServerId,
    pub interarrival: Distribution,
    pub priorities: Option<PriorityDistribution>,
}

/// Fixed population circulating between terminals and servers.
#[derive(Debug, Clone)]
pub struct ClosedPopulation {
    pub terminals: usize,
    pub think_time: Distribution,
    pub priorities: Option<PriorityDistribution>,
    pub entry_routing: RoutingTable,
}

#[derive(Debug, Clone)]
pub enum Topology {
    Open { streams: Vec<ArrivalStream> },
    Closed(ClosedPopulation),
}

/// Servers plus the way jobs enter them.
///
/// A run works on its own clone, so one description can be simulated many
/// times.
#[derive(Debug, Clone)]
pub struct Network {
    servers: Vec<Server>,
    topology: Topology,
    next_job_id: u64,
}

impl Network {
    pub fn open() -> Self {
        Self {
            servers: Vec::new(),
            topology: Topology::Open { streams: Vec::new() },
            next_job_id: 0,
        }
    }

    pub fn closed(terminals: usize, think_time: Distribution) -> Self {
        Self {
            servers: Vec::new(),
            topology: Topology::Closed(ClosedPopulation {
                terminals,
                think_time,
                priorities: None,
                entry_routing: RoutingTable::new(),
            }),
            next_job_id: 0,
        }
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.topology, Topology::Closed(_))
    }

    /// Terminal count of a closed network
    pub fn terminals(&self) -> Option<usize> {
        match &self.topology {
            Topology::Closed(population) => Some(population.terminals),
            Topology::Open { .. } => None,
        }
    }

    /// Adds a server; ids are handed out sequentially from 0.
    ///
    /// Both the service distribution and the discipline are checked, since
    /// either may come from deserialized input.
    pub fn add_server(&mut self, service: Distribution, discipline: Discipline) -> Result<ServerId, SimError> {
        service.validate()?;
        discipline.validate()?;
        let id = ServerId(self.servers.len());
        self.servers.push(Server::new(id, service, discipline));
        events::topology_changed(
            "server_added",
            &format!("{id} {} service, {} discipline", service.name(), discipline.name()),
        );
        Ok(id)
    }

    pub fn add_servers_connection(
        &mut self,
        origin: ServerId,
        destination: ServerId,
        probability: f64,
    ) -> Result<(), SimError> {
        validate_server_id(origin, self.servers.len())?;
        validate_server_id(destination, self.servers.len())?;
        self.servers[origin.index()].add_destination(destination, probability)?;
        events::topology_changed(
            "connection_added",
            &format!("{origin} -> {destination} with probability {probability}"),
        );
        Ok(())
    }

    /// Superimposes an arrival stream on `server`. Open networks only.
    pub fn add_entry_point(
        &mut self,
        server: ServerId,
        interarrival: Distribution,
        priorities: Option<PriorityDistribution>,
    ) -> Result<(), SimError> {
        let Topology::Open { streams } = &mut self.topology else {
            return Err(SimError::configuration(
                "entry points can only be added to an open network",
            ));
        };
        validate_server_id(server, self.servers.len())?;
        interarrival.validate()?;
        if mean_rounds_to_zero(&interarrival) {
            return Err(SimError::configuration(format!(
                "interarrival distribution of {server} has mean {}, jobs would never stop arriving",
                interarrival.mean()
            )));
        }
        streams.push(ArrivalStream {
            server,
            interarrival,
            priorities,
        });
        events::topology_changed(
            "entry_point_added",
            &format!("{server} with {} interarrivals", interarrival.name()),
        );
        Ok(())
    }

    /// Share of jobs leaving a terminal toward `destination`. Closed networks only.
    pub fn add_terminals_routing_probability(
        &mut self,
        destination: ServerId,
        probability: f64,
    ) -> Result<(), SimError> {
        validate_server_id(destination, self.servers.len())?;
        let population = self.closed_population_mut()?;
        population.entry_routing.set(destination, probability)?;
        events::topology_changed(
            "terminal_routing_added",
            &format!("terminals -> {destination} with probability {probability}"),
        );
        Ok(())
    }

    /// Priorities drawn by regenerated jobs. Closed networks only.
    pub fn set_closed_priorities(&mut self, priorities: PriorityDistribution) -> Result<(), SimError> {
        self.closed_population_mut()?.priorities = Some(priorities);
        Ok(())
    }

    pub fn servers(&self) -> &[Server] {
        &self.servers
    }

    pub fn number_of_servers(&self) -> usize {
        self.servers.len()
    }

    pub fn server(&self, id: ServerId) -> Result<&Server, SimError> {
        validate_server_id(id, self.servers.len())?;
        Ok(&self.servers[id.index()])
    }

    pub fn server_mut(&mut self, id: ServerId) -> Result<&mut Server, SimError> {
        validate_server_id(id, self.servers.len())?;
        Ok(&mut self.servers[id.index()])
    }

    /// Creates the initial jobs and their arrival events.
    ///
    /// Open streams run forward from time 0 and stop at the first arrival
    /// at or past `end`. A closed network gets one job per terminal.
    pub fn generate_jobs(
        &mut self,
        end: SimTime,
        scheduler: &mut Scheduler,
        jobs: &mut HashMap<JobId, Job>,
        rng: &mut SimRng,
    ) -> Result<(), SimError> {
        match &self.topology {
            Topology::Open { streams } => {
                let mut next_job_id = self.next_job_id;
                for stream in streams {
                    let mut time = SimTime::zero();
                    loop {
                        time = time + sample_duration(&stream.interarrival, rng, "interarrival time");
                        if time >= end {
                            break;
                        }
                        let priority = stream.priorities.as_ref().map_or(0, |p| p.draw(rng));
                        let id = JobId(next_job_id);
                        next_job_id += 1;
                        scheduler.schedule(time, EventKind::Arrival, id, stream.server)?;
                        jobs.insert(id, Job::new(id, time, stream.server, priority));
                    }
                }
                self.next_job_id = next_job_id;
                Ok(())
            }
            Topology::Closed(population) => {
                if population.terminals > 0 && population.entry_routing.total() <= PROBABILITY_EPSILON {
                    return Err(SimError::configuration(
                        "closed network has terminals but no routing probability from terminals to any server",
                    ));
                }
                if population.terminals > 0 {
                    self.check_closed_cycle_advances(population)?;
                }
                let terminals = population.terminals;
                for _ in 0..terminals {
                    self.spawn_closed_job(SimTime::zero(), scheduler, jobs, rng)?;
                }
                Ok(())
            }
        }
    }

    /// Called when a job reaches "end" at `time`.
    ///
    /// Open networks let it go. Closed networks send a fresh job out of the
    /// terminal after a think time.
    pub fn finish_job(
        &mut self,
        time: SimTime,
        scheduler: &mut Scheduler,
        jobs: &mut HashMap<JobId, Job>,
        rng: &mut SimRng,
    ) -> Result<(), SimError> {
        if self.is_closed() {
            self.spawn_closed_job(time, scheduler, jobs, rng)?;
        }
        Ok(())
    }

    /// Thinks until the entry table picks a server, then schedules the arrival.
    fn spawn_closed_job(
        &mut self,
        from: SimTime,
        scheduler: &mut Scheduler,
        jobs: &mut HashMap<JobId, Job>,
        rng: &mut SimRng,
    ) -> Result<(), SimError> {
        let Topology::Closed(population) = &self.topology else {
            return Err(SimError::configuration("terminals only exist in a closed network"));
        };
        let mut arrival = from;
        let server = loop {
            arrival = arrival + sample_duration(&population.think_time, rng, "think time");
            if let Route::Server(server) = population.entry_routing.draw(rng) {
                break server;
            }
        };
        let priority = population.priorities.as_ref().map_or(0, |p| p.draw(rng));

        let id = JobId(self.next_job_id);
        self.next_job_id += 1;
        scheduler.schedule(arrival, EventKind::Arrival, id, server)?;
        jobs.insert(id, Job::new(id, arrival, server, priority));
        events::job_regenerated(id, server, arrival);
        Ok(())
    }

    /// Fails when a job can leave its terminal and come back without the
    /// clock moving: zero think time and a path to "end" that only crosses
    /// zero-time servers.
    fn check_closed_cycle_advances(&self, population: &ClosedPopulation) -> Result<(), SimError> {
        if !mean_rounds_to_zero(&population.think_time) {
            return Ok(());
        }
        let mut visited = vec![false; self.servers.len()];
        let mut pending: Vec<ServerId> = population.entry_routing.destinations().map(|(id, _)| id).collect();
        while let Some(id) = pending.pop() {
            let Some(server) = self.servers.get(id.index()) else {
                continue;
            };
            if visited[id.index()] || !mean_rounds_to_zero(server.service()) {
                continue;
            }
            visited[id.index()] = true;
            if server.routing().end_probability() > PROBABILITY_EPSILON {
                return Err(SimError::configuration(format!(
                    "think time and the service time of {id} are both zero, jobs would cycle through the terminals without the clock advancing"
                )));
            }
            pending.extend(server.routing().destinations().map(|(next, _)| next));
        }
        Ok(())
    }

    fn closed_population_mut(&mut self) -> Result<&mut ClosedPopulation, SimError> {
        match &mut self.topology {
            Topology::Closed(population) => Ok(population),
            Topology::Open { .. } => Err(SimError::configuration(
                "terminal settings only apply to a closed network",
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn constant(value: f64) -> Distribution {
        Distribution::constant(value).unwrap()
    }

    #[test]
    fn test_server_ids_are_sequential() {
        let mut network = Network::open();
        let a = network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        let b = network.add_server(constant(1.0), Discipline::Lcfs).unwrap();
        assert_eq!((a, b), (ServerId(0), ServerId(1)));
        assert_eq!(network.number_of_servers(), 2);
        assert_eq!(network.server(b).unwrap().discipline(), Discipline::Lcfs);
    }

    #[test]
    fn test_connections_validate_ids() {
        let mut network = Network::open();
        network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        assert!(matches!(
            network.add_servers_connection(ServerId(0), ServerId(1), 0.5),
            Err(SimError::InvalidConfiguration(_))
        ));
        network.add_servers_connection(ServerId(0), ServerId(0), 0.5).unwrap();
        assert_eq!(network.servers()[0].routing().probability(ServerId(0)), 0.5);
    }

    #[test]
    fn test_wrong_variant_operations() {
        let mut open = Network::open();
        open.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        assert!(open.add_terminals_routing_probability(ServerId(0), 1.0).is_err());
        assert!(open.set_closed_priorities(PriorityDistribution::single(1)).is_err());

        let mut closed = Network::closed(2, constant(1.0));
        closed.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        assert!(closed.add_entry_point(ServerId(0), constant(1.0), None).is_err());
        assert_eq!(closed.terminals(), Some(2));
    }

    #[test]
    fn test_open_generation_stops_before_end() {
        let mut network = Network::open();
        let server = network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        network.add_entry_point(server, constant(2.0), None).unwrap();

        let mut scheduler = Scheduler::new();
        let mut jobs = HashMap::new();
        let mut rng = SimRng::seeded(0);
        network
            .generate_jobs(SimTime::from_units(10), &mut scheduler, &mut jobs, &mut rng)
            .unwrap();

        // arrivals at 2, 4, 6 and 8; 10 is past the end
        assert_eq!(jobs.len(), 4);
        assert_eq!(scheduler.len(), 4);
        let mut times: Vec<_> = jobs.values().map(|job| job.arrival_time()).collect();
        times.sort();
        assert_eq!(times.first(), Some(&SimTime::from_units(2)));
        assert_eq!(times.last(), Some(&SimTime::from_units(8)));
    }

    #[test]
    fn test_superimposed_streams_get_unique_ids() {
        let mut network = Network::open();
        let server = network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        network.add_entry_point(server, constant(1.0), None).unwrap();
        network
            .add_entry_point(server, constant(2.5), Some(PriorityDistribution::single(3)))
            .unwrap();

        let mut scheduler = Scheduler::new();
        let mut jobs = HashMap::new();
        network
            .generate_jobs(SimTime::from_units(10), &mut scheduler, &mut jobs, &mut SimRng::seeded(0))
            .unwrap();
        // 9 from the first stream, 3 from the second
        assert_eq!(jobs.len(), 12);
        assert_eq!(jobs.values().filter(|job| job.priority() == 3).count(), 3);
    }

    #[test]
    fn test_closed_generation_one_job_per_terminal() {
        let mut network = Network::closed(5, constant(2.0));
        let server = network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        network.add_terminals_routing_probability(server, 1.0).unwrap();

        let mut scheduler = Scheduler::new();
        let mut jobs = HashMap::new();
        let mut rng = SimRng::seeded(0);
        network
            .generate_jobs(SimTime::from_units(100), &mut scheduler, &mut jobs, &mut rng)
            .unwrap();
        assert_eq!(jobs.len(), 5);
        assert!(jobs.values().all(|job| job.arrival_time() == SimTime::from_units(2)));

        network
            .finish_job(SimTime::from_units(7), &mut scheduler, &mut jobs, &mut rng)
            .unwrap();
        assert_eq!(jobs.len(), 6);
        assert_eq!(jobs[&JobId(5)].arrival_time(), SimTime::from_units(9));
    }

    #[test]
    fn test_think_time_accumulates_over_end_draws() {
        let mut network = Network::closed(200, constant(1.0));
        let server = network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        network.add_terminals_routing_probability(server, 0.5).unwrap();

        let mut scheduler = Scheduler::new();
        let mut jobs = HashMap::new();
        network
            .generate_jobs(SimTime::from_units(100), &mut scheduler, &mut jobs, &mut SimRng::seeded(8))
            .unwrap();
        assert!(jobs.values().all(|job| job.arrival_time() >= SimTime::from_units(1)));
        assert!(jobs.values().any(|job| job.arrival_time() > SimTime::from_units(1)));
    }

    #[test]
    fn test_closed_without_entry_routing_is_rejected() {
        let mut network = Network::closed(3, constant(1.0));
        network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        let err = network
            .generate_jobs(SimTime::from_units(10), &mut Scheduler::new(), &mut HashMap::new(), &mut SimRng::seeded(0))
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_closed_with_no_terminals_generates_nothing() {
        let mut network = Network::closed(0, constant(1.0));
        network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        let mut jobs = HashMap::new();
        network
            .generate_jobs(SimTime::from_units(10), &mut Scheduler::new(), &mut jobs, &mut SimRng::seeded(0))
            .unwrap();
        assert!(jobs.is_empty());
    }

    #[test]
    fn test_add_server_validates_its_inputs() {
        let mut network = Network::open();
        let err = network
            .add_server(constant(1.0), Discipline::RoundRobin { quantum: 0.00001 })
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));

        let discipline: Discipline = serde_json::from_str(r#"{"round_robin":{"quantum":-1.0}}"#).unwrap();
        assert!(network.add_server(constant(1.0), discipline).is_err());

        let bad = Distribution::Uniform { low: 2.0, high: 1.0 };
        assert!(matches!(
            network.add_server(bad, Discipline::Fcfs),
            Err(SimError::OutOfRangeDistributionParameter { .. })
        ));
        assert_eq!(network.number_of_servers(), 0);
    }

    #[test]
    fn test_zero_mean_stream_is_rejected() {
        let mut network = Network::open();
        let server = network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        assert!(matches!(
            network.add_entry_point(server, constant(0.0), None),
            Err(SimError::InvalidConfiguration(_))
        ));
        assert!(network
            .add_entry_point(server, Distribution::Constant { value: -1.0 }, None)
            .is_err());
        assert!(matches!(network.topology(), Topology::Open { streams } if streams.is_empty()));
    }

    #[test]
    fn test_zero_time_closed_cycle_is_rejected() {
        let mut network = Network::closed(1, constant(0.0));
        let server = network.add_server(constant(0.0), Discipline::Fcfs).unwrap();
        network.add_terminals_routing_probability(server, 1.0).unwrap();
        let err = network
            .generate_jobs(SimTime::from_units(10), &mut Scheduler::new(), &mut HashMap::new(), &mut SimRng::seeded(0))
            .unwrap_err();
        assert!(matches!(err, SimError::InvalidConfiguration(_)));
    }

    #[test]
    fn test_zero_think_time_with_timed_path_is_accepted() {
        // the zero-time front server always hands off to a server that takes time
        let mut network = Network::closed(2, constant(0.0));
        let front = network.add_server(constant(0.0), Discipline::Fcfs).unwrap();
        let back = network.add_server(constant(1.0), Discipline::Fcfs).unwrap();
        network.add_terminals_routing_probability(front, 1.0).unwrap();
        network.add_servers_connection(front, back, 1.0).unwrap();

        let mut jobs = HashMap::new();
        network
            .generate_jobs(SimTime::from_units(10), &mut Scheduler::new(), &mut jobs, &mut SimRng::seeded(0))
            .unwrap();
        assert_eq!(jobs.len(), 2);
    }
}
