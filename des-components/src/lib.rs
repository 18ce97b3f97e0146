//! Servers, queue disciplines and topologies of a queueing network
//!
//! The pieces, from the leaves up:
//!
//! - [`queue`]: the five scheduling disciplines and the waiting line that
//!   orders jobs for each of them
//! - [`routing`]: probability tables with an implicit "end" route
//! - [`priority`]: priority class distributions for generated jobs
//! - [`server`]: the idle/serving state machine of one station
//! - [`network`]: open and closed topologies and job generation
//! - [`execution`]: the event loop that drives one run
//! - [`environment`]: the public builder and `simulate` entry point

pub mod environment;
pub mod execution;
pub mod network;
pub mod priority;
pub mod queue;
pub mod routing;
pub mod server;

pub use environment::{new_environment, Environment, EnvironmentOptions};
pub use execution::Execution;
pub use network::{ArrivalStream, ClosedPopulation, Network, Topology};
pub use priority::PriorityDistribution;
pub use queue::{Discipline, QueuedJob, WaitingLine};
pub use routing::{Route, RoutingTable};
pub use server::{Admission, Completion, Dispatch, Server, ServerExecution};
