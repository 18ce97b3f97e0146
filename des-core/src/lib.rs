//! Event kernel for queueing network simulation.
//!
//! This crate provides the building blocks the simulator is made of:
//! fixed-resolution time, the time-ordered event heap with lazy cancellation,
//! the job record with its per-server accounting, sampling distributions,
//! and the owned random source.
//!
//! # Architecture Overview
//!
//! - [`Scheduler`]: owns the clock and a min-heap of events. Events live in an
//!   arena and are referenced through [`EventHandle`]s, so a pending departure
//!   can be cancelled after a preemption without touching the heap.
//! - [`Job`]: one unit of work and the queue and total time it accumulated at
//!   every server it visited.
//! - [`Distribution`]: constant, exponential, uniform and normal samplers,
//!   validated at construction.
//! - [`SimRng`]: the seedable generator a run owns.
//! - [`Step`] / [`Executor`]: drive anything that can process one event at a
//!   time, until a time bound, for a number of steps, or until exhausted.
//!
//! # Basic Usage
//!
//! ```rust
//! use des_core::{EventKind, JobId, Scheduler, ServerId, SimTime};
//!
//! let mut scheduler = Scheduler::new();
//! let departure = scheduler
//!     .schedule(SimTime::from_units(3), EventKind::Departure, JobId(1), ServerId(0))
//!     .unwrap();
//! scheduler
//!     .schedule(SimTime::from_units(1), EventKind::Arrival, JobId(2), ServerId(0))
//!     .unwrap();
//!
//! // A preemption makes the pending departure stale.
//! scheduler.cancel(departure);
//!
//! let first = scheduler.pop().unwrap();
//! assert_eq!(first.job(), JobId(2));
//! assert!(scheduler.pop().unwrap().is_cancelled());
//! ```
//!
//! # Time Model
//!
//! All timing uses [`SimTime`], an integer number of 1e-4 time-unit ticks.
//! Scheduling arithmetic is exact, which keeps runs with a fixed seed
//! reproducible bit for bit.

pub mod dists;
pub mod error;
pub mod execute;
pub mod job;
pub mod logging;
pub mod metrics;
pub mod randomness;
pub mod scheduler;
pub mod time;
pub mod types;
pub mod validation;

pub use dists::Distribution;
pub use error::SimError;
pub use execute::{Execute, Executor, ExecutorWithSideEffect, Step};
pub use job::{Job, ServerVisits};
pub use logging::{
    event_span, init_detailed_simulation_logging, init_simulation_logging,
    init_simulation_logging_with_level, server_span, simulation_span,
};
pub use metrics::KernelCounters;
pub use randomness::SimRng;
pub use scheduler::{Event, EventHandle, EventKind, Scheduler};
pub use time::SimTime;
pub use types::{EventId, JobId, Priority, ServerId};
