//! Structured logging for queueing network simulation debugging
//!
//! Logging goes through `tracing`. Nothing is printed unless the host
//! application installs a subscriber, either its own or one of the helpers
//! below.
//!
//! # Controlling output
//!
//! ```rust
//! use des_core::logging::init_simulation_logging_with_level;
//! init_simulation_logging_with_level("debug");
//! ```
//!
//! `RUST_LOG` takes precedence over the level passed in:
//!
//! ```bash
//! RUST_LOG=des_components::execution=trace cargo run --example tandem_network
//! ```
//!
//! # Level guidelines
//! - **TRACE**: every scheduled, cancelled or processed event
//! - **DEBUG**: topology changes, preemptions, routing decisions
//! - **INFO**: one line per simulation run
//! - **WARN**: clamped samples and other suspicious input

use crate::time::SimTime;
use crate::types::{EventId, JobId, ServerId};
use tracing::{debug, info, trace, warn, Span};
use tracing_subscriber::{filter::EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize logging for the simulation at INFO level
pub fn init_simulation_logging() {
    init_simulation_logging_with_level("info")
}

/// Initialize logging with a specific level
///
/// Installing a subscriber twice is a no-op, so tests may call this freely.
///
/// # Arguments
/// * `level` - Log level: "trace", "debug", "info", "warn", or "error"
pub fn init_simulation_logging_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("{level},des_core=warn,des_components={level},des_metrics={level}").into()
    });

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Simulation logging initialized at level: {}", level);
    }
}

/// Initialize pretty-printed logging of everything, for step-by-step debugging
pub fn init_detailed_simulation_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "trace,des_core=trace,des_components=trace,des_metrics=debug".into());

    let installed = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_file(true)
                .with_line_number(true)
                .pretty(),
        )
        .with(filter)
        .try_init()
        .is_ok();

    if installed {
        info!("Detailed simulation logging initialized");
    }
}

/// Create a span covering one simulation run
pub fn simulation_span(name: &str, horizon: SimTime, warmup: SimTime) -> Span {
    tracing::info_span!("simulation", name = name, horizon = %horizon, warmup = %warmup)
}

/// Create a span for work done on behalf of one server
pub fn server_span(server: ServerId) -> Span {
    tracing::debug_span!("server", id = server.0)
}

/// Create a span for tracking event processing
pub fn event_span(event_id: EventId, event_type: &str, time: SimTime) -> Span {
    tracing::trace_span!("event", id = event_id.0, event_type = event_type, time = %time)
}

/// Logging utilities for common simulation events
pub mod events {
    use super::*;

    pub fn simulation_started(name: &str, servers: usize, initial_events: usize, end_time: SimTime) {
        info!(
            simulation = name,
            servers = servers,
            initial_events = initial_events,
            end_time = %end_time,
            "Simulation started"
        );
    }

    pub fn simulation_completed(name: &str, final_time: SimTime, events_processed: u64, jobs_completed: u64) {
        info!(
            simulation = name,
            final_time = %final_time,
            events_processed = events_processed,
            jobs_completed = jobs_completed,
            "Simulation completed"
        );
    }

    pub fn event_scheduled(event_id: EventId, event_type: &str, time: SimTime, server: ServerId) {
        trace!(
            event_id = event_id.0,
            event_type = event_type,
            time = %time,
            server = server.0,
            "Event scheduled"
        );
    }

    pub fn event_cancelled(event_id: EventId, event_type: &str, time: SimTime, server: ServerId) {
        trace!(
            event_id = event_id.0,
            event_type = event_type,
            time = %time,
            server = server.0,
            "Event cancelled"
        );
    }

    pub fn event_processing_started(event_id: EventId, event_type: &str, time: SimTime, job: JobId) {
        trace!(
            event_id = event_id.0,
            event_type = event_type,
            time = %time,
            job = job.0,
            "Processing event"
        );
    }

    pub fn job_preempted(server: ServerId, preempted: JobId, by: JobId, remaining: f64, time: SimTime) {
        debug!(
            server = server.0,
            preempted = preempted.0,
            by = by.0,
            remaining = remaining,
            time = %time,
            "Job preempted"
        );
    }

    pub fn job_routed(job: JobId, from: ServerId, to: Option<ServerId>, time: SimTime) {
        match to {
            Some(to) => trace!(job = job.0, from = from.0, to = to.0, time = %time, "Job routed"),
            None => trace!(job = job.0, from = from.0, time = %time, "Job left the network"),
        }
    }

    pub fn job_regenerated(job: JobId, server: ServerId, arrival: SimTime) {
        trace!(job = job.0, server = server.0, arrival = %arrival, "Terminal issued a new job");
    }

    pub fn topology_changed(change: &str, detail: &str) {
        debug!(change = change, detail = detail, "Topology changed");
    }
}

/// Logging utilities for suspicious conditions
pub mod diagnostics {
    use super::*;

    pub fn stale_event_discarded(event_id: EventId, event_type: &str, time: SimTime) {
        trace!(
            event_id = event_id.0,
            event_type = event_type,
            time = %time,
            "Discarded cancelled event"
        );
    }

    pub fn negative_sample_clamped(distribution: &str, sample: f64, context: &str) {
        warn!(
            distribution = distribution,
            sample = sample,
            context = context,
            "Negative sample treated as zero"
        );
    }

    pub fn ignored_priorities(server: ServerId) {
        warn!(
            server = server.0,
            "Priority distribution ignored because priorities are disabled"
        );
    }
}
