//! Kernel counters mirrored into the `metrics` facade
//!
//! The counters are kept locally so a run can report them without any
//! recorder installed. Every increment is also forwarded to the global
//! `metrics` recorder, which is a no-op unless the host installs one.

use crate::scheduler::EventKind;
use crate::types::ServerId;
use metrics::counter;
use serde::Serialize;

/// Counts of what the event loop did during one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KernelCounters {
    pub arrivals: u64,
    pub departures: u64,
    pub preemption_events: u64,
    /// Cancelled events popped and discarded
    pub stale_events: u64,
    /// Jobs that lost their service slot to an arriving job
    pub preemptions: u64,
    pub jobs_completed: u64,
}

impl KernelCounters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_event(&mut self, kind: EventKind) {
        match kind {
            EventKind::Arrival => self.arrivals += 1,
            EventKind::Departure => self.departures += 1,
            EventKind::Preemption => self.preemption_events += 1,
        }
        counter!("queuenet_events_processed_total", "kind" => kind.as_str()).increment(1);
    }

    pub fn record_stale_event(&mut self) {
        self.stale_events += 1;
        counter!("queuenet_stale_events_total").increment(1);
    }

    pub fn record_preemption(&mut self, server: ServerId) {
        self.preemptions += 1;
        counter!("queuenet_preemptions_total", "server" => server.0.to_string()).increment(1);
    }

    pub fn record_completion(&mut self) {
        self.jobs_completed += 1;
        counter!("queuenet_jobs_completed_total").increment(1);
    }

    /// Live events processed, excluding discarded ones
    pub fn events_processed(&self) -> u64 {
        self.arrivals + self.departures + self.preemption_events
    }
}
