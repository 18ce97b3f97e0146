//! Time-ordered event heap with lazy cancellation
//!
//! Events live in an arena of slots. The heap only holds `(time, id, handle)`
//! entries, and whoever needs to cancel an event later (a server with a
//! pending departure) keeps the same [`EventHandle`]. Cancelling sets a flag
//! on the arena record; the heap entry stays where it is and the event is
//! reported as cancelled when it reaches the top.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use serde::Serialize;

use crate::error::SimError;
use crate::logging::events;
use crate::time::SimTime;
use crate::types::{EventId, JobId, ServerId};

/// What happens to a job at a server when the event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// The job joins the server
    Arrival,
    /// The job finishes its service
    Departure,
    /// The job's service slice ends before its work is done
    Preemption,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Arrival => "arrival",
            EventKind::Departure => "departure",
            EventKind::Preemption => "preemption",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A scheduled happening. Immutable apart from its cancellation flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    id: EventId,
    time: SimTime,
    kind: EventKind,
    job: JobId,
    server: ServerId,
    cancelled: bool,
}

impl Event {
    pub fn id(&self) -> EventId {
        self.id
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn job(&self) -> JobId {
        self.job
    }

    pub fn server(&self) -> ServerId {
        self.server
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }
}

/// Reference to an event in the scheduler's arena.
///
/// Handles stay valid until their event is popped. After that the slot may
/// be reused, and the generation check makes the old handle inert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventHandle {
    slot: usize,
    generation: u64,
}

#[derive(Debug)]
struct Slot {
    generation: u64,
    event: Option<Event>,
}

/// Heap entry, ordered by time then by creation order.
#[derive(Debug)]
struct EventEntry {
    time: SimTime,
    id: EventId,
    handle: EventHandle,
}

impl PartialEq for EventEntry {
    fn eq(&self, other: &Self) -> bool {
        self.time == other.time && self.id == other.id
    }
}

impl Eq for EventEntry {}

impl PartialOrd for EventEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse the ordering for min-heap behavior in BinaryHeap
        other
            .time
            .cmp(&self.time)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Scheduler is used to keep the current time and the upcoming events.
#[derive(Debug, Default)]
pub struct Scheduler {
    next_event_id: u64,
    events: BinaryHeap<EventEntry>,
    slots: Vec<Slot>,
    free_slots: Vec<usize>,
    clock: SimTime,
}

impl Scheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules an event at the absolute instant `time`.
    ///
    /// Fails if `time` is earlier than the current clock.
    pub fn schedule(
        &mut self,
        time: SimTime,
        kind: EventKind,
        job: JobId,
        server: ServerId,
    ) -> Result<EventHandle, SimError> {
        if time < self.clock {
            return Err(SimError::argument(format!(
                "cannot schedule {kind} for {job} at {time}, clock is already at {}",
                self.clock
            )));
        }

        let id = EventId(self.next_event_id);
        self.next_event_id += 1;

        let event = Event {
            id,
            time,
            kind,
            job,
            server,
            cancelled: false,
        };
        let handle = match self.free_slots.pop() {
            Some(slot) => {
                let entry = &mut self.slots[slot];
                entry.event = Some(event);
                EventHandle {
                    slot,
                    generation: entry.generation,
                }
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    event: Some(event),
                });
                EventHandle {
                    slot: self.slots.len() - 1,
                    generation: 0,
                }
            }
        };

        self.events.push(EventEntry { time, id, handle });
        events::event_scheduled(id, kind.as_str(), time, server);
        Ok(handle)
    }

    /// Marks a pending event as cancelled.
    ///
    /// Returns `false` if the handle no longer refers to a pending event or
    /// the event was already cancelled.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        match self.event_mut(handle) {
            Some(event) if !event.cancelled => {
                event.cancelled = true;
                events::event_cancelled(event.id, event.kind.as_str(), event.time, event.server);
                true
            }
            _ => false,
        }
    }

    /// Returns the pending event behind `handle`, if it has not been popped yet.
    pub fn get(&self, handle: EventHandle) -> Option<&Event> {
        self.slots
            .get(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.event.as_ref())
    }

    /// True if `handle` refers to an event that is still queued and not cancelled.
    pub fn is_pending(&self, handle: EventHandle) -> bool {
        self.get(handle).is_some_and(|event| !event.cancelled)
    }

    /// Returns the current simulation time.
    #[must_use]
    pub fn time(&self) -> SimTime {
        self.clock
    }

    /// Time of the entry at the top of the heap, cancelled or not.
    pub fn peek_time(&self) -> Option<SimTime> {
        self.events.peek().map(|entry| entry.time)
    }

    /// Removes and returns the next event or `None` if none are left.
    ///
    /// Cancelled events are returned too, with [`Event::is_cancelled`] set;
    /// they do not move the clock.
    pub fn pop(&mut self) -> Option<Event> {
        let entry = self.events.pop()?;
        let slot = self.slots.get_mut(entry.handle.slot)?;
        let event = slot.event.take()?;
        slot.generation += 1;
        self.free_slots.push(entry.handle.slot);
        if !event.cancelled {
            self.clock = event.time;
        }
        Some(event)
    }

    /// Number of heap entries, including cancelled ones
    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    fn event_mut(&mut self, handle: EventHandle) -> Option<&mut Event> {
        self.slots
            .get_mut(handle.slot)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.event.as_mut())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(units: u64) -> SimTime {
        SimTime::from_units(units)
    }

    #[test]
    fn test_pops_in_time_order() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(at(3), EventKind::Arrival, JobId(3), ServerId(0)).unwrap();
        scheduler.schedule(at(1), EventKind::Arrival, JobId(1), ServerId(0)).unwrap();
        scheduler.schedule(at(2), EventKind::Departure, JobId(2), ServerId(0)).unwrap();

        let order: Vec<_> = std::iter::from_fn(|| scheduler.pop()).map(|e| e.job()).collect();
        assert_eq!(order, vec![JobId(1), JobId(2), JobId(3)]);
        assert_eq!(scheduler.time(), at(3));
    }

    #[test]
    fn test_ties_break_by_creation_order() {
        let mut scheduler = Scheduler::new();
        for job in 0..5 {
            scheduler.schedule(at(1), EventKind::Arrival, JobId(job), ServerId(0)).unwrap();
        }
        let order: Vec<_> = std::iter::from_fn(|| scheduler.pop()).map(|e| e.job().0).collect();
        assert_eq!(order, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_cancelled_event_stays_in_heap() {
        let mut scheduler = Scheduler::new();
        let handle = scheduler.schedule(at(5), EventKind::Departure, JobId(1), ServerId(0)).unwrap();
        scheduler.schedule(at(7), EventKind::Departure, JobId(2), ServerId(0)).unwrap();

        assert!(scheduler.is_pending(handle));
        assert!(scheduler.cancel(handle));
        assert!(!scheduler.cancel(handle));
        assert!(!scheduler.is_pending(handle));
        assert_eq!(scheduler.len(), 2);
        assert_eq!(scheduler.peek_time(), Some(at(5)));

        let stale = scheduler.pop().unwrap();
        assert!(stale.is_cancelled());
        assert_eq!(scheduler.time(), SimTime::zero());

        let live = scheduler.pop().unwrap();
        assert!(!live.is_cancelled());
        assert_eq!(scheduler.time(), at(7));
    }

    #[test]
    fn test_stale_handle_cannot_cancel_reused_slot() {
        let mut scheduler = Scheduler::new();
        let old = scheduler.schedule(at(1), EventKind::Departure, JobId(1), ServerId(0)).unwrap();
        scheduler.pop().unwrap();

        let new = scheduler.schedule(at(2), EventKind::Departure, JobId(2), ServerId(0)).unwrap();
        assert!(!scheduler.cancel(old));
        assert!(scheduler.get(old).is_none());
        assert!(scheduler.is_pending(new));
    }

    #[test]
    fn test_schedule_in_past_is_rejected() {
        let mut scheduler = Scheduler::new();
        scheduler.schedule(at(4), EventKind::Arrival, JobId(1), ServerId(0)).unwrap();
        scheduler.pop().unwrap();
        let err = scheduler.schedule(at(3), EventKind::Arrival, JobId(2), ServerId(0));
        assert!(matches!(err, Err(SimError::InvalidArgument(_))));
        assert!(scheduler.schedule(at(4), EventKind::Arrival, JobId(2), ServerId(0)).is_ok());
    }

    #[test]
    fn test_event_ids_are_monotonic() {
        let mut scheduler = Scheduler::new();
        let a = scheduler.schedule(at(9), EventKind::Arrival, JobId(1), ServerId(0)).unwrap();
        let b = scheduler.schedule(at(1), EventKind::Arrival, JobId(2), ServerId(1)).unwrap();
        let id_a = scheduler.get(a).unwrap().id();
        let id_b = scheduler.get(b).unwrap().id();
        assert!(id_a < id_b);
        assert_eq!(scheduler.get(b).unwrap().server(), ServerId(1));
        assert_eq!(scheduler.get(b).unwrap().kind(), EventKind::Arrival);
    }
}
