//! Queue disciplines and the waiting line they order
//!
//! A [`Discipline`] is the configuration: which waiting job a server takes
//! next, and whether the job in service can lose its slot. A [`WaitingLine`]
//! is the runtime structure that holds the waiting jobs in that order.
//!
//! | Discipline  | Next job                                         | Preemptive            |
//! |-------------|--------------------------------------------------|-----------------------|
//! | FCFS        | oldest insertion                                 | no                    |
//! | LCFS        | newest insertion                                 | no                    |
//! | SRT         | least remaining work, then earliest server arrival | optional            |
//! | Round-robin | oldest insertion, service capped at a quantum    | always, by quantum    |
//! | Priority    | highest priority, then earliest server arrival   | optional              |

use des_core::validation::validate_quantum;
use des_core::{JobId, Priority, SimError, SimTime};
use serde::{Deserialize, Serialize};
use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};

/// Scheduling policy of one server.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Discipline {
    /// First come, first served
    #[default]
    Fcfs,
    /// Last come, first served
    Lcfs,
    /// Shortest remaining time
    Srt { preemptive: bool },
    /// Round-robin with a fixed service slice
    RoundRobin { quantum: f64 },
    /// Highest priority first
    Priority { preemptive: bool },
}

impl Discipline {
    /// Round-robin with the given slice length.
    pub fn round_robin(quantum: f64) -> Result<Self, SimError> {
        let discipline = Discipline::RoundRobin { quantum };
        discipline.validate()?;
        Ok(discipline)
    }

    /// The round-robin quantum must be a positive time of at least one tick.
    pub fn validate(&self) -> Result<(), SimError> {
        if let Discipline::RoundRobin { quantum } = *self {
            validate_quantum(quantum)?;
            if SimTime::try_from_f64(quantum)?.as_ticks() == 0 {
                return Err(SimError::configuration(format!(
                    "round-robin quantum must be at least one tick (0.0001), got {quantum}"
                )));
            }
        }
        Ok(())
    }

    /// Whether the job in service can be interrupted.
    pub fn with_preemption(&self) -> bool {
        match self {
            Discipline::Fcfs | Discipline::Lcfs => false,
            Discipline::RoundRobin { .. } => true,
            Discipline::Srt { preemptive } | Discipline::Priority { preemptive } => *preemptive,
        }
    }

    /// Service slice length, for round-robin.
    pub fn quantum(&self) -> Option<SimTime> {
        match *self {
            Discipline::RoundRobin { quantum } => SimTime::try_from_f64(quantum).ok(),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Discipline::Fcfs => "fcfs",
            Discipline::Lcfs => "lcfs",
            Discipline::Srt { .. } => "srt",
            Discipline::RoundRobin { .. } => "round_robin",
            Discipline::Priority { .. } => "priority",
        }
    }
}

/// A job waiting for (or returning to) service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedJob {
    pub job: JobId,
    /// Work left to do. For a job that never started, its full service time.
    pub remaining: SimTime,
    pub priority: Priority,
    /// When the job arrived at this server
    pub arrived: SimTime,
}

/// Ordering key for the sorted disciplines. Smaller keys leave first.
#[derive(Debug, Clone, Copy)]
struct Keyed {
    key: (u64, u64, u64),
    entry: QueuedJob,
}

impl PartialEq for Keyed {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Keyed {}

impl PartialOrd for Keyed {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Keyed {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

#[derive(Debug, Clone)]
enum Storage {
    Fifo(VecDeque<QueuedJob>),
    Lifo(Vec<QueuedJob>),
    Sorted(BinaryHeap<Reverse<Keyed>>),
}

/// Jobs waiting at one server, ordered by the server's discipline.
///
/// # Examples
///
/// ```
/// use des_components::queue::{Discipline, QueuedJob, WaitingLine};
/// use des_core::{JobId, SimTime};
///
/// let mut line = WaitingLine::new(Discipline::Lcfs);
/// for (id, size) in [(1, 10), (2, 5), (3, 1)] {
///     line.insert(QueuedJob {
///         job: JobId(id),
///         remaining: SimTime::from_units(size),
///         priority: 0,
///         arrived: SimTime::zero(),
///     });
/// }
/// let (_, first) = line.first_in_line().unwrap();
/// assert_eq!(first, JobId(3));
/// ```
#[derive(Debug, Clone)]
pub struct WaitingLine {
    discipline: Discipline,
    storage: Storage,
    next_seq: u64,
}

impl WaitingLine {
    pub fn new(discipline: Discipline) -> Self {
        let storage = match discipline {
            Discipline::Fcfs | Discipline::RoundRobin { .. } => Storage::Fifo(VecDeque::new()),
            Discipline::Lcfs => Storage::Lifo(Vec::new()),
            Discipline::Srt { .. } | Discipline::Priority { .. } => Storage::Sorted(BinaryHeap::new()),
        };
        Self {
            discipline,
            storage,
            next_seq: 0,
        }
    }

    pub fn discipline(&self) -> Discipline {
        self.discipline
    }

    pub fn with_preemption(&self) -> bool {
        self.discipline.with_preemption()
    }

    pub fn insert(&mut self, entry: QueuedJob) {
        let seq = self.next_seq;
        self.next_seq += 1;
        match &mut self.storage {
            Storage::Fifo(queue) => queue.push_back(entry),
            Storage::Lifo(stack) => stack.push(entry),
            Storage::Sorted(heap) => {
                let key = match self.discipline {
                    Discipline::Priority { .. } => (
                        u64::from(Priority::MAX - entry.priority),
                        entry.arrived.as_ticks(),
                        seq,
                    ),
                    _ => (entry.remaining.as_ticks(), entry.arrived.as_ticks(), seq),
                };
                heap.push(Reverse(Keyed { key, entry }));
            }
        }
    }

    /// Removes the next job to serve, returning its remaining work and id.
    pub fn first_in_line(&mut self) -> Option<(SimTime, JobId)> {
        self.pop().map(|entry| (entry.remaining, entry.job))
    }

    /// Removes the next job to serve.
    pub fn pop(&mut self) -> Option<QueuedJob> {
        match &mut self.storage {
            Storage::Fifo(queue) => queue.pop_front(),
            Storage::Lifo(stack) => stack.pop(),
            Storage::Sorted(heap) => heap.pop().map(|Reverse(keyed)| keyed.entry),
        }
    }

    pub fn len(&self) -> usize {
        match &self.storage {
            Storage::Fifo(queue) => queue.len(),
            Storage::Lifo(stack) => stack.len(),
            Storage::Sorted(heap) => heap.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
