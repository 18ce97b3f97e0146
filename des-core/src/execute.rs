use crate::error::SimError;
use crate::time::SimTime;

/// A simulation that can be advanced one event at a time.
pub trait Step {
    /// Time of the next queued event, if any.
    fn next_event_time(&self) -> Option<SimTime>;

    /// Processes the next event. Returns `Ok(false)` once no events are left.
    fn step(&mut self) -> Result<bool, SimError>;
}

/// Simulation execution trait.
pub trait Execute<S: Step> {
    /// Executes the simulation until some stopping condition is reached.
    /// The condition is implementation-specific.
    fn execute(self, sim: &mut S) -> Result<(), SimError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EndCondition {
    Time(SimTime),
    NoEvents,
    Steps(usize),
}

/// Executor is used for simple execution of an entire simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Executor {
    end_condition: EndCondition,
}

impl Executor {
    /// Simulation will end only once there is no available events in the queue.
    #[must_use]
    pub fn unbound() -> Self {
        Self {
            end_condition: EndCondition::NoEvents,
        }
    }

    /// Simulation processes every event scheduled no later than `time`.
    /// It may terminate early if no events are available.
    #[must_use]
    pub fn timed(time: SimTime) -> Self {
        Self {
            end_condition: EndCondition::Time(time),
        }
    }

    /// Simulation will execute exactly this many steps, unless we run out of events.
    #[must_use]
    pub fn steps(steps: usize) -> Self {
        Self {
            end_condition: EndCondition::Steps(steps),
        }
    }

    /// Registers a side effect that is called _after_ each simulation step.
    #[must_use]
    pub fn side_effect<F>(self, func: F) -> ExecutorWithSideEffect<F> {
        ExecutorWithSideEffect {
            end_condition: self.end_condition,
            side_effect: func,
        }
    }
}

impl<S: Step> Execute<S> for Executor {
    fn execute(self, sim: &mut S) -> Result<(), SimError> {
        run_with(sim, self.end_condition, |_: &S| {})
    }
}

pub struct ExecutorWithSideEffect<F> {
    end_condition: EndCondition,
    side_effect: F,
}

impl<S, F> Execute<S> for ExecutorWithSideEffect<F>
where
    S: Step,
    F: FnMut(&S),
{
    fn execute(self, sim: &mut S) -> Result<(), SimError> {
        run_with(sim, self.end_condition, self.side_effect)
    }
}

fn run_with<S, F>(sim: &mut S, end_condition: EndCondition, mut side_effect: F) -> Result<(), SimError>
where
    S: Step,
    F: FnMut(&S),
{
    let mut step_fn = |sim: &mut S| -> Result<bool, SimError> {
        let result = sim.step()?;
        if result {
            side_effect(sim);
        }
        Ok(result)
    };
    match end_condition {
        EndCondition::Time(time) => execute_until(sim, time, &mut step_fn),
        EndCondition::NoEvents => execute_until_empty(sim, &mut step_fn),
        EndCondition::Steps(steps) => execute_steps(sim, steps, &mut step_fn),
    }
}

fn execute_until_empty<S, F>(sim: &mut S, step: &mut F) -> Result<(), SimError>
where
    F: FnMut(&mut S) -> Result<bool, SimError>,
{
    while step(sim)? {}
    Ok(())
}

fn execute_until<S, F>(sim: &mut S, time: SimTime, step: &mut F) -> Result<(), SimError>
where
    S: Step,
    F: FnMut(&mut S) -> Result<bool, SimError>,
{
    while sim.next_event_time().is_some_and(|t| t <= time) {
        step(sim)?;
    }
    Ok(())
}

fn execute_steps<S, F>(sim: &mut S, steps: usize, step: &mut F) -> Result<(), SimError>
where
    F: FnMut(&mut S) -> Result<bool, SimError>,
{
    for _ in 0..steps {
        if !step(sim)? {
            break;
        }
    }
    Ok(())
}
