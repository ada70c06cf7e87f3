//! Simulation time and the step clock.

use std::fmt;
use std::ops::{Add, Sub};

use crate::id::StepIndex;

/// A point in simulation time: whole seconds since the Unix epoch (UTC).
///
/// Release schedules, forcing frames, and the model clock all use this
/// representation so that step indexing is exact integer arithmetic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SimTime(pub i64);

impl SimTime {
    /// Seconds since the epoch.
    pub fn seconds(self) -> i64 {
        self.0
    }

    /// Seconds since the epoch as a float, for interpolation weights.
    pub fn as_f64(self) -> f64 {
        self.0 as f64
    }
}

impl fmt::Display for SimTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

impl Add<i64> for SimTime {
    type Output = SimTime;

    fn add(self, rhs: i64) -> SimTime {
        SimTime(self.0 + rhs)
    }
}

impl Sub for SimTime {
    type Output = i64;

    fn sub(self, rhs: SimTime) -> i64 {
        self.0 - rhs.0
    }
}

/// Maps step indices to simulation time for a fixed `dt`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Clock {
    start: SimTime,
    dt: i64,
    step: StepIndex,
}

impl Clock {
    /// A clock at step 0. `dt` is in seconds and must be positive;
    /// callers validate it before constructing.
    pub fn new(start: SimTime, dt: i64) -> Self {
        debug_assert!(dt > 0, "clock dt must be positive");
        Self {
            start,
            dt,
            step: StepIndex(0),
        }
    }

    /// The current step.
    pub fn step(&self) -> StepIndex {
        self.step
    }

    /// Timestep length in seconds.
    pub fn dt(&self) -> i64 {
        self.dt
    }

    /// Start of the simulation.
    pub fn start(&self) -> SimTime {
        self.start
    }

    /// Time at the beginning of the current step.
    pub fn now(&self) -> SimTime {
        self.time_of(self.step)
    }

    /// Time at the beginning of `step`.
    pub fn time_of(&self, step: StepIndex) -> SimTime {
        self.start + self.dt * step.0 as i64
    }

    /// The step containing `time` (`floor((time - start) / dt)`),
    /// or `None` when `time` precedes the start.
    pub fn step_of(&self, time: SimTime) -> Option<StepIndex> {
        let elapsed = time - self.start;
        if elapsed < 0 {
            return None;
        }
        Some(StepIndex((elapsed / self.dt) as u64))
    }

    /// Move to the next step.
    pub fn advance(&mut self) {
        self.step = self.step.next();
    }

    /// Jump to an arbitrary step, e.g. when resuming a run.
    pub fn set_step(&mut self, step: StepIndex) {
        self.step = step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn clock_starts_at_step_zero() {
        let clock = Clock::new(SimTime(1_000), 60);
        assert_eq!(clock.step(), StepIndex(0));
        assert_eq!(clock.now(), SimTime(1_000));
    }

    #[test]
    fn advance_moves_by_dt() {
        let mut clock = Clock::new(SimTime(0), 3600);
        clock.advance();
        clock.advance();
        assert_eq!(clock.step(), StepIndex(2));
        assert_eq!(clock.now(), SimTime(7200));
    }

    #[test]
    fn step_of_floors() {
        let clock = Clock::new(SimTime(100), 10);
        assert_eq!(clock.step_of(SimTime(100)), Some(StepIndex(0)));
        assert_eq!(clock.step_of(SimTime(109)), Some(StepIndex(0)));
        assert_eq!(clock.step_of(SimTime(110)), Some(StepIndex(1)));
        assert_eq!(clock.step_of(SimTime(99)), None);
    }

    proptest! {
        #[test]
        fn step_of_time_of_roundtrip(step in 0u64..1_000_000, dt in 1i64..86_400) {
            let clock = Clock::new(SimTime(-5_000), dt);
            let t = clock.time_of(StepIndex(step));
            prop_assert_eq!(clock.step_of(t), Some(StepIndex(step)));
            prop_assert_eq!(clock.step_of(t + (dt - 1)), Some(StepIndex(step)));
        }
    }
}
