//! Strongly-typed identifiers.

use std::fmt;

/// Permanent identifier of a released particle.
///
/// Assigned from a monotonically increasing counter at release time and
/// never reused, even after the particle has been removed from the live
/// population.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticleId(pub u64);

impl fmt::Display for ParticleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ParticleId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Index of a simulation timestep, counted from the start time.
///
/// Step `n` covers the interval `[start + n*dt, start + (n+1)*dt)`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StepIndex(pub u64);

impl StepIndex {
    /// The step after this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for StepIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for StepIndex {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
