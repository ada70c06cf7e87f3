//! Errors raised while appending batches or stepping the model.

use std::error::Error;
use std::fmt;

use drift_core::{ColumnError, ParticleId};
use drift_forcing::ForcingError;
use drift_grid::GridError;

use crate::behavior::BehaviorError;

/// A release batch could not be merged into the particle arrays.
#[derive(Clone, Debug, PartialEq)]
pub enum BatchError {
    /// A column's length differs from the batch's pid count.
    Length {
        /// Column name.
        name: String,
        /// Number of pids in the batch.
        expected: usize,
        /// Column length.
        found: usize,
    },
    /// A column names no variable of the receiving table.
    UnknownVariable {
        /// Column name.
        name: String,
    },
    /// A column's element type differs from the variable's.
    Column {
        /// Column name.
        name: String,
        /// The type mismatch.
        source: ColumnError,
    },
    /// Batch pids do not continue the particle table's pid sequence.
    PidSequence {
        /// The pid the table expected next.
        expected: ParticleId,
        /// The pid the batch supplied.
        found: ParticleId,
    },
}

impl fmt::Display for BatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Length {
                name,
                expected,
                found,
            } => write!(f, "batch column '{name}' has {found} values for {expected} particles"),
            Self::UnknownVariable { name } => write!(f, "batch column '{name}' is not declared"),
            Self::Column { name, source } => write!(f, "batch column '{name}': {source}"),
            Self::PidSequence { expected, found } => {
                write!(f, "batch starts at pid {found}, expected {expected}")
            }
        }
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Column { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Errors from [`State::update`](crate::State::update).
///
/// Boundary and mortality handling never produce errors; these are
/// failures of collaborators or broken internal invariants.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A grid query failed (e.g. a composite-grid domain error).
    Grid(GridError),
    /// A forcing query failed (e.g. time outside the record).
    Forcing(ForcingError),
    /// The behaviour capability failed.
    Behavior(BehaviorError),
    /// A release batch could not be appended.
    Batch(BatchError),
    /// Particle arrays lost alignment.
    Invariant {
        /// Description of the violation.
        reason: String,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Forcing(e) => write!(f, "forcing: {e}"),
            Self::Behavior(e) => write!(f, "behavior: {e}"),
            Self::Batch(e) => write!(f, "release batch: {e}"),
            Self::Invariant { reason } => write!(f, "state invariant violated: {reason}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            Self::Forcing(e) => Some(e),
            Self::Behavior(e) => Some(e),
            Self::Batch(e) => Some(e),
            Self::Invariant { .. } => None,
        }
    }
}

impl From<GridError> for StepError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

impl From<ForcingError> for StepError {
    fn from(e: ForcingError) -> Self {
        Self::Forcing(e)
    }
}

impl From<BehaviorError> for StepError {
    fn from(e: BehaviorError) -> Self {
        Self::Behavior(e)
    }
}

impl From<BatchError> for StepError {
    fn from(e: BatchError) -> Self {
        Self::Batch(e)
    }
}
