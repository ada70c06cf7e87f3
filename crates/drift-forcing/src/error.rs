//! Error types for forcing records and queries.

use std::error::Error;
use std::fmt;

use drift_core::SimTime;
use drift_grid::GridError;

/// Errors arising from forcing construction, frame loading, or sampling.
#[derive(Clone, Debug, PartialEq)]
pub enum ForcingError {
    /// A time lies outside the range the forcing can serve: `advance`
    /// needs a frame after `now`, `sample` accepts any time from the
    /// first frame to the last.
    TimeOutOfRange {
        /// The requested time, in seconds since the epoch.
        time: f64,
        /// Start of the servable range.
        start: SimTime,
        /// End of the servable range.
        end: SimTime,
    },
    /// The record has no frames.
    EmptyRecord,
    /// Frame times are not strictly increasing.
    NonMonotonicRecord {
        /// Index of the first frame not later than its predecessor.
        index: usize,
    },
    /// Frame times and frames differ in number.
    FrameCount {
        /// Number of frame times.
        times: usize,
        /// Number of frames.
        frames: usize,
    },
    /// The requested field is absent from a loaded snapshot.
    UnknownField {
        /// The requested field name.
        name: String,
    },
    /// A field's level count matches neither a 2-D field nor the
    /// configured depth levels.
    LayerMismatch {
        /// The field name.
        field: String,
        /// Configured depth levels.
        expected: usize,
        /// Levels present in the snapshot.
        found: usize,
    },
    /// Depth levels are empty, non-finite, or not strictly increasing.
    InvalidDepths {
        /// What went wrong.
        reason: String,
    },
    /// `sample` was called before any successful `advance`.
    NotAdvanced,
    /// Coordinate slices of a query differ in length.
    LengthMismatch {
        /// Number of points in the horizontal slices.
        points: usize,
        /// Number of depths supplied.
        depths: usize,
    },
    /// Spatial interpolation failed.
    Grid(GridError),
    /// The snapshot source could not produce a frame.
    Load {
        /// Loader-supplied description.
        reason: String,
    },
}

impl fmt::Display for ForcingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimeOutOfRange { time, start, end } => {
                write!(f, "time {time}s outside forcing range [{start}, {end}]")
            }
            Self::EmptyRecord => write!(f, "forcing record has no frames"),
            Self::NonMonotonicRecord { index } => {
                write!(f, "forcing frame {index} is not later than frame {}", index.saturating_sub(1))
            }
            Self::FrameCount { times, frames } => {
                write!(f, "{times} frame times but {frames} frames")
            }
            Self::UnknownField { name } => write!(f, "unknown forcing field '{name}'"),
            Self::LayerMismatch {
                field,
                expected,
                found,
            } => write!(
                f,
                "field '{field}' has {found} levels, expected 1 or {expected}"
            ),
            Self::InvalidDepths { reason } => write!(f, "invalid depth levels: {reason}"),
            Self::NotAdvanced => write!(f, "forcing sampled before advance"),
            Self::LengthMismatch { points, depths } => {
                write!(f, "{points} horizontal points but {depths} depths")
            }
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Load { reason } => write!(f, "failed to load forcing frame: {reason}"),
        }
    }
}

impl Error for ForcingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<GridError> for ForcingError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}
