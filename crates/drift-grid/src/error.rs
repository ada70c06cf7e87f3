//! Error types for grid construction and queries.

use std::fmt;

/// Errors arising from grid construction or point queries.
#[derive(Clone, Debug, PartialEq)]
pub enum GridError {
    /// A query point lies in no grid of a composite (the union of the
    /// sub-grids is assumed to cover every legal point).
    Domain {
        /// Position of the point in the query batch.
        index: usize,
        /// First query coordinate (X, or longitude for `to_grid`).
        x: f64,
        /// Second query coordinate (Y, or latitude for `to_grid`).
        y: f64,
    },
    /// No static field with this name is defined on the grid.
    UnknownField {
        /// The requested field name.
        name: String,
    },
    /// A plane's shape does not match the grid's node layout.
    ShapeMismatch {
        /// What the plane was for.
        name: String,
        /// Expected `(nx, ny)`.
        expected: (usize, usize),
        /// Supplied `(nx, ny)`.
        found: (usize, usize),
    },
    /// Plane data length differs from `nx * ny`.
    DataLength {
        /// `nx * ny`.
        expected: usize,
        /// Length of the supplied data.
        found: usize,
    },
    /// Attempted to build a grid or plane with zero nodes.
    EmptyGrid,
    /// The `x` and `y` slices of a query have different lengths.
    LengthMismatch {
        /// Length of the `x` slice.
        x: usize,
        /// Length of the `y` slice.
        y: usize,
    },
    /// A per-leaf plane set has the wrong number of planes.
    LeafCount {
        /// Planes the grid needs.
        expected: usize,
        /// Planes supplied.
        found: usize,
    },
    /// Geographic coordinates were not supplied to a grid builder.
    MissingCoordinates,
    /// Cell sizes must be finite and positive.
    InvalidMetric {
        /// What went wrong.
        reason: String,
    },
    /// A nesting description is invalid.
    InvalidNesting {
        /// What went wrong.
        reason: String,
    },
}

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain { index, x, y } => {
                write!(f, "point {index} at ({x}, {y}) lies in no sub-grid")
            }
            Self::UnknownField { name } => write!(f, "unknown grid field '{name}'"),
            Self::ShapeMismatch {
                name,
                expected,
                found,
            } => write!(
                f,
                "plane '{name}' has shape {}x{}, grid expects {}x{}",
                found.0, found.1, expected.0, expected.1
            ),
            Self::DataLength { expected, found } => {
                write!(f, "plane data has {found} values, expected {expected}")
            }
            Self::EmptyGrid => write!(f, "grid must have at least one node"),
            Self::LengthMismatch { x, y } => {
                write!(f, "coordinate slices differ in length: x={x}, y={y}")
            }
            Self::LeafCount { expected, found } => {
                write!(f, "expected {expected} planes (one per leaf grid), got {found}")
            }
            Self::MissingCoordinates => write!(f, "grid builder needs lon/lat coordinates"),
            Self::InvalidMetric { reason } => write!(f, "invalid metric: {reason}"),
            Self::InvalidNesting { reason } => write!(f, "invalid nesting: {reason}"),
        }
    }
}

impl std::error::Error for GridError {}

/// Reject query batches whose coordinate slices differ in length.
pub(crate) fn check_lengths(x: &[f64], y: &[f64]) -> Result<(), GridError> {
    if x.len() != y.len() {
        return Err(GridError::LengthMismatch {
            x: x.len(),
            y: y.len(),
        });
    }
    Ok(())
}
