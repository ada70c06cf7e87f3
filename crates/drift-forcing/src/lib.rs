//! Forcing fields for the Drift particle-tracking model.
//!
//! A [`Forcing`] answers space/time interpolated queries of externally
//! supplied, time-varying fields (currents, temperature, salinity).
//! [`SnapshotForcing`] implements it over a record of [`Snapshot`]s
//! produced by a [`SnapshotSource`], keeping only the two frames that
//! bracket the current time in memory.
//!
//! Spatial interpolation is delegated to the [`Grid`](drift_grid::Grid)
//! passed to each query, so the same forcing works on a single grid and
//! on a composite grid. A field on a composite grid stores one
//! [`Plane`](drift_grid::Plane) per leaf grid at every level.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod forcing;
pub mod snapshot;
pub mod source;
pub mod vertical;

pub use error::ForcingError;
pub use forcing::{Forcing, SnapshotForcing};
pub use snapshot::{FieldData, Snapshot};
pub use source::{MemorySource, SnapshotSource};
pub use vertical::VerticalInterp;
