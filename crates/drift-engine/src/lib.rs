//! Particle-tracking engine for the Drift model.
//!
//! [`State`] owns the live particle arrays and runs the fixed per-step
//! sequence: release ([`ParticleReleaser`]), advection and diffusion
//! ([`Tracker`]), the optional [`Behavior`] capability, boundary policy,
//! derived geographic positions, and compaction. Grids and forcing are
//! reached only through the [`Grid`](drift_grid::Grid) and
//! [`Forcing`](drift_forcing::Forcing) capability traits.
//!
//! All configuration arrives as an explicit [`ModelConfig`] value; the
//! crate keeps no global state and logs through `tracing` without
//! installing a subscriber.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod behavior;
pub mod config;
pub mod error;
pub mod particles;
pub mod population;
pub mod release;
pub mod state;
pub mod tracker;

pub use behavior::{Behavior, BehaviorContext, BehaviorError, NoBehavior};
pub use config::{Advection, ConfigError, HorizontalBoundary, ModelConfig};
pub use error::{BatchError, StepError};
pub use particles::ParticleTable;
pub use population::Population;
pub use release::{
    ParticleReleaser, ReleaseBatch, ReleaseConfig, ReleaseMode, ReleaseRow, ReleaseWarning,
};
pub use state::{OutputFrame, State, StepReport};
pub use tracker::{box_muller, Tracker};
