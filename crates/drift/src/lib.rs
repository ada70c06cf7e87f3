//! Drift: Lagrangian particle tracking on ocean model grids.
//!
//! This is the top-level facade crate that re-exports the public API from all
//! Drift sub-crates. For most users, adding `drift` as a single dependency is
//! sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use drift::prelude::*;
//! use drift::forcing::{FieldData, MemorySource, Snapshot};
//! use drift::grid::Plane;
//!
//! // A 20×20 grid of 500 m cells, 50 m deep.
//! let grid = SingleGrid::builder(20, 20)
//!     .rectilinear(5.0, 60.0, 0.01, 0.005)
//!     .spacing(500.0, 500.0)
//!     .field("H", Plane::filled(20, 20, 50.0).unwrap())
//!     .build()
//!     .unwrap();
//!
//! // A steady 0.1 m/s eastward current, given as two frames two hours apart.
//! let frame = || {
//!     Snapshot::new()
//!         .with_field("u", FieldData::single(Plane::filled(20, 20, 0.1).unwrap()))
//!         .with_field("v", FieldData::single(Plane::filled(20, 20, 0.0).unwrap()))
//! };
//! let source = MemorySource::new(vec![SimTime(0), SimTime(7200)], vec![frame(), frame()]).unwrap();
//! let mut forcing = SnapshotForcing::new(source, VerticalInterp::Nearest);
//!
//! // Ten particles at grid point (5, 5), 2 m deep, tracked for an hour.
//! let config = ModelConfig::new(SimTime(0), SimTime(3600), 600);
//! let schema = config.tracking_schema([]).unwrap();
//! let rows = vec![ReleaseRow::new(SimTime(0), 10, 5.0, 5.0, 2.0)];
//! let releaser =
//!     ParticleReleaser::new(&config, &ReleaseConfig::default(), &schema, rows).unwrap();
//! let mut state = State::new(config, schema, releaser, None).unwrap();
//! while !state.finished() {
//!     state.update(&grid, &mut forcing).unwrap();
//! }
//!
//! // 0.1 m/s for 3600 s over 500 m cells.
//! assert_eq!(state.len(), 10);
//! assert!((state.population().x()[0] - 5.72).abs() < 1e-9);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `drift-core` | Time, IDs, variable schema, typed columns |
//! | [`grid`] | `drift-grid` | The `Grid` capability, single and nested grids |
//! | [`forcing`] | `drift-forcing` | The `Forcing` capability, snapshot interpolation |
//! | [`engine`] | `drift-engine` | Particle state, release, tracker, behaviour hook |
//! | [`behaviors`] | `drift-behaviors` | Light model, sea lice, age limit |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types (`drift-core`).
///
/// Simulation time and the clock, particle and step identifiers, and the
/// variable schema with its typed columns.
pub use drift_core as types;

/// Model grids (`drift-grid`).
///
/// Provides the [`grid::Grid`] trait and its backends:
/// [`grid::SingleGrid`] and the two-level [`grid::CompositeGrid`].
pub use drift_grid as grid;

/// Environmental forcing (`drift-forcing`).
///
/// The [`forcing::Forcing`] trait and [`forcing::SnapshotForcing`], which
/// interpolates between frames from a [`forcing::SnapshotSource`].
pub use drift_forcing as forcing;

/// The tracking engine (`drift-engine`).
///
/// [`engine::State`] runs the per-step sequence; [`engine::Behavior`] is
/// the extension point for particle biology.
pub use drift_engine as engine;

/// Reference behaviours (`drift-behaviors`).
pub use drift_behaviors as behaviors;

/// Common imports for typical Drift usage.
///
/// ```rust
/// use drift::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use drift_core::{Clock, Column, ParticleId, Schema, SimTime, StepIndex, Value, VariableDef};

    // Grids
    pub use drift_grid::{CompositeGrid, Grid, NestMapping, SingleGrid};

    // Forcing
    pub use drift_forcing::{Forcing, SnapshotForcing, VerticalInterp};

    // Engine
    pub use drift_engine::{
        Advection, Behavior, BehaviorContext, HorizontalBoundary, ModelConfig, OutputFrame,
        ParticleReleaser, ReleaseConfig, ReleaseMode, ReleaseRow, State, StepReport,
    };

    // Errors
    pub use drift_core::SchemaError;
    pub use drift_engine::{BehaviorError, ConfigError, StepError};
    pub use drift_forcing::ForcingError;
    pub use drift_grid::GridError;

    // Behaviours
    pub use drift_behaviors::{MaxAge, SeaLice};
}
