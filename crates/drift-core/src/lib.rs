//! Core types for the Drift particle-tracking model.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by grids, forcing, and the engine: particle and
//! step identifiers, simulation time, the particle variable schema, and
//! the typed columns that hold per-particle values.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod column;
pub mod error;
pub mod id;
pub mod time;
pub mod variable;

pub use column::{Column, ColumnType, Value};
pub use error::{ColumnError, SchemaError};
pub use id::{ParticleId, StepIndex};
pub use time::{Clock, SimTime};
pub use variable::{Schema, VariableDef, VariableKind};
