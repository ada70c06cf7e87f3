//! Reference behaviours for the Drift particle tracker.
//!
//! Each type implements [`drift_engine::Behavior`] and declares the
//! instance variables it reads and writes:
//!
//! - [`SeaLice`]: mortality, degree-day ageing, and light- and
//!   salinity-driven vertical swimming of planktonic salmon lice
//! - [`MaxAge`]: removes particles older than a limit
//!
//! [`surface_light`] is the irradiance model [`SeaLice`] swims by.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod age;
pub mod lice;
pub mod light;

pub use age::MaxAge;
pub use lice::{SeaLice, SeaLiceBuilder, AGE, SUPER};
pub use light::surface_light;
