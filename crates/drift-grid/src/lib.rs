//! Grids for the Drift particle-tracking model.
//!
//! This crate defines the [`Grid`] trait, through which the tracker,
//! forcing, and state query geometry and static fields, along with two
//! backends:
//!
//! - [`SingleGrid`]: one logically rectangular curvilinear grid.
//! - [`CompositeGrid`]: an embedded fine grid inside a coarse background
//!   grid, related by a fixed integer [`NestMapping`].
//!
//! All coordinates are continuous grid-index coordinates `(X, Y)`; node
//! `(i, j)` sits at `X = i, Y = j`. Queries are batched: every method
//! takes parallel `x` / `y` slices and returns one result per point in
//! the same order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod composite;
pub mod error;
pub mod grid;
pub mod plane;
pub mod single;

#[cfg(test)]
pub(crate) mod compliance;

pub use composite::{CompositeGrid, NestMapping};
pub use error::GridError;
pub use grid::Grid;
pub use plane::Plane;
pub use single::{SingleGrid, SingleGridBuilder};
