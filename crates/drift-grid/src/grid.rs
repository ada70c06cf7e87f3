//! The core `Grid` trait.

use crate::error::GridError;
use crate::plane::Plane;

/// Capability contract for horizontal grids.
///
/// The tracker, forcing, and state reach geometry and static fields only
/// through this trait, so a [`SingleGrid`](crate::SingleGrid) and a
/// [`CompositeGrid`](crate::CompositeGrid) are interchangeable.
///
/// # Batching
///
/// Every query takes parallel `x` / `y` slices and returns values in
/// the same order. Mismatched slice lengths are an error for fallible
/// queries; infallible masks cover the shorter slice.
///
/// # NaN
///
/// NaN coordinates are never an error: they produce NaN values and
/// `false` masks, so an upstream defect surfaces to the caller.
///
/// # Thread Safety
///
/// `Sync` is required so one grid can be shared by reference across
/// worker threads processing disjoint particle batches.
pub trait Grid: Send + Sync + 'static {
    /// Number of leaf grids, i.e. how many planes a field defined on
    /// this grid has. `1` for a single grid.
    fn leaf_count(&self) -> usize;

    /// Geographic `(lon, lat)` to grid coordinates. Points that cannot
    /// be located yield NaN on a single grid.
    fn to_grid(&self, lon: &[f64], lat: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError>;

    /// Grid coordinates to geographic `(lon, lat)`.
    fn lonlat(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError>;

    /// Domain test with a half-cell outward margin around the outermost
    /// nodes, tolerating interpolation overshoot at the boundary.
    fn contains(&self, x: &[f64], y: &[f64]) -> Vec<bool>;

    /// `true` where a point is inside the domain and over water.
    ///
    /// Grids without a land mask treat the whole domain as water.
    fn at_sea(&self, x: &[f64], y: &[f64]) -> Vec<bool> {
        self.contains(x, y)
    }

    /// Returns `true` if a static field with this name is defined.
    fn has_field(&self, name: &str) -> bool;

    /// Interpolated sample of a static field (e.g. bathymetry `"H"`).
    ///
    /// Behavior for points outside [`contains`](Self::contains) is
    /// backend-defined; callers pre-filter.
    fn sample_scalar_field(&self, name: &str, x: &[f64], y: &[f64])
        -> Result<Vec<f64>, GridError>;

    /// Cell sizes `(dx, dy)` in metres per unit of this grid's X and Y.
    fn sample_metric(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError>;

    /// Interpolated sample of a field given as one plane per leaf grid,
    /// in this grid's leaf order. `planes.len()` must equal
    /// [`leaf_count`](Self::leaf_count).
    fn sample_planes(&self, planes: &[Plane], x: &[f64], y: &[f64])
        -> Result<Vec<f64>, GridError>;
}
