//! Grid trait compliance test helpers.
//!
//! These functions verify that a Grid implementation satisfies the
//! invariants required by the trait contract. Reused by the single and
//! composite backend test modules. Each helper takes a set of sample
//! points known to lie inside the grid's domain.

use crate::grid::Grid;

/// Assert that every sample point is inside the domain.
pub fn assert_points_contained(grid: &dyn Grid, x: &[f64], y: &[f64]) {
    let inside = grid.contains(x, y);
    for (k, ok) in inside.iter().enumerate() {
        assert!(ok, "point {k} at ({}, {}) not contained", x[k], y[k]);
    }
}

/// Assert that `at_sea` never reports a point outside `contains`.
pub fn assert_at_sea_within_domain(grid: &dyn Grid, x: &[f64], y: &[f64]) {
    let inside = grid.contains(x, y);
    let wet = grid.at_sea(x, y);
    assert_eq!(inside.len(), wet.len());
    for k in 0..inside.len() {
        assert!(
            !wet[k] || inside[k],
            "point {k} at sea but outside the domain"
        );
    }
}

/// Assert that every batched query returns one value per point.
pub fn assert_lengths_preserved(grid: &dyn Grid, x: &[f64], y: &[f64]) {
    let n = x.len();
    assert_eq!(grid.contains(x, y).len(), n);
    assert_eq!(grid.at_sea(x, y).len(), n);
    let (lon, lat) = grid.lonlat(x, y).expect("lonlat");
    assert_eq!((lon.len(), lat.len()), (n, n));
    let (dx, dy) = grid.sample_metric(x, y).expect("metric");
    assert_eq!((dx.len(), dy.len()), (n, n));
    assert!(grid.contains(&[], &[]).is_empty());
}

/// Assert that `to_grid(lonlat(p))` recovers `p`.
pub fn assert_lonlat_roundtrip(grid: &dyn Grid, x: &[f64], y: &[f64]) {
    let (lon, lat) = grid.lonlat(x, y).expect("lonlat");
    let (x2, y2) = grid.to_grid(&lon, &lat).expect("to_grid");
    for k in 0..x.len() {
        assert!(
            (x2[k] - x[k]).abs() < 1e-8 && (y2[k] - y[k]).abs() < 1e-8,
            "roundtrip of point {k}: ({}, {}) -> ({}, {})",
            x[k],
            y[k],
            x2[k],
            y2[k]
        );
    }
}

/// Assert that cell sizes are finite and positive inside the domain.
pub fn assert_metric_positive(grid: &dyn Grid, x: &[f64], y: &[f64]) {
    let (dx, dy) = grid.sample_metric(x, y).expect("metric");
    for k in 0..x.len() {
        assert!(
            dx[k].is_finite() && dx[k] > 0.0 && dy[k].is_finite() && dy[k] > 0.0,
            "metric at point {k} = ({}, {})",
            dx[k],
            dy[k]
        );
    }
}

/// Assert that a NaN position is outside the domain and not at sea.
pub fn assert_nan_outside(grid: &dyn Grid) {
    assert_eq!(grid.contains(&[f64::NAN], &[0.0]), vec![false]);
    assert_eq!(grid.at_sea(&[0.0], &[f64::NAN]), vec![false]);
}

/// Run all compliance checks on a grid.
pub fn run_full_compliance(grid: &dyn Grid, x: &[f64], y: &[f64]) {
    assert_points_contained(grid, x, y);
    assert_at_sea_within_domain(grid, x, y);
    assert_lengths_preserved(grid, x, y);
    assert_lonlat_roundtrip(grid, x, y);
    assert_metric_positive(grid, x, y);
    assert_nan_outside(grid);
}
