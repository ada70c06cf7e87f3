//! A fine grid embedded in a coarse background grid.

use smallvec::SmallVec;
use std::fmt;

use crate::error::{check_lengths, GridError};
use crate::grid::Grid;
use crate::plane::Plane;

/// Fixed integer relation between a fine grid and the coarse grid it is
/// nested in: fine index `X = scale * Xc + offset_x`, and likewise for Y.
///
/// Coarse node `(ic, jc)` therefore coincides with fine node
/// `(scale*ic + offset_x, scale*jc + offset_y)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct NestMapping {
    /// Fine cells per coarse cell along each axis. At least 1.
    pub scale: u32,
    /// Fine X index of coarse node column 0.
    pub offset_x: i64,
    /// Fine Y index of coarse node row 0.
    pub offset_y: i64,
}

impl NestMapping {
    /// Create a mapping, rejecting `scale == 0`.
    pub fn new(scale: u32, offset_x: i64, offset_y: i64) -> Result<Self, GridError> {
        if scale == 0 {
            return Err(GridError::InvalidNesting {
                reason: "scale must be at least 1".to_string(),
            });
        }
        Ok(Self {
            scale,
            offset_x,
            offset_y,
        })
    }

    /// Composite (fine) coordinates to coarse-grid coordinates.
    pub fn to_coarse(&self, x: f64, y: f64) -> (f64, f64) {
        let s = f64::from(self.scale);
        (
            (x - self.offset_x as f64) / s,
            (y - self.offset_y as f64) / s,
        )
    }

    /// Coarse-grid coordinates to composite (fine) coordinates.
    pub fn from_coarse(&self, xc: f64, yc: f64) -> (f64, f64) {
        let s = f64::from(self.scale);
        (
            s * xc + self.offset_x as f64,
            s * yc + self.offset_y as f64,
        )
    }
}

/// Which leaf a query point is served by.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Leaf {
    Fine,
    Coarse,
    Neither,
}

/// Query points split by leaf, with the input index of each.
///
/// Coarse coordinates are already mapped into the coarse grid's frame.
#[derive(Default)]
struct Partition {
    fine_idx: SmallVec<[usize; 16]>,
    fine_x: Vec<f64>,
    fine_y: Vec<f64>,
    coarse_idx: SmallVec<[usize; 16]>,
    coarse_x: Vec<f64>,
    coarse_y: Vec<f64>,
}

/// Write `values[k]` to `out[idx[k]]`.
fn scatter(out: &mut [f64], idx: &[usize], values: &[f64]) {
    for (&i, &v) in idx.iter().zip(values) {
        out[i] = v;
    }
}

/// A composite of two grids: a fine grid covering part of the domain,
/// nested at a fixed integer ratio inside a coarse grid covering all
/// of it.
///
/// # Coordinate frame
///
/// The composite uses the fine grid's index frame throughout: composite
/// `(X, Y)` equals fine-local `(X, Y)`, and the coarse grid is reached
/// through [`NestMapping::to_coarse`]. Cell sizes reported by
/// [`sample_metric`](Grid::sample_metric) are therefore metres per
/// fine-grid unit everywhere; coarse cell sizes are divided by `scale`.
///
/// # Routing
///
/// A point is served by the fine grid when the fine grid
/// [`contains`](Grid::contains) it (inclusive of its half-cell margin, so
/// points on the shared boundary go to the fine grid), and otherwise by
/// the coarse grid. A finite point in neither grid is a
/// [`GridError::Domain`] error; NaN points give NaN values.
///
/// # Leaf order
///
/// Per-leaf plane sets list the fine grid's planes first, then the
/// coarse grid's.
pub struct CompositeGrid {
    fine: Box<dyn Grid>,
    coarse: Box<dyn Grid>,
    nest: NestMapping,
}

impl fmt::Debug for CompositeGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeGrid")
            .field("fine_leaves", &self.fine.leaf_count())
            .field("coarse_leaves", &self.coarse.leaf_count())
            .field("nest", &self.nest)
            .finish()
    }
}

impl CompositeGrid {
    /// Nest `fine` inside `coarse`.
    ///
    /// Returns `Err(GridError::InvalidNesting)` if a fine-grid point at
    /// the fine origin does not map into the coarse domain.
    pub fn new(
        fine: Box<dyn Grid>,
        coarse: Box<dyn Grid>,
        nest: NestMapping,
    ) -> Result<Self, GridError> {
        let (xc, yc) = nest.to_coarse(0.0, 0.0);
        if !coarse.contains(&[xc], &[yc])[0] {
            return Err(GridError::InvalidNesting {
                reason: format!(
                    "fine origin maps to coarse ({xc}, {yc}), outside the coarse grid"
                ),
            });
        }
        Ok(Self { fine, coarse, nest })
    }

    /// The nesting relation.
    pub fn nest(&self) -> NestMapping {
        self.nest
    }

    /// The embedded fine grid.
    pub fn fine(&self) -> &dyn Grid {
        self.fine.as_ref()
    }

    /// The background coarse grid.
    pub fn coarse(&self) -> &dyn Grid {
        self.coarse.as_ref()
    }

    fn route(&self, x: &[f64], y: &[f64]) -> Vec<Leaf> {
        let in_fine = self.fine.contains(x, y);
        let (cx, cy): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y)
            .map(|(&xi, &yi)| self.nest.to_coarse(xi, yi))
            .unzip();
        let in_coarse = self.coarse.contains(&cx, &cy);
        in_fine
            .into_iter()
            .zip(in_coarse)
            .map(|(f, c)| match (f, c) {
                (true, _) => Leaf::Fine,
                (false, true) => Leaf::Coarse,
                (false, false) => Leaf::Neither,
            })
            .collect()
    }

    /// Split a batch by leaf. Finite points in neither leaf are errors;
    /// NaN points are dropped and left as NaN by the caller.
    fn partition(&self, x: &[f64], y: &[f64]) -> Result<Partition, GridError> {
        check_lengths(x, y)?;
        let mut part = Partition::default();
        for (k, leaf) in self.route(x, y).into_iter().enumerate() {
            match leaf {
                Leaf::Fine => {
                    part.fine_idx.push(k);
                    part.fine_x.push(x[k]);
                    part.fine_y.push(y[k]);
                }
                Leaf::Coarse => {
                    let (xc, yc) = self.nest.to_coarse(x[k], y[k]);
                    part.coarse_idx.push(k);
                    part.coarse_x.push(xc);
                    part.coarse_y.push(yc);
                }
                Leaf::Neither => {
                    if !x[k].is_nan() && !y[k].is_nan() {
                        return Err(GridError::Domain {
                            index: k,
                            x: x[k],
                            y: y[k],
                        });
                    }
                }
            }
        }
        Ok(part)
    }

    /// Evaluate a per-leaf scalar query and merge the results.
    fn gather<F, C>(&self, x: &[f64], y: &[f64], fine: F, coarse: C) -> Result<Vec<f64>, GridError>
    where
        F: FnOnce(&[f64], &[f64]) -> Result<Vec<f64>, GridError>,
        C: FnOnce(&[f64], &[f64]) -> Result<Vec<f64>, GridError>,
    {
        let part = self.partition(x, y)?;
        let mut out = vec![f64::NAN; x.len()];
        if !part.fine_idx.is_empty() {
            scatter(&mut out, &part.fine_idx, &fine(&part.fine_x, &part.fine_y)?);
        }
        if !part.coarse_idx.is_empty() {
            scatter(
                &mut out,
                &part.coarse_idx,
                &coarse(&part.coarse_x, &part.coarse_y)?,
            );
        }
        Ok(out)
    }
}

impl Grid for CompositeGrid {
    fn leaf_count(&self) -> usize {
        self.fine.leaf_count() + self.coarse.leaf_count()
    }

    fn to_grid(&self, lon: &[f64], lat: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError> {
        check_lengths(lon, lat)?;
        let (mut x, mut y) = self.fine.to_grid(lon, lat)?;

        let missing: Vec<usize> = (0..x.len())
            .filter(|&k| x[k].is_nan() || y[k].is_nan())
            .collect();
        if missing.is_empty() {
            return Ok((x, y));
        }
        let sub_lon: Vec<f64> = missing.iter().map(|&k| lon[k]).collect();
        let sub_lat: Vec<f64> = missing.iter().map(|&k| lat[k]).collect();
        let (xc, yc) = self.coarse.to_grid(&sub_lon, &sub_lat)?;

        for (m, &k) in missing.iter().enumerate() {
            if xc[m].is_nan() || yc[m].is_nan() {
                if lon[k].is_nan() || lat[k].is_nan() {
                    continue;
                }
                return Err(GridError::Domain {
                    index: k,
                    x: lon[k],
                    y: lat[k],
                });
            }
            let (xf, yf) = self.nest.from_coarse(xc[m], yc[m]);
            x[k] = xf;
            y[k] = yf;
        }
        Ok((x, y))
    }

    fn lonlat(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError> {
        let part = self.partition(x, y)?;
        let mut lon = vec![f64::NAN; x.len()];
        let mut lat = vec![f64::NAN; x.len()];
        if !part.fine_idx.is_empty() {
            let (lo, la) = self.fine.lonlat(&part.fine_x, &part.fine_y)?;
            scatter(&mut lon, &part.fine_idx, &lo);
            scatter(&mut lat, &part.fine_idx, &la);
        }
        if !part.coarse_idx.is_empty() {
            let (lo, la) = self.coarse.lonlat(&part.coarse_x, &part.coarse_y)?;
            scatter(&mut lon, &part.coarse_idx, &lo);
            scatter(&mut lat, &part.coarse_idx, &la);
        }
        Ok((lon, lat))
    }

    fn contains(&self, x: &[f64], y: &[f64]) -> Vec<bool> {
        self.route(x, y)
            .into_iter()
            .map(|leaf| leaf != Leaf::Neither)
            .collect()
    }

    fn at_sea(&self, x: &[f64], y: &[f64]) -> Vec<bool> {
        let n = x.len().min(y.len());
        let (x, y) = (&x[..n], &y[..n]);
        let mut wet = vec![false; n];
        let Ok(part) = self.partition(x, y) else {
            // Some point is off both grids; answer point by point.
            return self
                .route(x, y)
                .into_iter()
                .enumerate()
                .map(|(k, leaf)| match leaf {
                    Leaf::Fine => self.fine.at_sea(&x[k..=k], &y[k..=k])[0],
                    Leaf::Coarse => {
                        let (xc, yc) = self.nest.to_coarse(x[k], y[k]);
                        self.coarse.at_sea(&[xc], &[yc])[0]
                    }
                    Leaf::Neither => false,
                })
                .collect();
        };
        for (&k, v) in part
            .fine_idx
            .iter()
            .zip(self.fine.at_sea(&part.fine_x, &part.fine_y))
        {
            wet[k] = v;
        }
        for (&k, v) in part
            .coarse_idx
            .iter()
            .zip(self.coarse.at_sea(&part.coarse_x, &part.coarse_y))
        {
            wet[k] = v;
        }
        wet
    }

    fn has_field(&self, name: &str) -> bool {
        self.fine.has_field(name) && self.coarse.has_field(name)
    }

    fn sample_scalar_field(
        &self,
        name: &str,
        x: &[f64],
        y: &[f64],
    ) -> Result<Vec<f64>, GridError> {
        self.gather(
            x,
            y,
            |fx, fy| self.fine.sample_scalar_field(name, fx, fy),
            |cx, cy| self.coarse.sample_scalar_field(name, cx, cy),
        )
    }

    fn sample_metric(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError> {
        let part = self.partition(x, y)?;
        let mut dx = vec![f64::NAN; x.len()];
        let mut dy = vec![f64::NAN; x.len()];
        if !part.fine_idx.is_empty() {
            let (fdx, fdy) = self.fine.sample_metric(&part.fine_x, &part.fine_y)?;
            scatter(&mut dx, &part.fine_idx, &fdx);
            scatter(&mut dy, &part.fine_idx, &fdy);
        }
        if !part.coarse_idx.is_empty() {
            let s = f64::from(self.nest.scale);
            let (cdx, cdy) = self.coarse.sample_metric(&part.coarse_x, &part.coarse_y)?;
            let cdx: Vec<f64> = cdx.into_iter().map(|d| d / s).collect();
            let cdy: Vec<f64> = cdy.into_iter().map(|d| d / s).collect();
            scatter(&mut dx, &part.coarse_idx, &cdx);
            scatter(&mut dy, &part.coarse_idx, &cdy);
        }
        Ok((dx, dy))
    }

    fn sample_planes(
        &self,
        planes: &[Plane],
        x: &[f64],
        y: &[f64],
    ) -> Result<Vec<f64>, GridError> {
        if planes.len() != self.leaf_count() {
            return Err(GridError::LeafCount {
                expected: self.leaf_count(),
                found: planes.len(),
            });
        }
        let (fine_planes, coarse_planes) = planes.split_at(self.fine.leaf_count());
        self.gather(
            x,
            y,
            |fx, fy| self.fine.sample_planes(fine_planes, fx, fy),
            |cx, cy| self.coarse.sample_planes(coarse_planes, cx, cy),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compliance;
    use crate::single::SingleGrid;

    /// Coarse: 10x10 at 0.1 deg, 3000 m cells. Fine: 13x13 at 0.0333 deg,
    /// 1000 m cells, nested at scale 3 with coarse node (2, 2) at fine
    /// node (0, 0).
    fn nested() -> CompositeGrid {
        let coarse = SingleGrid::builder(10, 10)
            .rectilinear(0.0, 60.0, 0.3, 0.3)
            .spacing(3000.0, 3000.0)
            .field("H", Plane::filled(10, 10, 100.0).unwrap())
            .build()
            .unwrap();
        let fine = SingleGrid::builder(13, 13)
            .rectilinear(0.6, 60.6, 0.1, 0.1)
            .spacing(1000.0, 1000.0)
            .field("H", Plane::filled(13, 13, 20.0).unwrap())
            .build()
            .unwrap();
        CompositeGrid::new(
            Box::new(fine),
            Box::new(coarse),
            NestMapping::new(3, -6, -6).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn mapping_roundtrip() {
        let m = NestMapping::new(3, -6, -6).unwrap();
        assert_eq!(m.to_coarse(0.0, 0.0), (2.0, 2.0));
        assert_eq!(m.from_coarse(2.0, 2.0), (0.0, 0.0));
        assert_eq!(m.to_coarse(12.0, 3.0), (6.0, 3.0));
    }

    #[test]
    fn zero_scale_rejected() {
        assert!(matches!(
            NestMapping::new(0, 0, 0),
            Err(GridError::InvalidNesting { .. })
        ));
    }

    #[test]
    fn leaf_count_sums() {
        assert_eq!(nested().leaf_count(), 2);
    }

    #[test]
    fn fine_wins_inside_fine_domain() {
        let g = nested();
        let h = g
            .sample_scalar_field("H", &[4.0, 12.5, -3.0, 20.0], &[4.0, 12.5, 0.0, 4.0])
            .unwrap();
        assert_eq!(h, vec![20.0, 20.0, 100.0, 100.0]);
    }

    #[test]
    fn point_off_both_grids_is_domain_error() {
        let g = nested();
        let err = g
            .sample_scalar_field("H", &[1.0, 40.0], &[1.0, 1.0])
            .unwrap_err();
        assert!(matches!(err, GridError::Domain { index: 1, .. }));
        assert_eq!(g.contains(&[1.0, 40.0], &[1.0, 1.0]), vec![true, false]);
    }

    #[test]
    fn nan_point_samples_nan() {
        let g = nested();
        let h = g
            .sample_scalar_field("H", &[f64::NAN, 1.0], &[1.0, 1.0])
            .unwrap();
        assert!(h[0].is_nan());
        assert_eq!(h[1], 20.0);
    }

    #[test]
    fn coarse_metric_in_fine_units() {
        let g = nested();
        let (dx, dy) = g.sample_metric(&[2.0, -4.0], &[2.0, -4.0]).unwrap();
        assert_eq!(dx, vec![1000.0, 1000.0]);
        assert_eq!(dy, vec![1000.0, 1000.0]);
    }

    #[test]
    fn lonlat_agrees_across_the_nest() {
        let g = nested();
        let (lon, lat) = g.lonlat(&[0.0, -3.0], &[0.0, -6.0]).unwrap();
        assert!((lon[0] - 0.6).abs() < 1e-12 && (lat[0] - 60.6).abs() < 1e-12);
        assert!((lon[1] - 0.3).abs() < 1e-12 && (lat[1] - 60.0).abs() < 1e-12);
    }

    #[test]
    fn to_grid_falls_back_to_coarse() {
        let g = nested();
        let (x, y) = g.to_grid(&[0.3, 1.2], &[60.0, 61.2]).unwrap();
        assert!((x[0] + 3.0).abs() < 1e-8 && (y[0] + 6.0).abs() < 1e-8);
        assert!((x[1] - 6.0).abs() < 1e-8 && (y[1] - 6.0).abs() < 1e-8);
    }

    #[test]
    fn to_grid_off_both_is_error() {
        let g = nested();
        assert!(matches!(
            g.to_grid(&[50.0], &[60.0]),
            Err(GridError::Domain { index: 0, .. })
        ));
    }

    #[test]
    fn planes_split_by_leaf() {
        let g = nested();
        let planes = [
            Plane::filled(13, 13, 1.0).unwrap(),
            Plane::filled(10, 10, 2.0).unwrap(),
        ];
        let v = g.sample_planes(&planes, &[3.0, -5.0], &[3.0, 3.0]).unwrap();
        assert_eq!(v, vec![1.0, 2.0]);
        let err = g.sample_planes(&planes[..1], &[3.0], &[3.0]).unwrap_err();
        assert_eq!(
            err,
            GridError::LeafCount {
                expected: 2,
                found: 1
            }
        );
    }

    #[test]
    fn nest_outside_coarse_rejected() {
        let coarse = SingleGrid::builder(4, 4)
            .rectilinear(0.0, 0.0, 1.0, 1.0)
            .build()
            .unwrap();
        let fine = SingleGrid::builder(4, 4)
            .rectilinear(0.0, 0.0, 0.5, 0.5)
            .build()
            .unwrap();
        let err = CompositeGrid::new(
            Box::new(fine),
            Box::new(coarse),
            NestMapping::new(2, -40, 0).unwrap(),
        )
        .unwrap_err();
        assert!(matches!(err, GridError::InvalidNesting { .. }));
    }

    #[test]
    fn compliance() {
        let g = nested();
        let x = [0.0, 6.0, 12.5, -5.0, 20.0, -0.5];
        let y = [0.0, 3.0, 12.5, -5.0, 1.0, 14.0];
        compliance::run_full_compliance(&g, &x, &y);
    }
}
