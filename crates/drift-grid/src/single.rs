//! A single logically rectangular curvilinear grid.

use indexmap::IndexMap;

use crate::error::{check_lengths, GridError};
use crate::grid::Grid;
use crate::plane::Plane;

/// Newton iterations allowed when inverting the lon/lat mapping.
const MAX_NEWTON_ITERATIONS: usize = 25;

/// Convergence threshold on the Newton update, in grid units.
const NEWTON_TOLERANCE: f64 = 1e-11;

#[derive(Clone, Debug)]
enum Metric {
    Uniform { dx: f64, dy: f64 },
    Planes { dx: Plane, dy: Plane },
}

#[derive(Clone, Debug)]
enum Coordinates {
    Planes { lon: Plane, lat: Plane },
    Rectilinear {
        lon0: f64,
        lat0: f64,
        dlon: f64,
        dlat: f64,
    },
}

/// One curvilinear grid of `nx * ny` nodes.
///
/// Geographic coordinates, cell sizes, an optional land mask, and any
/// number of named static fields (bathymetry `"H"` and the like) are
/// stored as node-valued [`Plane`]s and interpolated bilinearly.
///
/// Build with [`SingleGrid::builder`]:
///
/// ```
/// use drift_grid::{Grid, Plane, SingleGrid};
///
/// let grid = SingleGrid::builder(20, 10)
///     .rectilinear(4.0, 60.0, 0.1, 0.05)
///     .spacing(800.0, 800.0)
///     .field("H", Plane::filled(20, 10, 50.0).unwrap())
///     .build()
///     .unwrap();
/// assert_eq!(grid.contains(&[-0.5, 19.6], &[3.0, 3.0]), vec![true, false]);
/// ```
#[derive(Clone, Debug)]
pub struct SingleGrid {
    nx: usize,
    ny: usize,
    lon: Plane,
    lat: Plane,
    metric: Metric,
    mask: Option<Plane>,
    fields: IndexMap<String, Plane>,
}

/// Builder for [`SingleGrid`].
///
/// Required: geographic coordinates, via [`lonlat`](Self::lonlat) or
/// [`rectilinear`](Self::rectilinear). Cell sizes default to one metre.
pub struct SingleGridBuilder {
    nx: usize,
    ny: usize,
    coordinates: Option<Coordinates>,
    metric: Metric,
    mask: Option<Plane>,
    fields: IndexMap<String, Plane>,
}

impl SingleGrid {
    /// Start building a grid of `nx * ny` nodes.
    pub fn builder(nx: usize, ny: usize) -> SingleGridBuilder {
        SingleGridBuilder {
            nx,
            ny,
            coordinates: None,
            metric: Metric::Uniform { dx: 1.0, dy: 1.0 },
            mask: None,
            fields: IndexMap::new(),
        }
    }

    /// Nodes along X.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Nodes along Y.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// A static field by name.
    pub fn field(&self, name: &str) -> Option<&Plane> {
        self.fields.get(name)
    }

    fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= -0.5 && x <= self.nx as f64 - 0.5 && y >= -0.5 && y <= self.ny as f64 - 0.5
    }

    /// Node with the smallest lon/lat distance to the target.
    fn nearest_node(&self, lon: f64, lat: f64) -> (f64, f64) {
        let mut best = (0usize, 0usize);
        let mut best_d2 = f64::INFINITY;
        for j in 0..self.ny {
            for i in 0..self.nx {
                let dlon = self.lon.at(i, j) - lon;
                let dlat = self.lat.at(i, j) - lat;
                let d2 = dlon * dlon + dlat * dlat;
                if d2 < best_d2 {
                    best_d2 = d2;
                    best = (i, j);
                }
            }
        }
        (best.0 as f64, best.1 as f64)
    }

    /// Invert the bilinear lon/lat mapping for one point by Newton
    /// iteration from the nearest node.
    fn locate(&self, lon: f64, lat: f64) -> (f64, f64) {
        if !lon.is_finite() || !lat.is_finite() {
            return (f64::NAN, f64::NAN);
        }
        let (mut x, mut y) = self.nearest_node(lon, lat);
        for _ in 0..MAX_NEWTON_ITERATIONS {
            let r_lon = self.lon.bilinear_extrapolated(x, y) - lon;
            let r_lat = self.lat.bilinear_extrapolated(x, y) - lat;
            let (a, b) = self.lon.gradient_extrapolated(x, y);
            let (c, d) = self.lat.gradient_extrapolated(x, y);
            let det = a * d - b * c;
            if det == 0.0 || !det.is_finite() {
                break;
            }
            let step_x = (d * r_lon - b * r_lat) / det;
            let step_y = (a * r_lat - c * r_lon) / det;
            x -= step_x;
            y -= step_y;
            if step_x.abs() + step_y.abs() < NEWTON_TOLERANCE {
                return if self.contains_point(x, y) {
                    (x, y)
                } else {
                    (f64::NAN, f64::NAN)
                };
            }
        }
        (f64::NAN, f64::NAN)
    }
}

impl SingleGridBuilder {
    /// Geographic coordinates of every node.
    pub fn lonlat(mut self, lon: Plane, lat: Plane) -> Self {
        self.coordinates = Some(Coordinates::Planes { lon, lat });
        self
    }

    /// Regular lon/lat lattice: node `(i, j)` at
    /// `(lon0 + i*dlon, lat0 + j*dlat)`.
    pub fn rectilinear(mut self, lon0: f64, lat0: f64, dlon: f64, dlat: f64) -> Self {
        self.coordinates = Some(Coordinates::Rectilinear {
            lon0,
            lat0,
            dlon,
            dlat,
        });
        self
    }

    /// Uniform cell sizes in metres.
    pub fn spacing(mut self, dx: f64, dy: f64) -> Self {
        self.metric = Metric::Uniform { dx, dy };
        self
    }

    /// Per-node cell sizes in metres.
    pub fn metric(mut self, dx: Plane, dy: Plane) -> Self {
        self.metric = Metric::Planes { dx, dy };
        self
    }

    /// Land mask: nodes with value `> 0.5` are water.
    pub fn mask(mut self, mask: Plane) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Add a named static field.
    pub fn field(mut self, name: impl Into<String>, plane: Plane) -> Self {
        self.fields.insert(name.into(), plane);
        self
    }

    /// Build the grid, validating every plane against `(nx, ny)`.
    ///
    /// # Errors
    ///
    /// - [`GridError::EmptyGrid`] if either dimension is 0
    /// - [`GridError::MissingCoordinates`] if no coordinates were given
    /// - [`GridError::ShapeMismatch`] if a plane has the wrong shape
    /// - [`GridError::InvalidMetric`] if a uniform spacing is not
    ///   finite and positive
    pub fn build(self) -> Result<SingleGrid, GridError> {
        let (nx, ny) = (self.nx, self.ny);
        if nx == 0 || ny == 0 {
            return Err(GridError::EmptyGrid);
        }
        let check = |name: &str, plane: &Plane| -> Result<(), GridError> {
            if plane.shape() != (nx, ny) {
                return Err(GridError::ShapeMismatch {
                    name: name.to_string(),
                    expected: (nx, ny),
                    found: plane.shape(),
                });
            }
            Ok(())
        };

        let (lon, lat) = match self.coordinates.ok_or(GridError::MissingCoordinates)? {
            Coordinates::Planes { lon, lat } => (lon, lat),
            Coordinates::Rectilinear {
                lon0,
                lat0,
                dlon,
                dlat,
            } => (
                Plane::from_fn(nx, ny, |i, _| lon0 + i as f64 * dlon)?,
                Plane::from_fn(nx, ny, |_, j| lat0 + j as f64 * dlat)?,
            ),
        };
        check("lon", &lon)?;
        check("lat", &lat)?;

        match &self.metric {
            Metric::Uniform { dx, dy } => {
                if !(dx.is_finite() && *dx > 0.0 && dy.is_finite() && *dy > 0.0) {
                    return Err(GridError::InvalidMetric {
                        reason: format!("spacing must be finite and positive, got ({dx}, {dy})"),
                    });
                }
            }
            Metric::Planes { dx, dy } => {
                check("dx", dx)?;
                check("dy", dy)?;
            }
        }
        if let Some(mask) = &self.mask {
            check("mask", mask)?;
        }
        for (name, plane) in &self.fields {
            check(name, plane)?;
        }

        Ok(SingleGrid {
            nx,
            ny,
            lon,
            lat,
            metric: self.metric,
            mask: self.mask,
            fields: self.fields,
        })
    }
}

impl Grid for SingleGrid {
    fn leaf_count(&self) -> usize {
        1
    }

    fn to_grid(&self, lon: &[f64], lat: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError> {
        check_lengths(lon, lat)?;
        Ok(lon
            .iter()
            .zip(lat)
            .map(|(&lo, &la)| self.locate(lo, la))
            .unzip())
    }

    fn lonlat(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError> {
        check_lengths(x, y)?;
        Ok(x.iter()
            .zip(y)
            .map(|(&xi, &yi)| {
                (
                    self.lon.bilinear_extrapolated(xi, yi),
                    self.lat.bilinear_extrapolated(xi, yi),
                )
            })
            .unzip())
    }

    fn contains(&self, x: &[f64], y: &[f64]) -> Vec<bool> {
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| self.contains_point(xi, yi))
            .collect()
    }

    fn at_sea(&self, x: &[f64], y: &[f64]) -> Vec<bool> {
        x.iter()
            .zip(y)
            .map(|(&xi, &yi)| {
                self.contains_point(xi, yi)
                    && self.mask.as_ref().is_none_or(|m| m.nearest(xi, yi) > 0.5)
            })
            .collect()
    }

    fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    fn sample_scalar_field(
        &self,
        name: &str,
        x: &[f64],
        y: &[f64],
    ) -> Result<Vec<f64>, GridError> {
        check_lengths(x, y)?;
        let plane = self
            .fields
            .get(name)
            .ok_or_else(|| GridError::UnknownField {
                name: name.to_string(),
            })?;
        Ok(x.iter()
            .zip(y)
            .map(|(&xi, &yi)| plane.bilinear(xi, yi))
            .collect())
    }

    fn sample_metric(&self, x: &[f64], y: &[f64]) -> Result<(Vec<f64>, Vec<f64>), GridError> {
        check_lengths(x, y)?;
        Ok(match &self.metric {
            Metric::Uniform { dx, dy } => {
                // Keep NaN positions visible in the metric as well.
                x.iter()
                    .zip(y)
                    .map(|(&xi, &yi)| {
                        let nan = xi * 0.0 + yi * 0.0;
                        (dx + nan, dy + nan)
                    })
                    .unzip()
            }
            Metric::Planes { dx, dy } => x
                .iter()
                .zip(y)
                .map(|(&xi, &yi)| (dx.bilinear(xi, yi), dy.bilinear(xi, yi)))
                .unzip(),
        })
    }

    fn sample_planes(
        &self,
        planes: &[Plane],
        x: &[f64],
        y: &[f64],
    ) -> Result<Vec<f64>, GridError> {
        check_lengths(x, y)?;
        let [plane] = planes else {
            return Err(GridError::LeafCount {
                expected: 1,
                found: planes.len(),
            });
        };
        if plane.shape() != (self.nx, self.ny) {
            return Err(GridError::ShapeMismatch {
                name: "field plane".to_string(),
                expected: (self.nx, self.ny),
                found: plane.shape(),
            });
        }
        Ok(x.iter()
            .zip(y)
            .map(|(&xi, &yi)| plane.bilinear(xi, yi))
            .collect())
    }
}
