//! Node-valued 2-D arrays and their interpolation.

use crate::error::GridError;

/// A row-major array of values at grid nodes: `data[j * nx + i]` is the
/// value at node `(i, j)`.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane {
    nx: usize,
    ny: usize,
    data: Vec<f64>,
}

/// Cell index and fractional offset along one axis.
#[derive(Clone, Copy, Debug)]
struct AxisCell {
    lo: usize,
    hi: usize,
    frac: f64,
}

/// Locate `v` on an axis of `n` nodes, clamping to the end nodes.
fn axis_clamped(v: f64, n: usize) -> AxisCell {
    if n == 1 {
        return AxisCell {
            lo: 0,
            hi: 0,
            frac: v * 0.0,
        };
    }
    let v = v.clamp(0.0, (n - 1) as f64);
    let lo = (v.floor() as usize).min(n - 2);
    AxisCell {
        lo,
        hi: lo + 1,
        frac: v - lo as f64,
    }
}

/// Locate `v` on an axis of `n` nodes; outside the node range the
/// fraction runs past `[0, 1]` so the edge cell extrapolates linearly.
fn axis_extrapolated(v: f64, n: usize) -> AxisCell {
    if n == 1 {
        return AxisCell {
            lo: 0,
            hi: 0,
            frac: v * 0.0,
        };
    }
    let lo = (v.floor().max(0.0) as usize).min(n - 2);
    AxisCell {
        lo,
        hi: lo + 1,
        frac: v - lo as f64,
    }
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + t * (b - a)
}

impl Plane {
    /// Wrap `data` (row-major, `nx` fastest) as a plane.
    pub fn new(nx: usize, ny: usize, data: Vec<f64>) -> Result<Self, GridError> {
        if nx == 0 || ny == 0 {
            return Err(GridError::EmptyGrid);
        }
        if data.len() != nx * ny {
            return Err(GridError::DataLength {
                expected: nx * ny,
                found: data.len(),
            });
        }
        Ok(Self { nx, ny, data })
    }

    /// A plane with every node set to `value`.
    pub fn filled(nx: usize, ny: usize, value: f64) -> Result<Self, GridError> {
        Self::new(nx, ny, vec![value; nx * ny])
    }

    /// A plane whose node `(i, j)` holds `f(i, j)`.
    pub fn from_fn(
        nx: usize,
        ny: usize,
        f: impl Fn(usize, usize) -> f64,
    ) -> Result<Self, GridError> {
        let mut data = Vec::with_capacity(nx * ny);
        for j in 0..ny {
            for i in 0..nx {
                data.push(f(i, j));
            }
        }
        Self::new(nx, ny, data)
    }

    /// Nodes along X.
    pub fn nx(&self) -> usize {
        self.nx
    }

    /// Nodes along Y.
    pub fn ny(&self) -> usize {
        self.ny
    }

    /// `(nx, ny)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.nx, self.ny)
    }

    /// Raw row-major values.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Value at node `(i, j)`.
    ///
    /// # Panics
    ///
    /// Panics if the node is out of range.
    pub fn at(&self, i: usize, j: usize) -> f64 {
        self.data[j * self.nx + i]
    }

    fn blend(&self, ax: AxisCell, ay: AxisCell) -> f64 {
        let south = lerp(self.at(ax.lo, ay.lo), self.at(ax.hi, ay.lo), ax.frac);
        let north = lerp(self.at(ax.lo, ay.hi), self.at(ax.hi, ay.hi), ax.frac);
        lerp(south, north, ay.frac)
    }

    /// Bilinear interpolation at `(x, y)`, holding edge values constant
    /// outside the node range. NaN coordinates yield NaN.
    pub fn bilinear(&self, x: f64, y: f64) -> f64 {
        self.blend(axis_clamped(x, self.nx), axis_clamped(y, self.ny))
    }

    /// Bilinear interpolation that extrapolates linearly from the edge
    /// cell outside the node range. Used for coordinate transforms, where
    /// the half-cell margin around the domain must stay invertible.
    pub fn bilinear_extrapolated(&self, x: f64, y: f64) -> f64 {
        self.blend(axis_extrapolated(x, self.nx), axis_extrapolated(y, self.ny))
    }

    /// Partial derivatives `(d/dx, d/dy)` of the extrapolating bilinear
    /// surface at `(x, y)`.
    pub fn gradient_extrapolated(&self, x: f64, y: f64) -> (f64, f64) {
        let ax = axis_extrapolated(x, self.nx);
        let ay = axis_extrapolated(y, self.ny);
        let (a00, a10) = (self.at(ax.lo, ay.lo), self.at(ax.hi, ay.lo));
        let (a01, a11) = (self.at(ax.lo, ay.hi), self.at(ax.hi, ay.hi));
        let d_dx = if ax.lo == ax.hi {
            0.0
        } else {
            lerp(a10 - a00, a11 - a01, ay.frac)
        };
        let d_dy = if ay.lo == ay.hi {
            0.0
        } else {
            lerp(a01 - a00, a11 - a10, ax.frac)
        };
        (d_dx, d_dy)
    }

    /// Value at the node nearest `(x, y)`, clamped to the node range.
    pub fn nearest(&self, x: f64, y: f64) -> f64 {
        if x.is_nan() || y.is_nan() {
            return f64::NAN;
        }
        let i = x.round().clamp(0.0, (self.nx - 1) as f64) as usize;
        let j = y.round().clamp(0.0, (self.ny - 1) as f64) as usize;
        self.at(i, j)
    }
}
