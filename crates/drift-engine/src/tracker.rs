//! Advection and diffusion of particle positions over one timestep.
//!
//! Velocities come from the forcing in m/s and are converted to grid
//! units per second with the grid metric at each evaluation point, so
//! stages that cross from one sub-grid of a composite into another are
//! handled by the grid, not here.
//!
//! Diffusion draws use a ChaCha8 RNG seeded from `seed XOR step`, one
//! Gaussian per particle and axis in population order, so a run (or a
//! restarted run) reproduces its trajectories exactly.

use drift_core::{SimTime, StepIndex};
use drift_forcing::Forcing;
use drift_grid::Grid;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::trace_span;

use crate::config::{Advection, ModelConfig};
use crate::error::StepError;
use crate::population::Population;

/// Integrates particle motion for one step.
#[derive(Clone, Debug)]
pub struct Tracker {
    advection: Advection,
    dt: f64,
    diffusivity: f64,
    vertical_diffusivity: f64,
    seed: u64,
    u_name: String,
    v_name: String,
}

impl Tracker {
    /// A tracker for the given configuration.
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            advection: config.advection,
            dt: config.dt as f64,
            diffusivity: config.diffusivity,
            vertical_diffusivity: config.vertical_diffusivity,
            seed: config.seed,
            u_name: config.velocity.0.clone(),
            v_name: config.velocity.1.clone(),
        }
    }

    /// Advance every particle by one step starting at `time`.
    ///
    /// Positions outside the grid afterwards are left for the boundary
    /// policy. NaN positions and velocities propagate.
    pub fn step(
        &self,
        grid: &dyn Grid,
        forcing: &dyn Forcing,
        population: &mut Population,
        time: SimTime,
        step: StepIndex,
    ) -> Result<(), StepError> {
        if population.is_empty() {
            return Ok(());
        }
        let _span = trace_span!("tracker", particles = population.len()).entered();
        let t = time.as_f64();
        let (x, y, z) = population.positions_mut();
        match self.advection {
            Advection::Euler => self.euler(grid, forcing, x, y, z, t)?,
            Advection::Rk4 => self.rk4(grid, forcing, x, y, z, t)?,
        }
        self.diffuse(grid, x, y, z, step)
    }

    fn euler(
        &self,
        grid: &dyn Grid,
        forcing: &dyn Forcing,
        x: &mut [f64],
        y: &mut [f64],
        z: &[f64],
        t: f64,
    ) -> Result<(), StepError> {
        let (u, v) = self.velocity(grid, forcing, x, y, z, t)?;
        for k in 0..x.len() {
            x[k] += self.dt * u[k];
            y[k] += self.dt * v[k];
        }
        Ok(())
    }

    fn rk4(
        &self,
        grid: &dyn Grid,
        forcing: &dyn Forcing,
        x: &mut [f64],
        y: &mut [f64],
        z: &[f64],
        t: f64,
    ) -> Result<(), StepError> {
        let dt = self.dt;
        let half = 0.5 * dt;
        let (u1, v1) = self.velocity(grid, forcing, x, y, z, t)?;
        let (x2, y2) = (offset(x, &u1, half), offset(y, &v1, half));
        let (u2, v2) = self.velocity(grid, forcing, &x2, &y2, z, t + half)?;
        let (x3, y3) = (offset(x, &u2, half), offset(y, &v2, half));
        let (u3, v3) = self.velocity(grid, forcing, &x3, &y3, z, t + half)?;
        let (x4, y4) = (offset(x, &u3, dt), offset(y, &v3, dt));
        let (u4, v4) = self.velocity(grid, forcing, &x4, &y4, z, t + dt)?;

        // Written as a correction to the first stage so a constant field
        // moves particles by exactly u*dt.
        let combine = |k1: f64, k2: f64, k3: f64, k4: f64| {
            k1 + (2.0 * (k2 - k1) + 2.0 * (k3 - k1) + (k4 - k1)) / 6.0
        };
        for k in 0..x.len() {
            x[k] += dt * combine(u1[k], u2[k], u3[k], u4[k]);
            y[k] += dt * combine(v1[k], v2[k], v3[k], v4[k]);
        }
        Ok(())
    }

    /// Velocity in grid units per second at each point. Points outside
    /// the grid see no flow.
    fn velocity(
        &self,
        grid: &dyn Grid,
        forcing: &dyn Forcing,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        t: f64,
    ) -> Result<(Vec<f64>, Vec<f64>), StepError> {
        let n = x.len();
        let inside = grid.contains(x, y);
        let idx: Vec<usize> = (0..n).filter(|&k| inside[k]).collect();
        let mut u = vec![0.0; n];
        let mut v = vec![0.0; n];
        if idx.is_empty() {
            return Ok((u, v));
        }

        let all_inside = idx.len() == n;
        let gather = |a: &[f64]| -> Vec<f64> { idx.iter().map(|&k| a[k]).collect() };
        let (gx, gy, gz);
        let (px, py, pz): (&[f64], &[f64], &[f64]) = if all_inside {
            (x, y, z)
        } else {
            gx = gather(x);
            gy = gather(y);
            gz = gather(z);
            (&gx, &gy, &gz)
        };

        let us = forcing.sample(grid, &self.u_name, px, py, pz, t)?;
        let vs = forcing.sample(grid, &self.v_name, px, py, pz, t)?;
        let (dx, dy) = grid.sample_metric(px, py)?;
        for (m, &k) in idx.iter().enumerate() {
            u[k] = us[m] / dx[m];
            v[k] = vs[m] / dy[m];
        }
        Ok((u, v))
    }

    /// Add Gaussian displacements with standard deviation
    /// `sqrt(2 * D * dt)` per axis. A zero diffusivity adds nothing and
    /// draws nothing.
    fn diffuse(
        &self,
        grid: &dyn Grid,
        x: &mut [f64],
        y: &mut [f64],
        z: &mut [f64],
        step: StepIndex,
    ) -> Result<(), StepError> {
        let horizontal = self.diffusivity > 0.0;
        let vertical = self.vertical_diffusivity > 0.0;
        if !horizontal && !vertical {
            return Ok(());
        }
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed ^ step.0);
        let sigma_h = (2.0 * self.diffusivity * self.dt).sqrt();
        let sigma_v = (2.0 * self.vertical_diffusivity * self.dt).sqrt();

        let (dx, dy) = if horizontal {
            let inside = grid.contains(x, y);
            let idx: Vec<usize> = (0..x.len()).filter(|&k| inside[k]).collect();
            let gx: Vec<f64> = idx.iter().map(|&k| x[k]).collect();
            let gy: Vec<f64> = idx.iter().map(|&k| y[k]).collect();
            let (mdx, mdy) = grid.sample_metric(&gx, &gy)?;
            // Outside the grid there is no metric; those particles
            // still consume their draws but do not move.
            let mut dx = vec![f64::INFINITY; x.len()];
            let mut dy = vec![f64::INFINITY; x.len()];
            for (m, &k) in idx.iter().enumerate() {
                dx[k] = mdx[m];
                dy[k] = mdy[m];
            }
            (dx, dy)
        } else {
            (Vec::new(), Vec::new())
        };

        for k in 0..x.len() {
            if horizontal {
                x[k] += sigma_h * box_muller(&mut rng) / dx[k];
                y[k] += sigma_h * box_muller(&mut rng) / dy[k];
            }
            if vertical {
                z[k] += sigma_v * box_muller(&mut rng);
            }
        }
        Ok(())
    }
}

/// `p + h * k` element-wise.
fn offset(p: &[f64], k: &[f64], h: f64) -> Vec<f64> {
    p.iter().zip(k).map(|(&p, &k)| p + h * k).collect()
}

/// A standard normal sample by the Box-Muller transform.
///
/// Draws exactly two uniforms, so a seeded stream stays aligned with
/// the particles it is applied to.
pub fn box_muller(rng: &mut ChaCha8Rng) -> f64 {
    let u1: f64 = rng.random::<f64>().max(1e-300); // avoid ln(0)
    let u2: f64 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos()
}
