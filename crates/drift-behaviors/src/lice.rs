//! Planktonic salmon lice.
//!
//! Each step, in order:
//!
//! - `super` (the number of lice a particle stands for) decays with a
//!   constant daily mortality
//! - `age` accumulates degree-days from the forcing temperature
//! - the vertical swimming velocity is set: upwards when the light at
//!   the particle's depth reaches `min_light`, downwards (overriding)
//!   where salinity is below `min_salinity`, zero otherwise
//! - optionally a random vertical velocity with variance `2 D / dt` is
//!   added, from a ChaCha8 RNG seeded with `seed_offset XOR step`
//! - the depth moves by the velocity times `dt`
//!
//! Depth is positive downwards, so upward swimming decreases `Z`.

use drift_core::VariableDef;
use drift_engine::{box_muller, Behavior, BehaviorContext, BehaviorError};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::light::surface_light;

/// Super-individual weight variable.
pub const SUPER: &str = "super";
/// Degree-day age variable.
pub const AGE: &str = "age";

const SECONDS_PER_DAY: f64 = 86_400.0;

/// The sea lice behaviour. Built with [`SeaLice::builder`].
#[derive(Clone, Debug)]
pub struct SeaLice {
    mortality: f64,
    extinction: f64,
    swim_speed: f64,
    min_light: f64,
    min_salinity: f64,
    vertical_mixing: Option<f64>,
    seed_offset: u64,
    temperature: String,
    salinity: String,
}

/// Builder for [`SeaLice`].
#[derive(Clone, Debug)]
pub struct SeaLiceBuilder {
    mortality: f64,
    extinction: f64,
    swim_speed: f64,
    min_light: f64,
    min_salinity: f64,
    vertical_mixing: Option<f64>,
    seed_offset: u64,
    temperature: String,
    salinity: String,
}

impl SeaLice {
    /// A builder with the standard lice parameters.
    pub fn builder() -> SeaLiceBuilder {
        SeaLiceBuilder {
            mortality: 0.17,
            extinction: 0.2,
            swim_speed: 5e-4,
            min_light: 0.01,
            min_salinity: 20.0,
            vertical_mixing: None,
            seed_offset: 0,
            temperature: "temp".to_string(),
            salinity: "salt".to_string(),
        }
    }

    /// Light at each particle's depth. Particles outside the grid have
    /// no position on the globe and get NaN.
    fn light_at_depth(&self, ctx: &BehaviorContext<'_>) -> Result<Vec<f64>, BehaviorError> {
        let p = &*ctx.population;
        let inside = ctx.inside();
        let idx: Vec<usize> = (0..p.len()).filter(|&k| inside[k]).collect();
        let gx: Vec<f64> = idx.iter().map(|&k| p.x()[k]).collect();
        let gy: Vec<f64> = idx.iter().map(|&k| p.y()[k]).collect();
        let (lon, lat) = ctx.grid.lonlat(&gx, &gy)?;

        let mut light = vec![f64::NAN; p.len()];
        for (m, &k) in idx.iter().enumerate() {
            let surface = surface_light(ctx.time, lon[m], lat[m]);
            light[k] = surface * (-self.extinction * p.z()[k]).exp();
        }
        Ok(light)
    }
}

impl SeaLiceBuilder {
    /// Daily mortality rate (default: 0.17 per day).
    pub fn mortality(mut self, per_day: f64) -> Self {
        self.mortality = per_day;
        self
    }

    /// Light extinction coefficient of the water column (default: 0.2 per metre).
    pub fn extinction(mut self, per_metre: f64) -> Self {
        self.extinction = per_metre;
        self
    }

    /// Vertical swimming speed (default: 5e-4 m/s).
    pub fn swim_speed(mut self, speed: f64) -> Self {
        self.swim_speed = speed;
        self
    }

    /// Light at depth that triggers upward swimming (default: 0.01 µE m⁻² s⁻¹).
    pub fn min_light(mut self, light: f64) -> Self {
        self.min_light = light;
        self
    }

    /// Salinity below which lice swim down (default: 20).
    pub fn min_salinity(mut self, salinity: f64) -> Self {
        self.min_salinity = salinity;
        self
    }

    /// Enable random vertical velocity with diffusivity `d` in m²/s
    /// (default: off).
    pub fn vertical_mixing(mut self, d: f64) -> Self {
        self.vertical_mixing = Some(d);
        self
    }

    /// Seed offset for the mixing RNG (default: 0). Choose one that
    /// differs from the tracker seed so the two streams are independent.
    pub fn seed_offset(mut self, offset: u64) -> Self {
        self.seed_offset = offset;
        self
    }

    /// Names of the temperature and salinity forcing fields
    /// (default: `"temp"`, `"salt"`).
    pub fn fields(mut self, temperature: &str, salinity: &str) -> Self {
        self.temperature = temperature.to_string();
        self.salinity = salinity.to_string();
        self
    }

    /// Build the behaviour.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any rate, speed, or threshold is negative or not
    /// finite.
    pub fn build(self) -> Result<SeaLice, String> {
        let checks = [
            ("mortality", self.mortality),
            ("extinction", self.extinction),
            ("swim_speed", self.swim_speed),
            ("min_light", self.min_light),
            ("min_salinity", self.min_salinity),
            ("vertical_mixing", self.vertical_mixing.unwrap_or(0.0)),
        ];
        for (name, value) in checks {
            if !value.is_finite() || value < 0.0 {
                return Err(format!("{name} must be finite and >= 0, got {value}"));
            }
        }
        Ok(SeaLice {
            mortality: self.mortality,
            extinction: self.extinction,
            swim_speed: self.swim_speed,
            min_light: self.min_light,
            min_salinity: self.min_salinity,
            vertical_mixing: self.vertical_mixing,
            seed_offset: self.seed_offset,
            temperature: self.temperature,
            salinity: self.salinity,
        })
    }
}

impl Behavior for SeaLice {
    fn name(&self) -> &str {
        "SeaLice"
    }

    fn variables(&self) -> Vec<VariableDef> {
        vec![
            VariableDef::instance(SUPER),
            VariableDef::instance(AGE).with_units("degree-days"),
        ]
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        if ctx.population.is_empty() {
            return Ok(());
        }
        let dt = ctx.dt as f64;
        let temp = ctx.sample(&self.temperature)?;
        let salt = ctx.sample(&self.salinity)?;
        let light = self.light_at_depth(ctx)?;
        let inside = ctx.inside();

        let survival = (-self.mortality * dt / SECONDS_PER_DAY).exp();
        for s in float_mut(ctx, SUPER)? {
            *s *= survival;
        }
        // Off-grid lice keep their age and depth until the boundary
        // policy has dealt with them.
        for ((a, t), _) in float_mut(ctx, AGE)?
            .iter_mut()
            .zip(&temp)
            .zip(&inside)
            .filter(|(_, &ok)| ok)
        {
            *a += t * dt / SECONDS_PER_DAY;
        }

        let mut w: Vec<f64> = light
            .iter()
            .zip(&salt)
            .map(|(&e, &s)| {
                if s < self.min_salinity {
                    self.swim_speed
                } else if e >= self.min_light {
                    -self.swim_speed
                } else {
                    0.0
                }
            })
            .collect();
        if let Some(d) = self.vertical_mixing.filter(|&d| d > 0.0) {
            let mut rng = ChaCha8Rng::seed_from_u64(self.seed_offset ^ ctx.step.0);
            let sigma = (2.0 * d / dt).sqrt();
            for wk in &mut w {
                *wk += sigma * box_muller(&mut rng);
            }
        }

        let (_, _, z) = ctx.population.positions_mut();
        for ((zk, wk), _) in z.iter_mut().zip(w).zip(&inside).filter(|(_, &ok)| ok) {
            *zk += wk * dt;
        }
        Ok(())
    }
}

fn float_mut<'c>(
    ctx: &'c mut BehaviorContext<'_>,
    name: &str,
) -> Result<&'c mut [f64], BehaviorError> {
    ctx.population
        .float_mut(name)
        .ok_or_else(|| BehaviorError::MissingVariable {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_build() {
        assert!(SeaLice::builder().build().is_ok());
    }

    #[test]
    fn negative_parameters_are_rejected() {
        assert!(SeaLice::builder().mortality(-0.1).build().is_err());
        assert!(SeaLice::builder().swim_speed(f64::NAN).build().is_err());
        assert!(SeaLice::builder().vertical_mixing(-1.0).build().is_err());
    }

    #[test]
    fn declares_super_and_age() {
        let lice = SeaLice::builder().build().unwrap();
        let names: Vec<String> = lice.variables().into_iter().map(|v| v.name).collect();
        assert_eq!(names, vec![SUPER, AGE]);
    }

    #[test]
    fn box_muller_is_seeded() {
        let mut a = ChaCha8Rng::seed_from_u64(3);
        let mut b = ChaCha8Rng::seed_from_u64(3);
        assert_eq!(box_muller(&mut a), box_muller(&mut b));
    }
}
