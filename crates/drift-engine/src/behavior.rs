//! The optional behaviour capability.
//!
//! A [`Behavior`] runs once per step after advection. It may rewrite any
//! instance variable and clear alive flags to remove particles. The
//! engine's results must not depend on whether a behaviour is present
//! when it does nothing, so [`NoBehavior`] is a true no-op.

use std::error::Error;
use std::fmt;

use drift_core::{SimTime, StepIndex, VariableDef};
use drift_forcing::{Forcing, ForcingError};
use drift_grid::{Grid, GridError};

use crate::particles::ParticleTable;
use crate::population::Population;

/// Errors a behaviour may report. Any error aborts the step.
#[derive(Clone, Debug, PartialEq)]
pub enum BehaviorError {
    /// A variable the behaviour needs is absent or has the wrong type.
    MissingVariable {
        /// Variable name.
        name: String,
    },
    /// A forcing query failed.
    Forcing(ForcingError),
    /// A grid query failed.
    Grid(GridError),
    /// Any other failure.
    Failed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for BehaviorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingVariable { name } => write!(f, "missing variable '{name}'"),
            Self::Forcing(e) => write!(f, "forcing: {e}"),
            Self::Grid(e) => write!(f, "grid: {e}"),
            Self::Failed { reason } => write!(f, "{reason}"),
        }
    }
}

impl Error for BehaviorError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Forcing(e) => Some(e),
            Self::Grid(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ForcingError> for BehaviorError {
    fn from(e: ForcingError) -> Self {
        Self::Forcing(e)
    }
}

impl From<GridError> for BehaviorError {
    fn from(e: GridError) -> Self {
        Self::Grid(e)
    }
}

/// Everything a behaviour sees during one step.
pub struct BehaviorContext<'a> {
    /// The model grid.
    pub grid: &'a dyn Grid,
    /// Forcing, bracketing the current step.
    pub forcing: &'a dyn Forcing,
    /// Live particles, freshly advected, all marked alive.
    pub population: &'a mut Population,
    /// Release-time values of every particle, by pid.
    pub particles: &'a ParticleTable,
    /// The step being computed.
    pub step: StepIndex,
    /// Time the advected positions refer to: the end of the step.
    pub time: SimTime,
    /// Timestep in seconds.
    pub dt: i64,
}

impl BehaviorContext<'_> {
    /// A float instance variable, or [`BehaviorError::MissingVariable`].
    pub fn float(&self, name: &str) -> Result<&[f64], BehaviorError> {
        self.population
            .float(name)
            .ok_or_else(|| BehaviorError::MissingVariable {
                name: name.to_string(),
            })
    }

    /// Which particles are inside the grid domain. The boundary policy
    /// has not run yet, so advection may have carried some outside.
    pub fn inside(&self) -> Vec<bool> {
        self.grid.contains(self.population.x(), self.population.y())
    }

    /// Sample a forcing field at every live particle's position at
    /// [`time`](Self::time). Particles outside the grid get NaN.
    pub fn sample(&self, field: &str) -> Result<Vec<f64>, BehaviorError> {
        let p = &*self.population;
        let inside = self.inside();
        let idx: Vec<usize> = (0..p.len()).filter(|&k| inside[k]).collect();
        let mut out = vec![f64::NAN; p.len()];
        if idx.is_empty() {
            return Ok(out);
        }
        let gather = |a: &[f64]| -> Vec<f64> { idx.iter().map(|&k| a[k]).collect() };
        let values = self.forcing.sample(
            self.grid,
            field,
            &gather(p.x()),
            &gather(p.y()),
            &gather(p.z()),
            self.time.as_f64(),
        )?;
        for (&k, v) in idx.iter().zip(values) {
            out[k] = v;
        }
        Ok(out)
    }
}

/// A per-step particle behaviour plug-in (biology, mortality, swimming).
///
/// # Contract
///
/// - Declare every instance or particle variable the behaviour reads or
///   writes in [`variables`](Self::variables); the state checks them
///   against the schema at construction.
/// - Do not change the population's length. Remove particles by
///   clearing their alive flags.
/// - Be deterministic given the context: seed any randomness from the
///   step index.
pub trait Behavior: Send {
    /// Name used in logs and errors.
    fn name(&self) -> &str;

    /// Variables this behaviour requires in the schema.
    fn variables(&self) -> Vec<VariableDef> {
        Vec::new()
    }

    /// Apply the behaviour for one step.
    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError>;
}

/// The absent behaviour.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoBehavior;

impl Behavior for NoBehavior {
    fn name(&self) -> &str {
        "none"
    }

    fn update(&mut self, _ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ModelConfig;
    use drift_core::{Column, ParticleId};
    use drift_test_utils::{uniform_grid, ConstantForcing};
    use indexmap::IndexMap;

    #[test]
    fn sample_gives_nan_off_the_grid() {
        let config = ModelConfig::default();
        let schema = config.tracking_schema([]).unwrap();
        let mut population = Population::new(&schema);
        let mut cols = IndexMap::new();
        cols.insert("X".to_string(), Column::Float(vec![2.0, 40.0]));
        cols.insert("Y".to_string(), Column::Float(vec![2.0, 2.0]));
        population
            .append(&[ParticleId(0), ParticleId(1)], &cols)
            .unwrap();
        let particles = ParticleTable::new(&schema, ParticleId(0));
        let grid = uniform_grid(10, 10);
        let forcing = ConstantForcing::new().with_field("temp", 7.5);

        let ctx = BehaviorContext {
            grid: &grid,
            forcing: &forcing,
            population: &mut population,
            particles: &particles,
            step: StepIndex(0),
            time: SimTime(0),
            dt: 60,
        };
        assert_eq!(ctx.inside(), vec![true, false]);
        let temp = ctx.sample("temp").unwrap();
        assert_eq!(temp[0], 7.5);
        assert!(temp[1].is_nan());
        assert!(matches!(
            ctx.sample("salt"),
            Err(BehaviorError::Forcing(_))
        ));
    }

    #[test]
    fn float_reports_missing_variables() {
        let config = ModelConfig::default();
        let schema = config.tracking_schema([]).unwrap();
        let mut population = Population::new(&schema);
        let particles = ParticleTable::new(&schema, ParticleId(0));
        let grid = uniform_grid(4, 4);
        let forcing = ConstantForcing::new();
        let ctx = BehaviorContext {
            grid: &grid,
            forcing: &forcing,
            population: &mut population,
            particles: &particles,
            step: StepIndex(0),
            time: SimTime(0),
            dt: 60,
        };
        assert!(ctx.float("X").unwrap().is_empty());
        assert!(matches!(
            ctx.float("age"),
            Err(BehaviorError::MissingVariable { .. })
        ));
    }
}
