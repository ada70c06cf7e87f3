//! Test fixtures and mock capabilities for Drift development.
//!
//! Provides a [`ConstantForcing`] that answers every query with a fixed
//! value, a [`ScriptedBehavior`] driven by a closure, and grid and
//! forcing fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

pub use fixtures::{ramp_forcing, uniform_grid, FIXTURE_DEPTH};

use drift_core::{SimTime, VariableDef};
use drift_engine::{Behavior, BehaviorContext, BehaviorError};
use drift_forcing::{Forcing, ForcingError};
use drift_grid::Grid;
use indexmap::IndexMap;

/// Forcing with spatially and temporally constant fields.
///
/// Sampling an unknown field is an error, as with real forcing. NaN
/// positions yield NaN.
#[derive(Clone, Debug, Default)]
pub struct ConstantForcing {
    fields: IndexMap<String, f64>,
    advances: Vec<SimTime>,
}

impl ConstantForcing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Constant `u` and `v` in m/s.
    pub fn velocity(u: f64, v: f64) -> Self {
        Self::new().with_field("u", u).with_field("v", v)
    }

    pub fn with_field(mut self, name: &str, value: f64) -> Self {
        self.fields.insert(name.to_string(), value);
        self
    }

    /// Every time passed to `advance`, in order.
    pub fn advances(&self) -> &[SimTime] {
        &self.advances
    }
}

impl Forcing for ConstantForcing {
    fn advance(&mut self, now: SimTime) -> Result<(), ForcingError> {
        self.advances.push(now);
        Ok(())
    }

    fn sample(
        &self,
        _grid: &dyn Grid,
        field: &str,
        x: &[f64],
        y: &[f64],
        _z: &[f64],
        _time: f64,
    ) -> Result<Vec<f64>, ForcingError> {
        let value = *self
            .fields
            .get(field)
            .ok_or_else(|| ForcingError::UnknownField {
                name: field.to_string(),
            })?;
        Ok(x.iter()
            .zip(y)
            .map(|(&xi, &yi)| value + xi * 0.0 + yi * 0.0)
            .collect())
    }

    fn has_field(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

type Script = Box<dyn FnMut(&mut BehaviorContext<'_>) -> Result<(), BehaviorError> + Send>;

/// A behaviour whose update is a closure.
pub struct ScriptedBehavior {
    name: String,
    variables: Vec<VariableDef>,
    script: Script,
    calls: u64,
}

impl ScriptedBehavior {
    pub fn new(
        name: &str,
        script: impl FnMut(&mut BehaviorContext<'_>) -> Result<(), BehaviorError> + Send + 'static,
    ) -> Self {
        Self {
            name: name.to_string(),
            variables: Vec::new(),
            script: Box::new(script),
            calls: 0,
        }
    }

    /// Declare variables the script needs.
    pub fn with_variables(mut self, variables: Vec<VariableDef>) -> Self {
        self.variables = variables;
        self
    }

    pub fn calls(&self) -> u64 {
        self.calls
    }
}

impl Behavior for ScriptedBehavior {
    fn name(&self) -> &str {
        &self.name
    }

    fn variables(&self) -> Vec<VariableDef> {
        self.variables.clone()
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        self.calls += 1;
        (self.script)(ctx)
    }
}

/// Kills every particle whose pid satisfies `predicate`.
pub fn kill_where(predicate: impl Fn(u64) -> bool + Send + 'static) -> ScriptedBehavior {
    ScriptedBehavior::new("kill_where", move |ctx| {
        let pid: Vec<u64> = ctx.population.pid().iter().map(|p| p.0).collect();
        for (alive, p) in ctx.population.alive_mut().iter_mut().zip(pid) {
            if predicate(p) {
                *alive = false;
            }
        }
        Ok(())
    })
}
