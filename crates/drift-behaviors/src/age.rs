//! Removal of particles past an age limit.

use drift_core::VariableDef;
use drift_engine::{Behavior, BehaviorContext, BehaviorError};

use crate::lice::AGE;

/// Marks particles dead once their age variable exceeds a limit.
///
/// The age is read, not advanced: pair it with a behaviour or release
/// attribute that maintains the variable. NaN ages never expire.
#[derive(Clone, Debug)]
pub struct MaxAge {
    limit: f64,
    variable: String,
}

impl MaxAge {
    /// Expire particles whose [`AGE`] exceeds `limit`.
    pub fn new(limit: f64) -> Self {
        Self {
            limit,
            variable: AGE.to_string(),
        }
    }

    /// Read the age from another float instance variable.
    pub fn variable(mut self, name: &str) -> Self {
        self.variable = name.to_string();
        self
    }

    /// The age limit.
    pub fn limit(&self) -> f64 {
        self.limit
    }
}

impl Behavior for MaxAge {
    fn name(&self) -> &str {
        "MaxAge"
    }

    fn variables(&self) -> Vec<VariableDef> {
        vec![VariableDef::instance(self.variable.clone())]
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        let expired: Vec<bool> = ctx
            .float(&self.variable)?
            .iter()
            .map(|&a| a > self.limit)
            .collect();
        for (alive, old) in ctx.population.alive_mut().iter_mut().zip(expired) {
            if old {
                *alive = false;
            }
        }
        Ok(())
    }
}
