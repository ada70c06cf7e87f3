//! Model configuration, validation, and error types.
//!
//! [`ModelConfig`] is the explicit configuration value passed to
//! [`State`](crate::State), [`Tracker`](crate::Tracker), and
//! [`ParticleReleaser`](crate::ParticleReleaser).
//! [`validate()`](ModelConfig::validate) checks it once at startup.

use std::error::Error;
use std::fmt;

use drift_core::{Clock, ColumnType, Schema, SchemaError, SimTime, VariableDef, VariableKind};

/// Name of the X grid-coordinate instance variable.
pub const VAR_X: &str = "X";
/// Name of the Y grid-coordinate instance variable.
pub const VAR_Y: &str = "Y";
/// Name of the depth instance variable (metres, positive downward).
pub const VAR_Z: &str = "Z";
/// Name of the derived longitude instance variable.
pub const VAR_LON: &str = "lon";
/// Name of the derived latitude instance variable.
pub const VAR_LAT: &str = "lat";
/// Name of the release-time particle variable (seconds since the epoch).
pub const VAR_RELEASE_TIME: &str = "release_time";

// ── Advection ──────────────────────────────────────────────────────

/// Integration scheme for advection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Advection {
    /// Forward Euler: one velocity evaluation per step.
    Euler,
    /// Classical fourth-order Runge-Kutta.
    #[default]
    Rk4,
}

// ── HorizontalBoundary ─────────────────────────────────────────────

/// What happens to a particle that leaves the wet domain.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum HorizontalBoundary {
    /// Return to the position held before the step.
    #[default]
    Stay,
    /// Mark not alive; removed at compaction.
    Kill,
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating configuration or building the
/// release schedule.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// `stop_time` is not after `start_time`.
    InvalidTimeWindow {
        /// Configured start.
        start: SimTime,
        /// Configured stop.
        stop: SimTime,
    },
    /// `dt` is zero or negative.
    InvalidDt {
        /// The configured value.
        value: i64,
    },
    /// A diffusivity is negative or not finite.
    InvalidDiffusivity {
        /// The configured value.
        value: f64,
    },
    /// The bottom clamp factor is outside `(0, 1]`.
    InvalidClampFactor {
        /// The configured value.
        value: f64,
    },
    /// Release rows are not in time order.
    UnorderedRelease {
        /// Index of the first row earlier than its predecessor.
        index: usize,
    },
    /// Continuous release period is zero or negative.
    InvalidReleasePeriod {
        /// The configured value.
        value: i64,
    },
    /// A release row has the wrong number of attribute values.
    ReleaseRowWidth {
        /// Row index.
        index: usize,
        /// Declared attribute count.
        expected: usize,
        /// Values in the row.
        found: usize,
    },
    /// A release attribute value does not match its variable's type.
    ReleaseValueType {
        /// Row index.
        index: usize,
        /// Attribute name.
        name: String,
    },
    /// A release attribute is not declared in the schema, or names a
    /// variable the releaser sets itself.
    UnknownAttribute {
        /// Attribute name.
        name: String,
    },
    /// The variable schema could not be built.
    Schema(SchemaError),
    /// A variable needed by a component is not in the schema.
    MissingVariable {
        /// Variable name.
        name: String,
        /// The component that needs it.
        required_by: String,
    },
    /// A variable exists but has the wrong kind or element type.
    WrongVariableKind {
        /// Variable name.
        name: String,
        /// What the component needs.
        expected: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidTimeWindow { start, stop } => {
                write!(f, "stop_time {stop} is not after start_time {start}")
            }
            Self::InvalidDt { value } => write!(f, "dt must be positive, got {value}"),
            Self::InvalidDiffusivity { value } => {
                write!(f, "diffusivity must be finite and >= 0, got {value}")
            }
            Self::InvalidClampFactor { value } => {
                write!(f, "bottom clamp factor must be in (0, 1], got {value}")
            }
            Self::UnorderedRelease { index } => {
                write!(f, "release row {index} is earlier than the row before it")
            }
            Self::InvalidReleasePeriod { value } => {
                write!(f, "release period must be positive, got {value}")
            }
            Self::ReleaseRowWidth {
                index,
                expected,
                found,
            } => write!(
                f,
                "release row {index} has {found} attribute values, expected {expected}"
            ),
            Self::ReleaseValueType { index, name } => {
                write!(f, "release row {index}: value for '{name}' has the wrong type")
            }
            Self::UnknownAttribute { name } => {
                write!(f, "release attribute '{name}' is not a settable variable")
            }
            Self::Schema(e) => write!(f, "schema: {e}"),
            Self::MissingVariable { name, required_by } => {
                write!(f, "variable '{name}' required by {required_by} is not declared")
            }
            Self::WrongVariableKind { name, expected } => {
                write!(f, "variable '{name}' must be {expected}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Schema(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SchemaError> for ConfigError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

// ── ModelConfig ────────────────────────────────────────────────────

/// Complete configuration of a tracking run.
#[derive(Clone, Debug, PartialEq)]
pub struct ModelConfig {
    /// First instant of the run.
    pub start_time: SimTime,
    /// End of the run, exclusive.
    pub stop_time: SimTime,
    /// Timestep in seconds. Must be positive.
    pub dt: i64,
    /// Advection scheme. Default: RK4.
    pub advection: Advection,
    /// Horizontal diffusivity in m²/s. Default: 0 (no diffusion).
    pub diffusivity: f64,
    /// Vertical diffusivity in m²/s. Default: 0.
    pub vertical_diffusivity: f64,
    /// Seed for diffusion draws.
    pub seed: u64,
    /// Policy for particles leaving the wet domain. Default: `Stay`.
    pub horizontal_boundary: HorizontalBoundary,
    /// Particles below the bottom move to `factor * H`. Default: 0.99.
    pub bottom_clamp_factor: f64,
    /// Maintain derived `lon`/`lat` instance variables. Default: false.
    pub compute_lonlat: bool,
    /// Forcing field names of the eastward and northward velocity
    /// components in m/s. Default: `("u", "v")`.
    pub velocity: (String, String),
    /// Static grid field holding bottom depth. Default: `"H"`.
    pub depth_field: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            start_time: SimTime(0),
            stop_time: SimTime(86_400),
            dt: 3_600,
            advection: Advection::default(),
            diffusivity: 0.0,
            vertical_diffusivity: 0.0,
            seed: 0,
            horizontal_boundary: HorizontalBoundary::default(),
            bottom_clamp_factor: 0.99,
            compute_lonlat: false,
            velocity: ("u".to_string(), "v".to_string()),
            depth_field: "H".to_string(),
        }
    }
}

impl ModelConfig {
    /// Defaults with the given time window and timestep.
    pub fn new(start_time: SimTime, stop_time: SimTime, dt: i64) -> Self {
        Self {
            start_time,
            stop_time,
            dt,
            ..Self::default()
        }
    }

    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dt <= 0 {
            return Err(ConfigError::InvalidDt { value: self.dt });
        }
        if self.stop_time <= self.start_time {
            return Err(ConfigError::InvalidTimeWindow {
                start: self.start_time,
                stop: self.stop_time,
            });
        }
        for d in [self.diffusivity, self.vertical_diffusivity] {
            if !d.is_finite() || d < 0.0 {
                return Err(ConfigError::InvalidDiffusivity { value: d });
            }
        }
        let c = self.bottom_clamp_factor;
        if !(c > 0.0 && c <= 1.0) {
            return Err(ConfigError::InvalidClampFactor { value: c });
        }
        Ok(())
    }

    /// Number of whole steps in `[start_time, stop_time)`, rounding up.
    pub fn num_steps(&self) -> u64 {
        let span = self.stop_time - self.start_time;
        if span <= 0 || self.dt <= 0 {
            return 0;
        }
        ((span + self.dt - 1) / self.dt) as u64
    }

    /// A clock at step 0 of this run.
    pub fn clock(&self) -> Clock {
        Clock::new(self.start_time, self.dt)
    }

    /// The schema variables the engine itself maintains: `X`, `Y`, `Z`,
    /// `release_time`, and, when configured, `lon` and `lat`.
    pub fn tracking_variables(&self) -> Vec<VariableDef> {
        let mut defs = vec![
            VariableDef::instance(VAR_X),
            VariableDef::instance(VAR_Y),
            VariableDef::instance(VAR_Z).with_units("m"),
            VariableDef::particle(VAR_RELEASE_TIME)
                .with_type(ColumnType::Int)
                .with_units("s"),
        ];
        if self.compute_lonlat {
            defs.push(VariableDef::instance(VAR_LON).with_units("degrees_east"));
            defs.push(VariableDef::instance(VAR_LAT).with_units("degrees_north"));
        }
        defs
    }

    /// Build a schema of the tracking variables followed by `extra`.
    pub fn tracking_schema(
        &self,
        extra: impl IntoIterator<Item = VariableDef>,
    ) -> Result<Schema, ConfigError> {
        Ok(Schema::new(self.tracking_variables().into_iter().chain(extra))?)
    }
}

/// Check that `schema` declares `def` with the same kind and type.
pub(crate) fn require_variable(
    schema: &Schema,
    def: &VariableDef,
    required_by: &str,
) -> Result<(), ConfigError> {
    let found = schema
        .get(&def.name)
        .ok_or_else(|| ConfigError::MissingVariable {
            name: def.name.clone(),
            required_by: required_by.to_string(),
        })?;
    if found.kind != def.kind || found.column_type != def.column_type {
        let kind = match def.kind {
            VariableKind::Particle => "particle",
            VariableKind::Instance => "instance",
        };
        return Err(ConfigError::WrongVariableKind {
            name: def.name.clone(),
            expected: format!("a {} {kind} variable", def.column_type),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        assert!(ModelConfig::default().validate().is_ok());
        let c = ModelConfig::default();
        assert_eq!(c.advection, Advection::Rk4);
        assert_eq!(c.horizontal_boundary, HorizontalBoundary::Stay);
        assert_eq!(c.bottom_clamp_factor, 0.99);
    }

    #[test]
    fn rejects_bad_dt() {
        let c = ModelConfig::new(SimTime(0), SimTime(10), 0);
        assert_eq!(c.validate(), Err(ConfigError::InvalidDt { value: 0 }));
    }

    #[test]
    fn rejects_empty_window() {
        let c = ModelConfig::new(SimTime(10), SimTime(10), 1);
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidTimeWindow { .. })
        ));
    }

    #[test]
    fn rejects_negative_diffusivity() {
        let mut c = ModelConfig::default();
        c.vertical_diffusivity = -1.0;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidDiffusivity { .. })
        ));
        c.vertical_diffusivity = f64::NAN;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_bad_clamp_factor() {
        let mut c = ModelConfig::default();
        c.bottom_clamp_factor = 1.5;
        assert!(matches!(
            c.validate(),
            Err(ConfigError::InvalidClampFactor { .. })
        ));
    }

    #[test]
    fn num_steps_rounds_up() {
        assert_eq!(ModelConfig::new(SimTime(0), SimTime(10), 3).num_steps(), 4);
        assert_eq!(ModelConfig::new(SimTime(0), SimTime(9), 3).num_steps(), 3);
    }

    #[test]
    fn tracking_schema_includes_lonlat_when_configured() {
        let mut c = ModelConfig::default();
        assert!(!c.tracking_schema([]).unwrap().contains(VAR_LON));
        c.compute_lonlat = true;
        let s = c.tracking_schema([VariableDef::instance("temp")]).unwrap();
        assert!(s.contains(VAR_LON) && s.contains(VAR_LAT) && s.contains("temp"));
        assert_eq!(
            s.get(VAR_RELEASE_TIME).unwrap().kind,
            VariableKind::Particle
        );
    }

    #[test]
    fn duplicate_extra_variable_is_schema_error() {
        let c = ModelConfig::default();
        let err = c.tracking_schema([VariableDef::instance("X")]).unwrap_err();
        assert!(matches!(err, ConfigError::Schema(_)));
    }

    #[test]
    fn require_variable_checks_kind() {
        let c = ModelConfig::default();
        let s = c.tracking_schema([]).unwrap();
        assert!(require_variable(&s, &VariableDef::instance("X"), "test").is_ok());
        assert!(matches!(
            require_variable(&s, &VariableDef::particle("X"), "test"),
            Err(ConfigError::WrongVariableKind { .. })
        ));
        assert!(matches!(
            require_variable(&s, &VariableDef::instance("age"), "test"),
            Err(ConfigError::MissingVariable { .. })
        ));
    }
}
