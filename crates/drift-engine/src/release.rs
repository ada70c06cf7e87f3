//! Scheduled particle release.
//!
//! A [`ParticleReleaser`] turns an ordered list of [`ReleaseRow`]s into
//! a schedule keyed by step index and hands out one merged
//! [`ReleaseBatch`] per due step, numbering particles from a monotonic
//! pid counter.

use std::collections::BTreeMap;
use std::fmt;

use drift_core::{Column, ColumnType, ParticleId, Schema, SimTime, StepIndex, Value, VariableKind};
use indexmap::IndexMap;
use tracing::{info, info_span, warn};

use crate::config::{ConfigError, ModelConfig, VAR_RELEASE_TIME, VAR_X, VAR_Y, VAR_Z};

/// One release event: `multiplicity` particles at one position.
#[derive(Clone, Debug, PartialEq)]
pub struct ReleaseRow {
    /// Scheduled release time.
    pub time: SimTime,
    /// Number of identical particles released.
    pub multiplicity: u32,
    /// Grid X coordinate.
    pub x: f64,
    /// Grid Y coordinate.
    pub y: f64,
    /// Depth in metres.
    pub z: f64,
    /// Values of the declared release attributes, in
    /// [`ReleaseConfig::attributes`] order.
    pub attributes: Vec<Value>,
}

impl ReleaseRow {
    /// A row without attributes.
    pub fn new(time: SimTime, multiplicity: u32, x: f64, y: f64, z: f64) -> Self {
        Self {
            time,
            multiplicity,
            x,
            y,
            z,
            attributes: Vec::new(),
        }
    }

    /// Attach attribute values.
    pub fn with_attributes(mut self, attributes: Vec<Value>) -> Self {
        self.attributes = attributes;
        self
    }
}

/// How release rows become release events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReleaseMode {
    /// Exactly the given rows.
    #[default]
    Discrete,
    /// Each distinct release time's rows recur every `period` seconds
    /// until the next distinct time, the last until the stop time.
    Continuous {
        /// Recurrence period in seconds.
        period: i64,
    },
}

/// Release schedule settings.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReleaseConfig {
    /// Discrete or continuous release.
    pub mode: ReleaseMode,
    /// Names of the variables each row's `attributes` set, in order.
    pub attributes: Vec<String>,
}

/// A non-fatal problem found while building the schedule.
#[derive(Clone, Debug, PartialEq)]
pub enum ReleaseWarning {
    /// Rows scheduled before the start time were dropped.
    BeforeStart {
        /// Rows dropped.
        rows: usize,
        /// The earliest dropped time.
        earliest: SimTime,
    },
    /// Rows scheduled at or after the stop time were dropped.
    AtOrAfterStop {
        /// Rows dropped.
        rows: usize,
        /// The latest dropped time.
        latest: SimTime,
    },
    /// Nothing is released at the start time.
    NoReleaseAtStart {
        /// The first release time kept.
        first: SimTime,
    },
    /// No row falls inside the run.
    NoReleases,
}

impl fmt::Display for ReleaseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BeforeStart { rows, earliest } => {
                write!(f, "{rows} release rows before start time ignored (earliest {earliest})")
            }
            Self::AtOrAfterStop { rows, latest } => {
                write!(f, "{rows} release rows at or after stop time ignored (latest {latest})")
            }
            Self::NoReleaseAtStart { first } => {
                write!(f, "no particles at start time; first release at {first}")
            }
            Self::NoReleases => write!(f, "no release rows inside the run"),
        }
    }
}

/// Particles released at one step, as typed columns aligned with `pid`.
///
/// Columns hold `X`, `Y`, `Z`, `release_time`, and every declared
/// attribute.
#[derive(Clone, Debug, PartialEq)]
pub struct ReleaseBatch {
    /// The step the batch is released at.
    pub step: StepIndex,
    /// New particle identifiers.
    pub pid: Vec<ParticleId>,
    /// Variable values, one entry per particle.
    pub columns: IndexMap<String, Column>,
}

impl ReleaseBatch {
    /// Number of particles.
    pub fn len(&self) -> usize {
        self.pid.len()
    }

    /// Returns `true` if the batch has no particles.
    pub fn is_empty(&self) -> bool {
        self.pid.is_empty()
    }
}

/// A declared release attribute, resolved against the schema.
#[derive(Clone, Debug)]
struct Attribute {
    name: String,
    kind: VariableKind,
    column_type: ColumnType,
}

/// Time-indexed release schedule.
#[derive(Debug)]
pub struct ParticleReleaser {
    schedule: BTreeMap<u64, Vec<ReleaseRow>>,
    steps: Vec<StepIndex>,
    attributes: Vec<Attribute>,
    warnings: Vec<ReleaseWarning>,
    next_pid: u64,
    total: u64,
}

impl ParticleReleaser {
    /// Build the schedule.
    ///
    /// Rows must be in time order. Rows outside `[start_time,
    /// stop_time)` are dropped with a recorded warning.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::UnknownAttribute`] for an attribute missing from
    ///   the schema or naming a variable the releaser sets itself
    /// - [`ConfigError::ReleaseRowWidth`] / [`ConfigError::ReleaseValueType`]
    ///   for rows that do not match the declared attributes
    /// - [`ConfigError::UnorderedRelease`] for out-of-order rows
    /// - [`ConfigError::InvalidReleasePeriod`] for a non-positive period
    pub fn new(
        config: &ModelConfig,
        release: &ReleaseConfig,
        schema: &Schema,
        rows: Vec<ReleaseRow>,
    ) -> Result<Self, ConfigError> {
        let _span = info_span!("releaser").entered();
        config.validate()?;
        let attributes = resolve_attributes(release, schema)?;
        check_rows(&rows, schema, &release.attributes)?;

        let rows = match release.mode {
            ReleaseMode::Discrete => rows,
            ReleaseMode::Continuous { period } => expand_continuous(rows, period, config.stop_time)?,
        };

        let mut warnings = Vec::new();
        let (before, rest): (Vec<_>, Vec<_>) =
            rows.into_iter().partition(|r| r.time < config.start_time);
        let (kept, after): (Vec<_>, Vec<_>) =
            rest.into_iter().partition(|r| r.time < config.stop_time);
        if let Some(first) = before.first() {
            warnings.push(ReleaseWarning::BeforeStart {
                rows: before.len(),
                earliest: first.time,
            });
        }
        if let Some(last) = after.last() {
            warnings.push(ReleaseWarning::AtOrAfterStop {
                rows: after.len(),
                latest: last.time,
            });
        }
        match kept.first() {
            None => warnings.push(ReleaseWarning::NoReleases),
            Some(first) if first.time > config.start_time => {
                warnings.push(ReleaseWarning::NoReleaseAtStart { first: first.time })
            }
            Some(_) => {}
        }
        for w in &warnings {
            warn!(warning = %w, "release schedule");
        }

        let clock = config.clock();
        let total: u64 = kept.iter().map(|r| u64::from(r.multiplicity)).sum();
        let window = kept.first().zip(kept.last()).map(|(f, l)| (f.time, l.time));
        let mut schedule: BTreeMap<u64, Vec<ReleaseRow>> = BTreeMap::new();
        for row in kept {
            // Kept rows are at or after the start, so a step always exists.
            let step = clock.step_of(row.time).map_or(0, |s| s.0);
            schedule.entry(step).or_default().push(row);
        }
        if let Some((first, last)) = window {
            info!(
                first = %first,
                last = %last,
                release_steps = schedule.len(),
                total_particles = total,
                "release schedule built"
            );
        }
        let steps = schedule.keys().map(|&s| StepIndex(s)).collect();

        Ok(Self {
            schedule,
            steps,
            attributes,
            warnings,
            next_pid: 0,
            total,
        })
    }

    /// Start numbering at `pid`, e.g. when resuming a run.
    pub fn with_first_pid(mut self, pid: ParticleId) -> Self {
        self.next_pid = pid.0;
        self
    }

    /// The pid the next released particle will receive.
    pub fn next_pid(&self) -> ParticleId {
        ParticleId(self.next_pid)
    }

    /// Warnings recorded while building the schedule.
    pub fn warnings(&self) -> &[ReleaseWarning] {
        &self.warnings
    }

    /// Every step with a release, ascending, including emitted ones.
    pub fn release_steps(&self) -> &[StepIndex] {
        &self.steps
    }

    /// Particles released over the whole run.
    pub fn total_particle_count(&self) -> u64 {
        self.total
    }

    /// Particles scheduled but not yet emitted.
    pub fn remaining_particle_count(&self) -> u64 {
        self.schedule
            .values()
            .flatten()
            .map(|r| u64::from(r.multiplicity))
            .sum()
    }

    /// Emit every not-yet-emitted release due at or before `step` as one
    /// batch, in schedule order. `None` when nothing is due.
    pub fn pending(&mut self, step: StepIndex) -> Option<ReleaseBatch> {
        let later = self.schedule.split_off(&step.0.saturating_add(1));
        let due = std::mem::replace(&mut self.schedule, later);
        let rows: Vec<ReleaseRow> = due.into_values().flatten().collect();
        let n: usize = rows.iter().map(|r| r.multiplicity as usize).sum();
        if n == 0 {
            return None;
        }

        let mut columns: IndexMap<String, Column> = IndexMap::new();
        let mut x = Vec::with_capacity(n);
        let mut y = Vec::with_capacity(n);
        let mut z = Vec::with_capacity(n);
        let mut t = Vec::with_capacity(n);
        for r in &rows {
            let m = r.multiplicity as usize;
            x.resize(x.len() + m, r.x);
            y.resize(y.len() + m, r.y);
            z.resize(z.len() + m, r.z);
            t.resize(t.len() + m, r.time.seconds());
        }
        columns.insert(VAR_X.to_string(), Column::Float(x));
        columns.insert(VAR_Y.to_string(), Column::Float(y));
        columns.insert(VAR_Z.to_string(), Column::Float(z));
        columns.insert(VAR_RELEASE_TIME.to_string(), Column::Int(t));
        for (k, attr) in self.attributes.iter().enumerate() {
            let mut col = Column::new(attr.column_type);
            for r in &rows {
                let m = r.multiplicity as usize;
                match r.attributes.get(k) {
                    Some(&v) => {
                        // Types were checked in `new`. A mismatch leaves the
                        // column short, and appending the batch then fails.
                        let pushed = col.push_repeated(v, m);
                        debug_assert!(
                            pushed.is_ok(),
                            "release attribute '{}' has the wrong type",
                            attr.name
                        );
                    }
                    None => col.extend_zeros(m),
                }
            }
            columns.insert(attr.name.clone(), col);
        }

        let pid = (self.next_pid..self.next_pid + n as u64)
            .map(ParticleId)
            .collect();
        self.next_pid += n as u64;
        Some(ReleaseBatch { step, pid, columns })
    }

    /// Split a batch's columns into instance and particle variables.
    pub(crate) fn split_columns(
        &self,
        columns: IndexMap<String, Column>,
    ) -> (IndexMap<String, Column>, IndexMap<String, Column>) {
        let mut instance = IndexMap::new();
        let mut particle = IndexMap::new();
        for (name, col) in columns {
            let is_particle = name == VAR_RELEASE_TIME
                || self
                    .attributes
                    .iter()
                    .any(|a| a.name == name && a.kind == VariableKind::Particle);
            if is_particle {
                particle.insert(name, col);
            } else {
                instance.insert(name, col);
            }
        }
        (instance, particle)
    }
}

/// Look up each attribute in the schema, rejecting variables the
/// releaser sets itself.
fn resolve_attributes(
    release: &ReleaseConfig,
    schema: &Schema,
) -> Result<Vec<Attribute>, ConfigError> {
    release
        .attributes
        .iter()
        .map(|name| {
            let reserved = [VAR_X, VAR_Y, VAR_Z, VAR_RELEASE_TIME].contains(&name.as_str());
            match schema.get(name) {
                Some(def) if !reserved => Ok(Attribute {
                    name: name.clone(),
                    kind: def.kind,
                    column_type: def.column_type,
                }),
                _ => Err(ConfigError::UnknownAttribute { name: name.clone() }),
            }
        })
        .collect()
}

fn check_rows(rows: &[ReleaseRow], schema: &Schema, names: &[String]) -> Result<(), ConfigError> {
    for (index, row) in rows.iter().enumerate() {
        if index > 0 && row.time < rows[index - 1].time {
            return Err(ConfigError::UnorderedRelease { index });
        }
        if row.attributes.len() != names.len() {
            return Err(ConfigError::ReleaseRowWidth {
                index,
                expected: names.len(),
                found: row.attributes.len(),
            });
        }
        for (name, value) in names.iter().zip(&row.attributes) {
            let matches = schema
                .get(name)
                .is_some_and(|d| d.column_type == value.column_type());
            if !matches {
                return Err(ConfigError::ReleaseValueType {
                    index,
                    name: name.clone(),
                });
            }
        }
    }
    Ok(())
}

/// Repeat each distinct time's rows every `period` until the next
/// distinct time, or `stop` for the last.
fn expand_continuous(
    rows: Vec<ReleaseRow>,
    period: i64,
    stop: SimTime,
) -> Result<Vec<ReleaseRow>, ConfigError> {
    if period <= 0 {
        return Err(ConfigError::InvalidReleasePeriod { value: period });
    }
    let mut groups: Vec<(SimTime, Vec<ReleaseRow>)> = Vec::new();
    for row in rows {
        match groups.last_mut() {
            Some((t, group)) if *t == row.time => group.push(row),
            _ => groups.push((row.time, vec![row])),
        }
    }
    let mut out = Vec::new();
    for g in 0..groups.len() {
        let end = groups.get(g + 1).map_or(stop, |(t, _)| *t);
        let (start, group) = &groups[g];
        let mut t = *start;
        loop {
            for row in group {
                out.push(ReleaseRow {
                    time: t,
                    ..row.clone()
                });
            }
            t = t + period;
            if t >= end {
                break;
            }
        }
    }
    Ok(out)
}
