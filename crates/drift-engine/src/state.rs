//! The particle state and its fixed per-step update sequence.

use drift_core::{Clock, Column, ParticleId, Schema, SimTime, StepIndex};
use drift_forcing::Forcing;
use drift_grid::Grid;
use indexmap::IndexMap;
use tracing::{debug, debug_span, info};

use crate::behavior::{Behavior, BehaviorContext, NoBehavior};
use crate::config::{
    require_variable, ConfigError, HorizontalBoundary, ModelConfig, VAR_LAT, VAR_LON,
};
use crate::error::StepError;
use crate::particles::ParticleTable;
use crate::population::Population;
use crate::release::{ParticleReleaser, ReleaseBatch};
use crate::tracker::Tracker;

/// Per-step counts returned by [`State::update`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct StepReport {
    /// The step just computed.
    pub step: StepIndex,
    /// Particles released at the start of the step.
    pub released: usize,
    /// Particles removed by boundary policy or behaviour.
    pub removed: usize,
    /// Live particles after the step.
    pub live: usize,
}

/// Everything an output writer needs after a step, index-aligned.
#[derive(Clone, Debug, PartialEq)]
pub struct OutputFrame {
    /// The step the frame belongs to (the next step to be computed).
    pub step: StepIndex,
    /// Time the positions refer to.
    pub time: SimTime,
    /// Live particle identifiers.
    pub pid: Vec<ParticleId>,
    /// Every instance variable, aligned with `pid`.
    pub variables: IndexMap<String, Column>,
}

/// Owner of the live particle arrays.
///
/// `update` runs, in order:
///
/// 1. release of particles due at the current step
/// 2. mark every particle alive
/// 3. advection and diffusion ([`Tracker`])
/// 4. the behaviour capability, if any
/// 5. boundary policy: horizontal (`Stay` or `Kill` off the wet
///    domain), then vertical (reflect at the surface, clamp to
///    `bottom_clamp_factor * H` below the bottom)
/// 6. derived `lon`/`lat`, if configured
/// 7. compaction of dead particles
///
/// and then advances the clock. Between calls the pid array and every
/// instance variable have the same length and alignment.
///
/// If `update` returns an error, the arrays are still aligned but the
/// step is incomplete and the clock has not advanced.
pub struct State {
    config: ModelConfig,
    schema: Schema,
    clock: Clock,
    population: Population,
    particles: ParticleTable,
    releaser: ParticleReleaser,
    tracker: Tracker,
    behavior: Box<dyn Behavior>,
    released_at: Option<StepIndex>,
}

impl State {
    /// An empty state at the start of the run.
    ///
    /// # Errors
    ///
    /// - configuration errors from [`ModelConfig::validate`]
    /// - [`ConfigError::MissingVariable`] or
    ///   [`ConfigError::WrongVariableKind`] if the schema lacks a
    ///   tracking variable or a variable the behaviour declares
    pub fn new(
        config: ModelConfig,
        schema: Schema,
        releaser: ParticleReleaser,
        behavior: Option<Box<dyn Behavior>>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        for def in config.tracking_variables() {
            require_variable(&schema, &def, "the tracking engine")?;
        }
        let behavior = behavior.unwrap_or_else(|| Box::new(NoBehavior));
        for def in behavior.variables() {
            require_variable(&schema, &def, behavior.name())?;
        }

        info!(
            start = %config.start_time,
            stop = %config.stop_time,
            dt = config.dt,
            steps = config.num_steps(),
            advection = ?config.advection,
            diffusivity = config.diffusivity,
            behavior = behavior.name(),
            particles = releaser.total_particle_count(),
            "particle state initialised"
        );

        Ok(Self {
            clock: config.clock(),
            population: Population::new(&schema),
            particles: ParticleTable::new(&schema, releaser.next_pid()),
            tracker: Tracker::new(&config),
            config,
            schema,
            releaser,
            behavior,
            released_at: None,
        })
    }

    /// The configuration.
    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    /// The variable schema.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The model clock, at the next step to compute.
    pub fn clock(&self) -> &Clock {
        &self.clock
    }

    /// Live particles.
    pub fn population(&self) -> &Population {
        &self.population
    }

    /// Particle variables of every particle ever released.
    pub fn particles(&self) -> &ParticleTable {
        &self.particles
    }

    /// The release schedule.
    pub fn releaser(&self) -> &ParticleReleaser {
        &self.releaser
    }

    /// Number of live particles.
    pub fn len(&self) -> usize {
        self.population.len()
    }

    /// Returns `true` if no particles are live.
    pub fn is_empty(&self) -> bool {
        self.population.is_empty()
    }

    /// Returns `true` once the clock has reached the stop time.
    pub fn finished(&self) -> bool {
        self.clock.now() >= self.config.stop_time
    }

    /// Merge a release batch into the live arrays. Instance variables
    /// absent from the batch are zero-filled. A rejected batch changes
    /// nothing.
    pub fn append(&mut self, batch: ReleaseBatch) -> Result<usize, StepError> {
        let pid = batch.pid;
        let (instance, particle) = self.releaser.split_columns(batch.columns);
        self.particles.check_batch(&pid, &particle)?;
        self.population.check_batch(&pid, &instance)?;
        self.particles.append(&pid, &particle)?;
        self.population.append(&pid, &instance)?;
        Ok(pid.len())
    }

    /// Append the batch due at the current step, at most once per step.
    /// Returns the number of particles released.
    pub fn release_pending(&mut self) -> Result<usize, StepError> {
        let step = self.clock.step();
        if self.released_at == Some(step) {
            return Ok(0);
        }
        self.released_at = Some(step);
        match self.releaser.pending(step) {
            Some(batch) => self.append(batch),
            None => Ok(0),
        }
    }

    /// Compute one step.
    pub fn update(
        &mut self,
        grid: &dyn Grid,
        forcing: &mut dyn Forcing,
    ) -> Result<StepReport, StepError> {
        let step = self.clock.step();
        let now = self.clock.now();
        let _span = debug_span!("update", step = step.0).entered();

        let released = self.release_pending()?;
        forcing.advance(now)?;

        self.population.mark_all_alive();
        let before = (self.population.x().to_vec(), self.population.y().to_vec());

        self.tracker
            .step(grid, &*forcing, &mut self.population, now, step)?;

        let n = self.population.len();
        let mut ctx = BehaviorContext {
            grid,
            forcing: &*forcing,
            population: &mut self.population,
            particles: &self.particles,
            step,
            time: now + self.config.dt,
            dt: self.config.dt,
        };
        self.behavior.update(&mut ctx)?;
        self.population.check_invariants().map_err(|reason| StepError::Invariant {
            reason: format!("after behavior '{}': {reason}", self.behavior.name()),
        })?;
        if self.population.len() != n {
            return Err(StepError::Invariant {
                reason: format!("behavior '{}' changed the particle count", self.behavior.name()),
            });
        }

        self.apply_horizontal_boundary(grid, &before.0, &before.1);
        self.apply_vertical_boundary(grid)?;
        if self.config.compute_lonlat {
            self.update_lonlat(grid)?;
        }

        let removed = self.population.compact();
        self.population
            .check_invariants()
            .map_err(|reason| StepError::Invariant { reason })?;
        self.clock.advance();

        let report = StepReport {
            step,
            released,
            removed,
            live: self.population.len(),
        };
        debug!(
            released = report.released,
            removed = report.removed,
            live = report.live,
            "step complete"
        );
        Ok(report)
    }

    /// Particles that left the wet domain go back (`Stay`) or die
    /// (`Kill`). NaN positions are left for the caller to see.
    fn apply_horizontal_boundary(&mut self, grid: &dyn Grid, x0: &[f64], y0: &[f64]) {
        let wet = grid.at_sea(self.population.x(), self.population.y());
        let policy = self.config.horizontal_boundary;
        let offending: Vec<usize> = (0..wet.len())
            .filter(|&k| {
                !wet[k] && !self.population.x()[k].is_nan() && !self.population.y()[k].is_nan()
            })
            .collect();
        match policy {
            HorizontalBoundary::Stay => {
                let (x, y, _) = self.population.positions_mut();
                for &k in &offending {
                    x[k] = x0[k];
                    y[k] = y0[k];
                }
            }
            HorizontalBoundary::Kill => {
                let alive = self.population.alive_mut();
                for &k in &offending {
                    alive[k] = false;
                }
            }
        }
    }

    /// Reflect every live particle at the surface, then clamp those
    /// inside the grid below the bottom. Without a depth field on the
    /// grid only the surface reflection applies.
    fn apply_vertical_boundary(&mut self, grid: &dyn Grid) -> Result<(), StepError> {
        let alive = self.population.alive().to_vec();
        {
            let (_, _, z) = self.population.positions_mut();
            for (zk, _) in z.iter_mut().zip(&alive).filter(|(_, &a)| a) {
                if *zk < 0.0 {
                    *zk = -*zk;
                }
            }
        }

        if !grid.has_field(&self.config.depth_field) {
            return Ok(());
        }
        let inside = grid.contains(self.population.x(), self.population.y());
        let idx: Vec<usize> = (0..inside.len())
            .filter(|&k| inside[k] && alive[k])
            .collect();
        let gx: Vec<f64> = idx.iter().map(|&k| self.population.x()[k]).collect();
        let gy: Vec<f64> = idx.iter().map(|&k| self.population.y()[k]).collect();
        let h = grid.sample_scalar_field(&self.config.depth_field, &gx, &gy)?;

        let factor = self.config.bottom_clamp_factor;
        let (_, _, z) = self.population.positions_mut();
        for (&k, hk) in idx.iter().zip(h) {
            if z[k] > hk {
                z[k] = factor * hk;
            }
        }
        Ok(())
    }

    /// Recompute `lon`/`lat`; NaN outside the grid.
    fn update_lonlat(&mut self, grid: &dyn Grid) -> Result<(), StepError> {
        let n = self.population.len();
        let inside = grid.contains(self.population.x(), self.population.y());
        let idx: Vec<usize> = (0..n).filter(|&k| inside[k]).collect();
        let gx: Vec<f64> = idx.iter().map(|&k| self.population.x()[k]).collect();
        let gy: Vec<f64> = idx.iter().map(|&k| self.population.y()[k]).collect();
        let (glon, glat) = grid.lonlat(&gx, &gy)?;

        let mut lon = vec![f64::NAN; n];
        let mut lat = vec![f64::NAN; n];
        for (m, &k) in idx.iter().enumerate() {
            lon[k] = glon[m];
            lat[k] = glat[m];
        }
        for (name, values) in [(VAR_LON, lon), (VAR_LAT, lat)] {
            let target = self
                .population
                .float_mut(name)
                .ok_or_else(|| StepError::Invariant {
                    reason: format!("'{name}' is not a float instance variable"),
                })?;
            target.copy_from_slice(&values);
        }
        Ok(())
    }

    /// The current pid array and every instance variable.
    pub fn output_frame(&self) -> OutputFrame {
        let variables = self
            .population
            .variable_names()
            .filter_map(|name| Some((name.to_string(), self.population.column_owned(name)?)))
            .collect();
        OutputFrame {
            step: self.clock.step(),
            time: self.clock.now(),
            pid: self.population.pid().to_vec(),
            variables,
        }
    }
}
