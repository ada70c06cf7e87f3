//! The `Forcing` capability and its snapshot-record implementation.

use drift_core::SimTime;
use drift_grid::Grid;
use tracing::{debug, debug_span};

use crate::error::ForcingError;
use crate::snapshot::{FieldData, Snapshot};
use crate::source::SnapshotSource;
use crate::vertical::{validate_depths, LevelWeight, VerticalInterp};

/// Capability contract for time-varying fields.
///
/// The engine calls [`advance`](Self::advance) once per timestep with
/// the step's start time, then [`sample`](Self::sample) any number of
/// times with times inside the current step.
pub trait Forcing: Send {
    /// Make the frames bracketing `now` available.
    ///
    /// # Errors
    ///
    /// [`ForcingError::TimeOutOfRange`] if the record cannot bracket
    /// `now`.
    fn advance(&mut self, now: SimTime) -> Result<(), ForcingError>;

    /// Sample `field` at grid positions `(x, y)`, depths `z` (metres,
    /// positive downward), and `time` (seconds since the epoch).
    ///
    /// Returns one value per point, in order. NaN positions yield NaN.
    fn sample(
        &self,
        grid: &dyn Grid,
        field: &str,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        time: f64,
    ) -> Result<Vec<f64>, ForcingError>;

    /// Returns `true` if `field` can be sampled.
    fn has_field(&self, field: &str) -> bool;
}

/// A loaded frame and its index in the record.
#[derive(Debug)]
struct Frame {
    index: usize,
    time: SimTime,
    snapshot: Snapshot,
}

/// Forcing backed by a [`SnapshotSource`], holding the two frames that
/// bracket the current time.
///
/// Values are linear in time between the bracket frames. Spatial
/// interpolation is delegated to the grid, and 3-D fields are resolved
/// in the vertical with [`VerticalInterp`] over the configured level
/// depths.
///
/// The bracket is `[t0, t1]` with `t0 <= now < t1`. Samples may be taken
/// at any time inside the record. Times past `t1` are extrapolated
/// linearly from the bracket, so the later stages of a step that
/// straddles a frame boundary stay continuous with its first stage.
pub struct SnapshotForcing<S> {
    source: S,
    depths: Vec<f64>,
    interp: VerticalInterp,
    lower: Option<Frame>,
    upper: Option<Frame>,
    loads: u64,
}

impl<S: SnapshotSource> SnapshotForcing<S> {
    /// Wrap a source. Only 2-D fields are accepted until depth levels
    /// are set with [`with_depths`](Self::with_depths).
    pub fn new(source: S, interp: VerticalInterp) -> Self {
        Self {
            source,
            depths: vec![0.0],
            interp,
            lower: None,
            upper: None,
            loads: 0,
        }
    }

    /// Depths of the levels of 3-D fields, in metres, strictly
    /// increasing.
    pub fn with_depths(mut self, depths: Vec<f64>) -> Result<Self, ForcingError> {
        validate_depths(&depths)?;
        self.depths = depths;
        Ok(self)
    }

    /// The configured level depths.
    pub fn depths(&self) -> &[f64] {
        &self.depths
    }

    /// Frame times of the lower and upper bracket, once advanced.
    pub fn bracket(&self) -> Option<(SimTime, SimTime)> {
        Some((self.lower.as_ref()?.time, self.upper.as_ref()?.time))
    }

    /// Frames loaded from the source so far.
    pub fn loads(&self) -> u64 {
        self.loads
    }

    fn load(&mut self, index: usize) -> Result<Frame, ForcingError> {
        let time = self.source.frame_times()[index];
        debug!(frame = index, time = %time, "loading forcing frame");
        let snapshot = self.source.load(index)?;
        self.loads += 1;
        Ok(Frame {
            index,
            time,
            snapshot,
        })
    }

    /// Resolve one field at one frame.
    fn sample_frame(
        &self,
        frame: &Frame,
        grid: &dyn Grid,
        field: &str,
        x: &[f64],
        y: &[f64],
        z: &[f64],
    ) -> Result<Vec<f64>, ForcingError> {
        let data = frame
            .snapshot
            .get(field)
            .ok_or_else(|| ForcingError::UnknownField {
                name: field.to_string(),
            })?;
        match data.level_count() {
            1 => Ok(grid.sample_planes(data.level(0).unwrap_or(&[]), x, y)?),
            n if n == self.depths.len() => self.sample_layered(data, grid, x, y, z),
            n => Err(ForcingError::LayerMismatch {
                field: field.to_string(),
                expected: self.depths.len(),
                found: n,
            }),
        }
    }

    /// Sample a 3-D field, querying each level only at the points whose
    /// depth needs it.
    fn sample_layered(
        &self,
        data: &FieldData,
        grid: &dyn Grid,
        x: &[f64],
        y: &[f64],
        z: &[f64],
    ) -> Result<Vec<f64>, ForcingError> {
        let weights: Vec<LevelWeight> = z
            .iter()
            .map(|&zi| self.interp.weight(&self.depths, zi))
            .collect();
        let mut lo_val = vec![0.0; x.len()];
        let mut hi_val = vec![0.0; x.len()];

        for level in 0..data.level_count() {
            let idx: Vec<usize> = (0..x.len())
                .filter(|&k| weights[k].lo == level || weights[k].hi == level)
                .collect();
            if idx.is_empty() {
                continue;
            }
            let lx: Vec<f64> = idx.iter().map(|&k| x[k]).collect();
            let ly: Vec<f64> = idx.iter().map(|&k| y[k]).collect();
            let values = grid.sample_planes(data.level(level).unwrap_or(&[]), &lx, &ly)?;
            for (&k, v) in idx.iter().zip(values) {
                if weights[k].lo == level {
                    lo_val[k] = v;
                }
                if weights[k].hi == level {
                    hi_val[k] = v;
                }
            }
        }

        Ok((0..x.len())
            .map(|k| lo_val[k] + weights[k].w * (hi_val[k] - lo_val[k]))
            .collect())
    }
}

impl<S: SnapshotSource> Forcing for SnapshotForcing<S> {
    fn advance(&mut self, now: SimTime) -> Result<(), ForcingError> {
        let _span = debug_span!("forcing", now = %now).entered();
        let times = self.source.frame_times();
        let (first, last) = match (times.first(), times.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(ForcingError::EmptyRecord),
        };
        if now < first || now >= last {
            return Err(ForcingError::TimeOutOfRange {
                time: now.as_f64(),
                start: first,
                end: last,
            });
        }
        let lower = times.partition_point(|&t| t <= now) - 1;
        if self.lower.as_ref().map(|f| f.index) == Some(lower) {
            return Ok(());
        }

        // Load everything new before touching the bracket, so a failed
        // load leaves the previous bracket intact.
        let reuse = self.upper.as_ref().is_some_and(|f| f.index == lower);
        let fresh = if reuse { None } else { Some(self.load(lower)?) };
        let new_upper = self.load(lower + 1)?;
        let new_lower = match fresh.or_else(|| self.upper.take()) {
            Some(frame) => frame,
            None => self.load(lower)?,
        };
        debug!(
            t0 = %new_lower.time,
            t1 = %new_upper.time,
            "forcing bracket advanced"
        );
        self.lower = Some(new_lower);
        self.upper = Some(new_upper);
        Ok(())
    }

    fn sample(
        &self,
        grid: &dyn Grid,
        field: &str,
        x: &[f64],
        y: &[f64],
        z: &[f64],
        time: f64,
    ) -> Result<Vec<f64>, ForcingError> {
        let (Some(lower), Some(upper)) = (&self.lower, &self.upper) else {
            return Err(ForcingError::NotAdvanced);
        };
        if x.len() != z.len() {
            return Err(ForcingError::LengthMismatch {
                points: x.len(),
                depths: z.len(),
            });
        }
        let times = self.source.frame_times();
        let (first, last) = match (times.first(), times.last()) {
            (Some(&f), Some(&l)) => (f, l),
            _ => return Err(ForcingError::EmptyRecord),
        };
        if !(first.as_f64()..=last.as_f64()).contains(&time) {
            return Err(ForcingError::TimeOutOfRange {
                time,
                start: first,
                end: last,
            });
        }
        let (t0, t1) = (lower.time.as_f64(), upper.time.as_f64());

        let a = self.sample_frame(lower, grid, field, x, y, z)?;
        let b = self.sample_frame(upper, grid, field, x, y, z)?;
        let w = (time - t0) / (t1 - t0);
        Ok(a.iter().zip(&b).map(|(&a, &b)| a + w * (b - a)).collect())
    }

    fn has_field(&self, field: &str) -> bool {
        self.lower
            .as_ref()
            .is_some_and(|f| f.snapshot.get(field).is_some())
    }
}
