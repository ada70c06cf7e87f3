//! Where forcing frames come from.

use drift_core::SimTime;

use crate::error::ForcingError;
use crate::snapshot::Snapshot;

/// An ordered record of forcing frames, loaded one at a time.
///
/// File formats live behind this trait; the engine only needs frame
/// times and the ability to load a frame by index. `load` may block.
pub trait SnapshotSource: Send {
    /// Frame times, strictly increasing.
    fn frame_times(&self) -> &[SimTime];

    /// Load frame `index`.
    fn load(&mut self, index: usize) -> Result<Snapshot, ForcingError>;
}

/// A record held entirely in memory.
#[derive(Clone, Debug)]
pub struct MemorySource {
    times: Vec<SimTime>,
    frames: Vec<Snapshot>,
}

impl MemorySource {
    /// Build a record from parallel frame times and snapshots.
    ///
    /// # Errors
    ///
    /// - [`ForcingError::EmptyRecord`] if there are no frames
    /// - [`ForcingError::FrameCount`] if the lengths differ
    /// - [`ForcingError::NonMonotonicRecord`] if times do not strictly
    ///   increase
    pub fn new(times: Vec<SimTime>, frames: Vec<Snapshot>) -> Result<Self, ForcingError> {
        if times.is_empty() {
            return Err(ForcingError::EmptyRecord);
        }
        if times.len() != frames.len() {
            return Err(ForcingError::FrameCount {
                times: times.len(),
                frames: frames.len(),
            });
        }
        if let Some(index) = (1..times.len()).find(|&k| times[k] <= times[k - 1]) {
            return Err(ForcingError::NonMonotonicRecord { index });
        }
        Ok(Self { times, frames })
    }
}

impl SnapshotSource for MemorySource {
    fn frame_times(&self) -> &[SimTime] {
        &self.times
    }

    fn load(&mut self, index: usize) -> Result<Snapshot, ForcingError> {
        self.frames
            .get(index)
            .cloned()
            .ok_or_else(|| ForcingError::Load {
                reason: format!("frame {index} of {}", self.frames.len()),
            })
    }
}
