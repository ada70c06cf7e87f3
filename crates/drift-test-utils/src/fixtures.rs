//! Reusable grid and forcing fixtures.

use drift_core::SimTime;
use drift_forcing::{FieldData, MemorySource, Snapshot, SnapshotForcing, VerticalInterp};
use drift_grid::{Plane, SingleGrid};

/// Bottom depth of [`uniform_grid`], in metres.
pub const FIXTURE_DEPTH: f64 = 100.0;

/// An `nx` by `ny` rectilinear grid with 1 m cells, no land, and a
/// constant bottom depth `"H"` of [`FIXTURE_DEPTH`]. Node `(i, j)` is at
/// lon `5 + 0.01 i`, lat `60 + 0.01 j`.
pub fn uniform_grid(nx: usize, ny: usize) -> SingleGrid {
    SingleGrid::builder(nx, ny)
        .rectilinear(5.0, 60.0, 0.01, 0.01)
        .spacing(1.0, 1.0)
        .field("H", Plane::filled(nx, ny, FIXTURE_DEPTH).expect("non-empty grid"))
        .build()
        .expect("valid uniform grid")
}

/// Snapshot forcing on an `nx` by `ny` grid with one frame every
/// `period` seconds from time 0 for `frames` frames. Frame `k` has
/// uniform `u = k * du` and `v = 0`.
pub fn ramp_forcing(
    nx: usize,
    ny: usize,
    frames: usize,
    period: i64,
    du: f64,
) -> SnapshotForcing<MemorySource> {
    let times = (0..frames).map(|k| SimTime(k as i64 * period)).collect();
    let snapshots = (0..frames)
        .map(|k| {
            let u = Plane::filled(nx, ny, k as f64 * du).expect("non-empty grid");
            let v = Plane::filled(nx, ny, 0.0).expect("non-empty grid");
            Snapshot::new()
                .with_field("u", FieldData::single(u))
                .with_field("v", FieldData::single(v))
        })
        .collect();
    let source = MemorySource::new(times, snapshots).expect("valid record");
    SnapshotForcing::new(source, VerticalInterp::Nearest)
}
