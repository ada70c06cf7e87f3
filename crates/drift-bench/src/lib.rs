//! Benchmark profiles and utilities for the Drift particle tracker.
//!
//! - [`reference_profile`]: 200x200 grid, 3-level rotating current,
//!   10K particles, sea lice behaviour, one simulated day
//! - [`stress_profile`]: the same setup with 100K particles
//! - [`release_positions`]: deterministic particle scatter via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use drift_behaviors::{SeaLice, AGE, SUPER};
use drift_core::{SimTime, Value, VariableDef};
use drift_engine::{
    Advection, ModelConfig, ParticleReleaser, ReleaseConfig, ReleaseRow, State,
};
use drift_forcing::{FieldData, MemorySource, Snapshot, SnapshotForcing, VerticalInterp};
use drift_grid::{Plane, SingleGrid};

/// Grid nodes per side.
pub const GRID_SIZE: usize = 200;
/// Cell size in metres.
pub const CELL: f64 = 800.0;
/// Forcing level depths in metres.
pub const DEPTHS: [f64; 3] = [0.0, 10.0, 50.0];

const HOUR: i64 = 3600;
const START: i64 = 1_403_481_600; // 2014-06-23 00:00 UTC

/// Everything one benchmark run needs.
pub struct Profile {
    /// The model grid.
    pub grid: SingleGrid,
    /// Hourly forcing for one day.
    pub forcing: SnapshotForcing<MemorySource>,
    /// A fresh particle state.
    pub state: State,
}

/// The profile grid: rectilinear near 60°N with a shelf sloping from 20 m
/// in the west to 120 m in the east.
pub fn profile_grid() -> SingleGrid {
    let n = GRID_SIZE;
    SingleGrid::builder(n, n)
        .rectilinear(4.0, 59.0, 0.0144, 0.0072)
        .spacing(CELL, CELL)
        .field(
            "H",
            Plane::from_fn(n, n, |i, _| 20.0 + 100.0 * i as f64 / (n - 1) as f64).unwrap(),
        )
        .build()
        .unwrap()
}

/// Solid-body rotation about the grid centre, weakening with depth and
/// tidally modulated over the day, plus uniform temperature and salinity.
pub fn profile_forcing() -> SnapshotForcing<MemorySource> {
    let n = GRID_SIZE;
    let c = (n - 1) as f64 / 2.0;
    let omega = 1e-5;
    let frames = 25;

    let times = (0..frames).map(|k| SimTime(START + k as i64 * HOUR)).collect();
    let snapshots = (0..frames)
        .map(|k| {
            let tide = 1.0 + 0.3 * (2.0 * std::f64::consts::PI * k as f64 / 12.42).sin();
            let u = |_: f64, j: f64| -omega * (j - c) * CELL * tide;
            let v = |i: f64, _: f64| omega * (i - c) * CELL * tide;
            Snapshot::new()
                .with_field("u", FieldData::layered(layers(u)))
                .with_field("v", FieldData::layered(layers(v)))
                .with_field("temp", FieldData::single(Plane::filled(n, n, 9.0).unwrap()))
                .with_field("salt", FieldData::single(Plane::filled(n, n, 33.0).unwrap()))
        })
        .collect();
    let source = MemorySource::new(times, snapshots).unwrap();
    SnapshotForcing::new(source, VerticalInterp::Linear)
        .with_depths(DEPTHS.to_vec())
        .unwrap()
}

/// One plane per level of [`DEPTHS`], decaying with depth.
fn layers(f: impl Fn(f64, f64) -> f64) -> Vec<Vec<Plane>> {
    DEPTHS
        .iter()
        .map(|d| {
            let decay = (-d / 40.0).exp();
            vec![Plane::from_fn(GRID_SIZE, GRID_SIZE, |i, j| decay * f(i as f64, j as f64)).unwrap()]
        })
        .collect()
}

/// Build the reference profile: 10K particles released at the start.
pub fn reference_profile(seed: u64) -> Profile {
    profile(10_000, seed)
}

/// Build the stress profile: 100K particles released at the start.
pub fn stress_profile(seed: u64) -> Profile {
    profile(100_000, seed)
}

fn profile(particles: usize, seed: u64) -> Profile {
    let mut config = ModelConfig::new(SimTime(START), SimTime(START + 24 * HOUR), 600);
    config.advection = Advection::Rk4;
    config.diffusivity = 1.0;
    config.seed = seed;
    let schema = config
        .tracking_schema([VariableDef::instance(SUPER), VariableDef::instance(AGE)])
        .unwrap();
    let release = ReleaseConfig {
        attributes: vec![SUPER.to_string()],
        ..ReleaseConfig::default()
    };
    let rows = release_positions(particles, GRID_SIZE, seed)
        .into_iter()
        .map(|(x, y, z)| {
            ReleaseRow::new(SimTime(START), 1, x, y, z).with_attributes(vec![Value::Float(1.0)])
        })
        .collect();
    let releaser = ParticleReleaser::new(&config, &release, &schema, rows).unwrap();
    let lice = SeaLice::builder()
        .vertical_mixing(1e-3)
        .seed_offset(!seed)
        .build()
        .unwrap();
    let state = State::new(config, schema, releaser, Some(Box::new(lice))).unwrap();
    Profile {
        grid: profile_grid(),
        forcing: profile_forcing(),
        state,
    }
}

/// Deterministic `(x, y, z)` release positions inside the central half
/// of an `n` by `n` grid, at depths between 0 and 20 m.
pub fn release_positions(count: usize, n: usize, seed: u64) -> Vec<(f64, f64, f64)> {
    let span = n as f64 / 2.0;
    let lo = n as f64 / 4.0;
    let unit = |k: u64, mul: u64| {
        let h = seed.wrapping_mul(6364136223846793005).wrapping_add(k.wrapping_mul(mul));
        (h >> 11) as f64 / (1u64 << 53) as f64
    };
    (0..count as u64)
        .map(|k| {
            (
                lo + span * unit(k, 1442695040888963407),
                lo + span * unit(k, 2862933555777941757),
                20.0 * unit(k, 3202034522624059733),
            )
        })
        .collect()
}
