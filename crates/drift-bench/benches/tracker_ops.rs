//! Criterion micro-benchmarks for the advection and diffusion kernels.

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion};
use drift_bench::{profile_forcing, profile_grid, release_positions, GRID_SIZE};
use drift_core::{Column, ParticleId, SimTime, StepIndex};
use drift_engine::{Advection, ModelConfig, Population, Tracker};
use drift_forcing::Forcing;
use indexmap::IndexMap;

const T0: i64 = 1_403_481_600;

fn population(config: &ModelConfig, n: usize) -> Population {
    let schema = config.tracking_schema([]).unwrap();
    let mut population = Population::new(&schema);
    let (mut x, mut y, mut z) = (Vec::new(), Vec::new(), Vec::new());
    for (px, py, pz) in release_positions(n, GRID_SIZE, 3) {
        x.push(px);
        y.push(py);
        z.push(pz);
    }
    let mut columns = IndexMap::new();
    columns.insert("X".to_string(), Column::Float(x));
    columns.insert("Y".to_string(), Column::Float(y));
    columns.insert("Z".to_string(), Column::Float(z));
    let pid: Vec<ParticleId> = (0..n as u64).map(ParticleId).collect();
    population.append(&pid, &columns).unwrap();
    population
}

fn bench_advection(c: &mut Criterion, name: &str, advection: Advection, diffusivity: f64) {
    let grid = profile_grid();
    let mut forcing = profile_forcing();
    forcing.advance(SimTime(T0)).unwrap();
    let mut config = ModelConfig::new(SimTime(T0), SimTime(T0 + 3600), 600);
    config.advection = advection;
    config.diffusivity = diffusivity;
    let tracker = Tracker::new(&config);
    let base = population(&config, 10_000);

    c.bench_function(name, |b| {
        b.iter_batched(
            || base.clone(),
            |mut p| {
                tracker
                    .step(&grid, &forcing, &mut p, SimTime(T0), StepIndex(0))
                    .unwrap();
                black_box(p)
            },
            BatchSize::LargeInput,
        );
    });
}

/// Benchmark: forward Euler over 10K particles in layered forcing.
fn bench_euler_10k(c: &mut Criterion) {
    bench_advection(c, "euler_10k", Advection::Euler, 0.0);
}

/// Benchmark: RK4 over 10K particles (four velocity evaluations).
fn bench_rk4_10k(c: &mut Criterion) {
    bench_advection(c, "rk4_10k", Advection::Rk4, 0.0);
}

/// Benchmark: RK4 plus seeded horizontal diffusion.
fn bench_rk4_diffusion_10k(c: &mut Criterion) {
    bench_advection(c, "rk4_diffusion_10k", Advection::Rk4, 1.0);
}

criterion_group!(
    benches,
    bench_euler_10k,
    bench_rk4_10k,
    bench_rk4_diffusion_10k
);
criterion_main!(benches);
