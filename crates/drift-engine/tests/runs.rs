use std::collections::HashSet;

use drift_core::SimTime;
use drift_engine::{
    Advection, ModelConfig, ParticleReleaser, ReleaseConfig, ReleaseMode, ReleaseRow, State,
};
use drift_test_utils::{kill_where, ramp_forcing, uniform_grid, ConstantForcing};
use proptest::prelude::*;

fn build(config: ModelConfig, release: ReleaseConfig, rows: Vec<ReleaseRow>) -> State {
    let schema = config.tracking_schema([]).unwrap();
    let releaser = ParticleReleaser::new(&config, &release, &schema, rows).unwrap();
    State::new(config, schema, releaser, None).unwrap()
}

#[test]
fn time_varying_forcing_euler_and_rk4() {
    let grid = uniform_grid(30, 30);
    let rows = || vec![ReleaseRow::new(SimTime(0), 1, 5.0, 5.0, 0.0)];

    for (advection, expected) in [(Advection::Euler, 3.0), (Advection::Rk4, 4.5)] {
        let mut config = ModelConfig::new(SimTime(0), SimTime(30), 10);
        config.advection = advection;
        let mut forcing = ramp_forcing(30, 30, 4, 10, 0.1);
        let mut s = build(config, ReleaseConfig::default(), rows());
        while !s.finished() {
            s.update(&grid, &mut forcing).unwrap();
        }
        let moved = s.population().x()[0] - 5.0;
        assert!(
            (moved - expected).abs() < 1e-12,
            "{advection:?}: moved {moved}, expected {expected}"
        );
        assert_eq!(forcing.loads(), 4);
    }
}

#[test]
fn steps_may_straddle_forcing_frames() {
    // u = 0.01 t m/s on 1 m cells, frames every 10 s, dt = 4 s.
    let grid = uniform_grid(30, 30);
    for (advection, expected) in [(Advection::Euler, 3.36), (Advection::Rk4, 3.92)] {
        let mut config = ModelConfig::new(SimTime(0), SimTime(28), 4);
        config.advection = advection;
        let mut forcing = ramp_forcing(30, 30, 4, 10, 0.1);
        let mut s = build(
            config,
            ReleaseConfig::default(),
            vec![ReleaseRow::new(SimTime(0), 1, 5.0, 5.0, 0.0)],
        );
        while !s.finished() {
            let t = s.clock().now();
            s.update(&grid, &mut forcing)
                .unwrap_or_else(|e| panic!("{advection:?} at {t}: {e}"));
        }
        let moved = s.population().x()[0] - 5.0;
        assert!(
            (moved - expected).abs() < 1e-9,
            "{advection:?}: moved {moved}, expected {expected}"
        );
        assert_eq!(forcing.loads(), 4);
    }
}

#[test]
fn runs_past_the_forcing_record_fail() {
    let grid = uniform_grid(30, 30);
    let config = ModelConfig::new(SimTime(0), SimTime(40), 10);
    let mut forcing = ramp_forcing(30, 30, 4, 10, 0.1);
    let mut s = build(
        config,
        ReleaseConfig::default(),
        vec![ReleaseRow::new(SimTime(0), 1, 5.0, 5.0, 0.0)],
    );
    for _ in 0..3 {
        s.update(&grid, &mut forcing).unwrap();
    }
    assert!(s.update(&grid, &mut forcing).is_err());
}

fn diffusive_run(seed: u64) -> Vec<f64> {
    let grid = uniform_grid(200, 200);
    let mut config = ModelConfig::new(SimTime(0), SimTime(20), 1);
    config.diffusivity = 0.5;
    config.vertical_diffusivity = 0.01;
    config.seed = seed;
    let mut forcing = ConstantForcing::velocity(0.1, -0.1);
    let mut s = build(
        config,
        ReleaseConfig::default(),
        vec![ReleaseRow::new(SimTime(0), 50, 100.0, 100.0, 10.0)],
    );
    while !s.finished() {
        s.update(&grid, &mut forcing).unwrap();
    }
    let p = s.population();
    p.x().iter().chain(p.y()).chain(p.z()).copied().collect()
}

#[test]
fn diffusion_is_reproducible_for_a_seed() {
    let a = diffusive_run(7);
    let b = diffusive_run(7);
    assert_eq!(a, b);
    assert_ne!(a, diffusive_run(8));
    // Particles released at one point have spread out.
    assert!(a[..50].iter().any(|&x| x != a[0]));
}

#[test]
fn continuous_release_emits_every_period() {
    let grid = uniform_grid(30, 30);
    let config = ModelConfig::new(SimTime(0), SimTime(100), 10);
    let release = ReleaseConfig {
        mode: ReleaseMode::Continuous { period: 20 },
        ..ReleaseConfig::default()
    };
    let rows = vec![
        ReleaseRow::new(SimTime(0), 2, 5.0, 5.0, 0.0),
        ReleaseRow::new(SimTime(60), 0, 5.0, 5.0, 0.0),
    ];
    let mut s = build(config, release, rows);
    let mut forcing = ConstantForcing::velocity(0.0, 0.0);
    let mut released = Vec::new();
    while !s.finished() {
        released.push(s.update(&grid, &mut forcing).unwrap().released);
    }
    assert_eq!(released, vec![2, 0, 2, 0, 2, 0, 0, 0, 0, 0]);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn pids_stay_unique_through_release_and_death(
        steps in prop::collection::vec((0i64..20, 1u32..4), 1..12),
        modulus in 2u64..5,
    ) {
        let mut rows: Vec<ReleaseRow> = steps
            .iter()
            .map(|&(t, m)| ReleaseRow::new(SimTime(t), m, 3.0, 3.0, 0.0))
            .collect();
        rows.sort_by_key(|r| r.time);
        let total: u64 = rows.iter().map(|r| u64::from(r.multiplicity)).sum();

        let config = ModelConfig::new(SimTime(0), SimTime(20), 1);
        let schema = config.tracking_schema([]).unwrap();
        let releaser =
            ParticleReleaser::new(&config, &ReleaseConfig::default(), &schema, rows).unwrap();
        let behavior = kill_where(move |pid| pid % modulus == 0);
        let mut s = State::new(config, schema, releaser, Some(Box::new(behavior))).unwrap();

        let grid = uniform_grid(10, 10);
        let mut forcing = ConstantForcing::velocity(0.0, 0.0);
        let mut seen = HashSet::new();
        while !s.finished() {
            s.update(&grid, &mut forcing).unwrap();
            let pid = s.population().pid();
            prop_assert!(pid.windows(2).all(|w| w[0] < w[1]));
            prop_assert!(pid.iter().all(|p| p.0 % modulus != 0));
            seen.extend(pid.iter().copied());
        }
        prop_assert_eq!(s.particles().len() as u64, total);
        prop_assert!(seen.iter().all(|p| p.0 < total));
    }
}
