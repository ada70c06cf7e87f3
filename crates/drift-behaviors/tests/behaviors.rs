use drift_behaviors::{MaxAge, SeaLice, AGE, SUPER};
use drift_core::{SimTime, Value, VariableDef};
use drift_engine::{
    Behavior, ModelConfig, ParticleReleaser, ReleaseConfig, ReleaseRow, State, StepError,
};
use drift_test_utils::{uniform_grid, ConstantForcing};

// 2014-06-23 12:00:00 UTC
const NOON: i64 = 1_403_524_800;
// 2014-12-21 00:00:00 UTC
const MIDNIGHT: i64 = 1_419_120_000;
const DT: i64 = 600;

fn lice_state(start: i64, depths: &[f64], behavior: Box<dyn Behavior>) -> State {
    let config = ModelConfig::new(SimTime(start), SimTime(start + 6 * DT), DT);
    let schema = config
        .tracking_schema([VariableDef::instance(SUPER), VariableDef::instance(AGE)])
        .unwrap();
    let release = ReleaseConfig {
        attributes: vec![SUPER.to_string()],
        ..ReleaseConfig::default()
    };
    let rows = depths
        .iter()
        .map(|&z| {
            ReleaseRow::new(SimTime(start), 1, 10.0, 10.0, z)
                .with_attributes(vec![Value::Float(1.0)])
        })
        .collect();
    let releaser = ParticleReleaser::new(&config, &release, &schema, rows).unwrap();
    State::new(config, schema, releaser, Some(behavior)).unwrap()
}

fn sea(salt: f64) -> ConstantForcing {
    ConstantForcing::velocity(0.0, 0.0)
        .with_field("temp", 10.0)
        .with_field("salt", salt)
}

fn close(a: f64, b: f64) -> bool {
    (a - b).abs() < 1e-12
}

#[test]
fn lice_swim_up_in_daylight() {
    let grid = uniform_grid(30, 30);
    let lice = SeaLice::builder().build().unwrap();
    let mut s = lice_state(NOON, &[5.0], Box::new(lice));
    s.update(&grid, &mut sea(34.0)).unwrap();

    let p = s.population();
    assert!(close(p.z()[0], 4.7), "{}", p.z()[0]);
    let survival = (-0.17 * DT as f64 / 86_400.0).exp();
    assert!(close(p.float(SUPER).unwrap()[0], survival));
    assert!(close(p.float(AGE).unwrap()[0], 10.0 * DT as f64 / 86_400.0));
}

#[test]
fn lice_sink_in_fresh_water() {
    let grid = uniform_grid(30, 30);
    let lice = SeaLice::builder().build().unwrap();
    let mut s = lice_state(NOON, &[5.0], Box::new(lice));
    s.update(&grid, &mut sea(10.0)).unwrap();
    assert!(close(s.population().z()[0], 5.3));
}

#[test]
fn lice_hold_depth_at_night() {
    let grid = uniform_grid(30, 30);
    let lice = SeaLice::builder().build().unwrap();
    let mut s = lice_state(MIDNIGHT, &[5.0], Box::new(lice));
    s.update(&grid, &mut sea(34.0)).unwrap();
    assert_eq!(s.population().z(), &[5.0]);
}

#[test]
fn deep_water_is_too_dark_to_swim_up() {
    let grid = uniform_grid(30, 30);
    let lice = SeaLice::builder().build().unwrap();
    // 1500 * exp(-0.2 * 90) is well below the threshold.
    let mut s = lice_state(NOON, &[90.0], Box::new(lice));
    s.update(&grid, &mut sea(34.0)).unwrap();
    assert_eq!(s.population().z(), &[90.0]);
}

#[test]
fn swimming_through_the_surface_is_reflected() {
    let grid = uniform_grid(30, 30);
    let lice = SeaLice::builder().build().unwrap();
    let mut s = lice_state(NOON, &[0.1], Box::new(lice));
    s.update(&grid, &mut sea(34.0)).unwrap();
    assert!(close(s.population().z()[0], 0.2));
}

#[test]
fn lice_carried_off_the_grid_only_die() {
    let grid = uniform_grid(30, 30);
    let lice = SeaLice::builder().build().unwrap();
    let mut s = lice_state(NOON, &[5.0], Box::new(lice));
    // 0.1 m/s for 600 s carries it off the 30 m grid; `Stay` puts it back.
    let mut forcing = ConstantForcing::velocity(0.1, 0.0)
        .with_field("temp", 10.0)
        .with_field("salt", 34.0);
    s.update(&grid, &mut forcing).unwrap();
    let p = s.population();
    assert_eq!(p.x(), &[10.0]);
    assert_eq!(p.z(), &[5.0]);
    assert_eq!(p.float(AGE).unwrap(), &[0.0]);
    let survival = (-0.17 * DT as f64 / 86_400.0).exp();
    assert!(close(p.float(SUPER).unwrap()[0], survival));
}

#[test]
fn vertical_mixing_is_seeded() {
    let run = |seed: u64| {
        let grid = uniform_grid(30, 30);
        let lice = SeaLice::builder()
            .vertical_mixing(1e-3)
            .seed_offset(seed)
            .build()
            .unwrap();
        let mut s = lice_state(MIDNIGHT, &[20.0; 8], Box::new(lice));
        let mut forcing = sea(34.0);
        while !s.finished() {
            s.update(&grid, &mut forcing).unwrap();
        }
        s.population().z().to_vec()
    };
    let a = run(11);
    assert_eq!(a, run(11));
    assert_ne!(a, run(12));
    assert!(a.iter().any(|&z| z != a[0]));
}

#[test]
fn missing_salinity_fails_the_step() {
    let grid = uniform_grid(30, 30);
    let lice = SeaLice::builder().build().unwrap();
    let mut s = lice_state(NOON, &[5.0], Box::new(lice));
    let mut forcing = ConstantForcing::velocity(0.0, 0.0).with_field("temp", 10.0);
    assert!(matches!(
        s.update(&grid, &mut forcing),
        Err(StepError::Behavior(_))
    ));
}

#[test]
fn lice_need_their_variables_in_the_schema() {
    let config = ModelConfig::new(SimTime(NOON), SimTime(NOON + DT), DT);
    let schema = config.tracking_schema([VariableDef::instance(SUPER)]).unwrap();
    let releaser =
        ParticleReleaser::new(&config, &ReleaseConfig::default(), &schema, vec![]).unwrap();
    let lice = SeaLice::builder().build().unwrap();
    assert!(State::new(config, schema, releaser, Some(Box::new(lice))).is_err());
}

#[test]
fn max_age_removes_old_particles() {
    let config = ModelConfig::new(SimTime(0), SimTime(10), 1);
    let schema = config.tracking_schema([VariableDef::instance(AGE)]).unwrap();
    let release = ReleaseConfig {
        attributes: vec![AGE.to_string()],
        ..ReleaseConfig::default()
    };
    let rows = [5.0, 0.5, f64::NAN, 1.0]
        .into_iter()
        .map(|age| {
            ReleaseRow::new(SimTime(0), 1, 3.0, 3.0, 0.0).with_attributes(vec![Value::Float(age)])
        })
        .collect();
    let releaser = ParticleReleaser::new(&config, &release, &schema, rows).unwrap();
    let mut s = State::new(config, schema, releaser, Some(Box::new(MaxAge::new(1.0)))).unwrap();

    let grid = uniform_grid(10, 10);
    let report = s
        .update(&grid, &mut ConstantForcing::velocity(0.0, 0.0))
        .unwrap();
    assert_eq!(report.removed, 1);
    assert_eq!(s.population().len(), 3);
    assert_eq!(s.population().float(AGE).unwrap()[0], 0.5);
}
