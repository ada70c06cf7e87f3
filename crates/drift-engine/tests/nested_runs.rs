use drift_core::SimTime;
use drift_engine::{Advection, ModelConfig, ParticleReleaser, ReleaseConfig, ReleaseRow, State};
use drift_forcing::{FieldData, MemorySource, Snapshot, SnapshotForcing, VerticalInterp};
use drift_grid::{CompositeGrid, NestMapping, Plane, SingleGrid};

/// Coarse 10x10 with 3000 m cells; fine 13x13 with 1000 m cells nested
/// at scale 3, coarse node (2, 2) on fine node (0, 0). The fine domain
/// ends at composite X = 12.5; the coarse grid reaches X = 22.5.
fn nest() -> CompositeGrid {
    let coarse = SingleGrid::builder(10, 10)
        .rectilinear(0.0, 60.0, 0.3, 0.3)
        .spacing(3000.0, 3000.0)
        .build()
        .unwrap();
    let fine = SingleGrid::builder(13, 13)
        .rectilinear(0.6, 60.6, 0.1, 0.1)
        .spacing(1000.0, 1000.0)
        .build()
        .unwrap();
    CompositeGrid::new(
        Box::new(fine),
        Box::new(coarse),
        NestMapping::new(3, -6, -6).unwrap(),
    )
    .unwrap()
}

/// Steady eastward flow of 1 m/s on the fine grid and 2 m/s on the
/// coarse grid.
fn two_speed_flow() -> SnapshotForcing<MemorySource> {
    let leaf = |fine: f64, coarse: f64| {
        FieldData::surface(vec![
            Plane::filled(13, 13, fine).unwrap(),
            Plane::filled(10, 10, coarse).unwrap(),
        ])
    };
    let frame = Snapshot::new()
        .with_field("u", leaf(1.0, 2.0))
        .with_field("v", leaf(0.0, 0.0));
    let source =
        MemorySource::new(vec![SimTime(0), SimTime(100_000)], vec![frame.clone(), frame]).unwrap();
    SnapshotForcing::new(source, VerticalInterp::Nearest)
}

fn run(advection: Advection, stop: i64, x0: f64) -> f64 {
    let grid = nest();
    let mut config = ModelConfig::new(SimTime(0), SimTime(stop), 1000);
    config.advection = advection;
    let schema = config.tracking_schema([]).unwrap();
    let rows = vec![ReleaseRow::new(SimTime(0), 1, x0, 4.0, 0.0)];
    let releaser =
        ParticleReleaser::new(&config, &ReleaseConfig::default(), &schema, rows).unwrap();
    let mut s = State::new(config, schema, releaser, None).unwrap();
    let mut forcing = two_speed_flow();
    while !s.finished() {
        s.update(&grid, &mut forcing).unwrap();
    }
    assert_eq!(s.len(), 1);
    s.population().x()[0]
}

#[test]
fn euler_carries_particles_from_fine_to_coarse_grid() {
    // 1 fine unit per step inside the nest, 2 once on the coarse grid:
    // 10 -> 11 -> 12 -> 13 -> 15.
    let x = run(Advection::Euler, 4000, 10.0);
    assert!((x - 15.0).abs() < 1e-9, "x = {x}");
}

#[test]
fn rk4_stages_requery_the_coarse_grid() {
    // Stages at 11.8 and 12.3 are on the fine grid and see 1 unit per
    // 1000 s; the full-step stage at 12.8 is on the coarse grid and sees 2.
    let x = run(Advection::Rk4, 1000, 11.8);
    let expected = 11.8 + (1.0 + 2.0 + 2.0 + 2.0) / 6.0;
    assert!((x - expected).abs() < 1e-9, "x = {x}, expected {expected}");
}
