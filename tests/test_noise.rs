//! Integration tests for noise synthesis.
//!
//! Tests cover:
//! - Drop mode edge cases (probability 0 and 1) and retention rates
//! - Shift mode geometry handling, including MultiPolygon explosion
//! - Determinism under a fixed seed
//! - Noise-spec key formatting and validation
//! - The synth stage writing the full noisy label tree

mod common;

use noisy_buildings_semseg::georef::GeoTransform;
use noisy_buildings_semseg::noise::{run_synth, synthesize};
use noisy_buildings_semseg::vector::AreaGeometry;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde_json::json;

use common::*;

fn identity_transform() -> GeoTransform {
    GeoTransform::new([1.0, 0.0, 0.0, 0.0, 1.0, 0.0]).expect("identity transform")
}

fn point_feature() -> Feature {
    Feature::new(
        Geometry::Other(json!({"type": "Point", "coordinates": [5.0, 5.0]})),
        json!({"name": "not a building"}),
    )
}

#[test]
fn test_drop_zero_keeps_every_feature() -> anyhow::Result<()> {
    // 1. Mixed feature set: two squares and one non-areal geometry
    let features = vec![
        square_feature(1.0, 1.0, 2.0),
        square_feature(5.0, 5.0, 2.0),
        point_feature(),
    ];

    // 2. Drop with probability 0.0
    let mut rng = StdRng::seed_from_u64(1);
    let out = synthesize(
        &features,
        NoiseSpec::drop(0.0)?,
        &identity_transform(),
        &mut rng,
    );

    // 3. Everything survives untouched, non-areal geometry included
    assert_eq!(out, features);
    Ok(())
}

#[test]
fn test_drop_one_removes_every_feature() -> anyhow::Result<()> {
    let features = vec![square_feature(1.0, 1.0, 2.0), point_feature()];
    let mut rng = StdRng::seed_from_u64(1);
    let out = synthesize(
        &features,
        NoiseSpec::drop(1.0)?,
        &identity_transform(),
        &mut rng,
    );
    assert!(out.is_empty(), "drop 1.0 should delete every feature");
    Ok(())
}

#[test]
fn test_drop_retention_rate_is_plausible() -> anyhow::Result<()> {
    // 1. 200 squares in a row
    let features: Vec<Feature> = (0..200)
        .map(|i| square_feature(f64::from(i) * 2.0, 0.0, 1.0))
        .collect();

    // 2. Drop 30% with a fixed seed
    let mut rng = StdRng::seed_from_u64(99);
    let spec = NoiseSpec::drop(0.3)?;
    let out = synthesize(&features, spec, &identity_transform(), &mut rng);

    // 3. Retention should land near 140 of 200
    assert!(
        (110..=170).contains(&out.len()),
        "retained {} of 200 features at drop 0.3",
        out.len()
    );

    // 4. Same seed, same survivors
    let mut rng2 = StdRng::seed_from_u64(99);
    let out2 = synthesize(&features, spec, &identity_transform(), &mut rng2);
    assert_eq!(out, out2);
    Ok(())
}

#[test]
fn test_shift_zero_is_identity_within_tolerance() -> anyhow::Result<()> {
    // Non-trivial georeferencing so the pixel round trip actually runs
    let georef = GeoTransform::new([0.5, 0.0, 747280.0, 0.0, -0.5, 4551320.0])?;
    let ring = square_ring(747285.0, 4551300.0, 4.0);
    let features = vec![Feature::polygon(vec![ring.clone()], json!({}))];

    let mut rng = StdRng::seed_from_u64(7);
    let out = synthesize(&features, NoiseSpec::shift(0), &georef, &mut rng);

    assert_eq!(out.len(), 1);
    let Geometry::Area(area) = &out[0].geometry else {
        panic!("shift output should be areal");
    };
    let shifted = area.outer_rings()[0];
    for (a, b) in ring.iter().zip(shifted) {
        assert!(
            (a[0] - b[0]).abs() < 1e-6 && (a[1] - b[1]).abs() < 1e-6,
            "vertex {a:?} moved to {b:?} under shift 0"
        );
    }
    Ok(())
}

#[test]
fn test_shift_offsets_are_integral_pixels() {
    let ring = square_ring(10.0, 10.0, 5.0);
    let features = vec![Feature::polygon(vec![ring.clone()], json!({}))];

    let mut rng = StdRng::seed_from_u64(123);
    let out = synthesize(
        &features,
        NoiseSpec::shift(10),
        &identity_transform(),
        &mut rng,
    );
    assert_eq!(out.len(), 1);

    let Geometry::Area(area) = &out[0].geometry else {
        panic!("shift output should be areal");
    };
    let shifted = area.outer_rings()[0];

    // One offset for the whole ring, integral, inside [-10, 10] per axis
    let dx = shifted[0][0] - ring[0][0];
    let dy = shifted[0][1] - ring[0][1];
    assert!(
        dx.fract().abs() < 1e-9 && dy.fract().abs() < 1e-9,
        "offset ({dx}, {dy}) is not integral"
    );
    assert!(
        dx.abs() <= 10.0 && dy.abs() <= 10.0,
        "offset ({dx}, {dy}) exceeds the shift level"
    );
    for (a, b) in ring.iter().zip(shifted) {
        assert!(
            (b[0] - a[0] - dx).abs() < 1e-9 && (b[1] - a[1] - dy).abs() < 1e-9,
            "ring vertices did not move together"
        );
    }
}

#[test]
fn test_shift_explodes_multipolygon() {
    let multi = Feature::new(
        Geometry::Area(AreaGeometry::MultiPolygon {
            coordinates: vec![
                vec![square_ring(0.0, 0.0, 2.0)],
                vec![square_ring(10.0, 10.0, 3.0)],
            ],
        }),
        json!({"source": "multi"}),
    );

    let mut rng = StdRng::seed_from_u64(5);
    let out = synthesize(&[multi], NoiseSpec::shift(5), &identity_transform(), &mut rng);

    // 1. Two member polygons become two independent features
    assert_eq!(out.len(), 2);
    for feature in &out {
        // 2. Each carries a single-ring Polygon and the parent's properties
        let Geometry::Area(AreaGeometry::Polygon { coordinates }) = &feature.geometry else {
            panic!("exploded member should be a Polygon");
        };
        assert_eq!(coordinates.len(), 1);
        assert_eq!(feature.properties, json!({"source": "multi"}));
    }
}

#[test]
fn test_shift_skips_non_areal_geometry() {
    let mut rng = StdRng::seed_from_u64(5);
    let out = synthesize(
        &[point_feature()],
        NoiseSpec::shift(5),
        &identity_transform(),
        &mut rng,
    );
    assert!(out.is_empty(), "non-areal features have no shifted counterpart");
}

#[test]
fn test_synthesis_is_deterministic() -> anyhow::Result<()> {
    let features: Vec<Feature> = (0..50)
        .map(|i| square_feature(f64::from(i) * 3.0, 2.0, 1.5))
        .collect();

    for spec in [NoiseSpec::shift(20), NoiseSpec::drop(0.4)?] {
        let mut rng_a = StdRng::seed_from_u64(5678);
        let mut rng_b = StdRng::seed_from_u64(5678);
        let a = synthesize(&features, spec, &identity_transform(), &mut rng_a);
        let b = synthesize(&features, spec, &identity_transform(), &mut rng_b);
        assert_eq!(
            serde_json::to_string(&FeatureCollection::new(a))?,
            serde_json::to_string(&FeatureCollection::new(b))?,
            "same seed should reproduce {spec} byte for byte"
        );
    }
    Ok(())
}

#[test]
fn test_spec_keys_match_storage_layout() -> anyhow::Result<()> {
    assert_eq!(NoiseSpec::shift(0).to_string(), "shift-0");
    assert_eq!(NoiseSpec::shift(10).to_string(), "shift-10");
    assert_eq!(NoiseSpec::drop(0.0)?.to_string(), "drop-0.0");
    assert_eq!(NoiseSpec::drop(0.1)?.to_string(), "drop-0.1");
    assert_eq!(NoiseSpec::drop(0.25)?.to_string(), "drop-0.25");
    assert_eq!(NoiseSpec::drop(1.0)?.to_string(), "drop-1.0");
    Ok(())
}

#[test]
fn test_drop_probability_is_validated() {
    assert!(NoiseSpec::drop(-0.1).is_err());
    assert!(NoiseSpec::drop(1.5).is_err());
    assert!(NoiseSpec::drop(f64::NAN).is_err());
}

#[test]
fn test_run_synth_covers_every_noise_level() -> anyhow::Result<()> {
    // 1. One scene with two buildings
    let dir = tempfile::tempdir()?;
    let config = make_test_config(&dir);
    write_scene(
        &config,
        "7",
        16,
        vec![square_feature(2.0, 2.0, 4.0), square_feature(9.0, 9.0, 3.0)],
    )?;

    // 2. Run the synth stage
    run_synth(&config)?;

    // 3. Every configured spec produced a label file
    let catalog = BuildingsCatalog::new(&config);
    for spec in config.synth_specs()? {
        let path = local_path(&catalog.noisy_geojson_uri(spec, "7"))?;
        assert!(path.is_file(), "missing noisy labels for {spec}");
    }

    // 4. Drop 0.0 kept both features
    let unchanged = FeatureCollection::read(&local_path(
        &catalog.noisy_geojson_uri(NoiseSpec::drop(0.0)?, "7"),
    )?)?;
    assert_eq!(unchanged.len(), 2);
    Ok(())
}
