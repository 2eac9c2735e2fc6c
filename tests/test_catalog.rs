//! Integration tests for scene enumeration and storage-location layout.
//!
//! Tests cover:
//! - Scene-id discovery from the raw label directory
//! - The on-disk layout every stage agrees on
//! - Remote-data handling: datasets may be remote, reports never are

mod common;

use std::fs;

use common::*;

#[test]
fn test_scene_ids_filter_and_sort() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = make_test_config(&dir);
    let catalog = BuildingsCatalog::new(&config);

    let label_dir = dir.path().join("raw/geojson/buildings");
    fs::create_dir_all(&label_dir)?;
    for name in [
        "buildings_AOI_2_Vegas_img12.geojson",
        "buildings_AOI_2_Vegas_img3.geojson",
        "buildings_AOI_2_Vegas_img1001.geojson",
        "buildings_AOI_2_Vegas_imgX.geojson",
        "buildings_AOI_2_Vegas_img.geojson",
        "summary.txt",
    ] {
        fs::write(label_dir.join(name), "{}")?;
    }

    // Ids sort as strings, matching how they key into file names
    assert_eq!(catalog.scene_ids()?, vec!["1001", "12", "3"]);
    Ok(())
}

#[test]
fn test_missing_label_dir_errors() {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = make_test_config(&dir);
    let catalog = BuildingsCatalog::new(&config);

    let err = catalog.scene_ids().expect_err("label dir does not exist");
    assert!(err.to_string().contains("label dir"), "unexpected error: {err}");
}

#[test]
fn test_uri_layout() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = make_test_config(&dir);
    let catalog = BuildingsCatalog::new(&config);

    let raster = catalog.raster_uri("42");
    assert!(raster.ends_with("RGB-PanSharpen/RGB-PanSharpen_AOI_2_Vegas_img42.tif"));
    let world_file = catalog.world_file_uri("42");
    assert!(world_file.ends_with("RGB-PanSharpen/RGB-PanSharpen_AOI_2_Vegas_img42.tfw"));
    let labels = catalog.geojson_uri("42");
    assert!(labels.ends_with("geojson/buildings/buildings_AOI_2_Vegas_img42.geojson"));

    let noisy = catalog.noisy_geojson_uri(NoiseSpec::drop(0.2)?, "42");
    assert!(noisy.ends_with("noisy-labels/drop-0.2/buildings_AOI_2_Vegas_img42.geojson"));

    let eval = catalog.eval_uri("drop-0.2-0");
    assert!(eval.ends_with("rv/eval/drop-0.2-0/eval.json"));
    let prediction = catalog.prediction_uri("drop-0.2-0", "42");
    assert!(prediction.ends_with("rv/predict/drop-0.2-0/42.tif"));

    assert!(catalog.stats_uri().ends_with("noise-stats.json"));
    assert!(catalog.experiments_uri().ends_with("rv/experiments.json"));
    assert!(catalog.curves_plot_dir().ends_with("plots/curves"));
    assert!(catalog.images_plot_dir().ends_with("plots/images"));
    Ok(())
}

#[test]
fn test_exp_id_combines_spec_and_run() -> anyhow::Result<()> {
    assert_eq!(exp_id(NoiseSpec::shift(10), 2), "shift-10-2");
    assert_eq!(exp_id(NoiseSpec::drop(0.0)?, 0), "drop-0.0-0");
    Ok(())
}

#[test]
fn test_remote_data_keeps_reports_local() {
    let config = HarnessConfig::new(true, true);
    let catalog = BuildingsCatalog::new(&config);

    // 1. Dataset locations move to the object store
    let raster = catalog.raster_uri("42");
    assert!(raster.starts_with("s3://"), "remote raster uri: {raster}");
    let err = local_path(&raster).expect_err("remote uris are not openable");
    assert!(
        err.to_string().contains("--use-remote-data"),
        "unexpected error: {err}"
    );

    // 2. Stats, the experiment declaration, and plots stay on local disk
    for uri in [
        catalog.stats_uri(),
        catalog.experiments_uri(),
        catalog.curves_plot_dir(),
        catalog.images_plot_dir(),
    ] {
        assert!(!uri.contains("://"), "report location must be local: {uri}");
    }
}
