use std::fs;

use anyhow::Result;
use image::{Rgb, RgbImage};
use noisy_buildings_semseg::catalog::{exp_id, local_path, BuildingsCatalog};
use noisy_buildings_semseg::config::HarnessConfig;
use noisy_buildings_semseg::noise::NoiseSpec;
use noisy_buildings_semseg::vector::{Feature, FeatureCollection, Ring};
use serde_json::json;
use tempfile::TempDir;

/// Identity georeferencing: map coordinates equal pixel coordinates.
pub const IDENTITY_WORLD_FILE: &str = "1.0\n0.0\n0.0\n1.0\n0.0\n0.0\n";

/// Config in test mode with both data roots pointed into a temp directory.
pub fn make_test_config(dir: &TempDir) -> HarnessConfig {
    let mut config = HarnessConfig::new(false, true);
    config.local_root_uri = dir.path().join("processed").to_string_lossy().into_owned();
    config.local_raw_data_uri = dir.path().join("raw").to_string_lossy().into_owned();
    config
}

/// Closed square ring with its lower corner at (min_x, min_y).
pub fn square_ring(min_x: f64, min_y: f64, side: f64) -> Ring {
    vec![
        [min_x, min_y],
        [min_x + side, min_y],
        [min_x + side, min_y + side],
        [min_x, min_y + side],
        [min_x, min_y],
    ]
}

/// Single-ring polygon feature over that square.
pub fn square_feature(min_x: f64, min_y: f64, side: f64) -> Feature {
    Feature::polygon(vec![square_ring(min_x, min_y, side)], json!({}))
}

/// Write one scene under the raw data root: a size x size raster, an
/// identity world file, and the given label features.
pub fn write_scene(
    config: &HarnessConfig,
    id: &str,
    size: u32,
    features: Vec<Feature>,
) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);

    let raster_path = local_path(&catalog.raster_uri(id))?;
    if let Some(parent) = raster_path.parent() {
        fs::create_dir_all(parent)?;
    }
    RgbImage::from_pixel(size, size, Rgb([64, 64, 64])).save(&raster_path)?;

    fs::write(
        local_path(&catalog.world_file_uri(id))?,
        IDENTITY_WORLD_FILE,
    )?;

    FeatureCollection::new(features).write(&local_path(&catalog.geojson_uri(id))?)
}

/// Write a noisy label set where the synth stage would put it.
pub fn write_noisy_labels(
    config: &HarnessConfig,
    spec: NoiseSpec,
    id: &str,
    features: Vec<Feature>,
) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    FeatureCollection::new(features).write(&local_path(&catalog.noisy_geojson_uri(spec, id))?)
}

/// Write a framework evaluation file for one (spec, run) experiment.
pub fn write_eval_json(
    config: &HarnessConfig,
    spec: NoiseSpec,
    run: u32,
    body: &serde_json::Value,
) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    let path = local_path(&catalog.eval_uri(&exp_id(spec, run)))?;
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string(body)?)?;
    Ok(())
}

/// Evaluation body with a Building record and an "average" record, the
/// two the aggregation stages select.
pub fn eval_body(precision: f64, recall: f64, f1: f64, conf_mat: &serde_json::Value) -> serde_json::Value {
    json!({
        "overall": [
            {
                "class_id": 1,
                "class_name": "Building",
                "precision": precision,
                "recall": recall,
                "f1": f1,
                "conf_mat": conf_mat,
            },
            {
                "class_name": "average",
                "precision": precision,
                "recall": recall,
                "f1": f1,
                "conf_mat": conf_mat,
            },
        ]
    })
}
