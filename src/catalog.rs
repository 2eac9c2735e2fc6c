//! Dataset catalog: scene enumeration and storage-location construction
//! for the SpaceNet Vegas buildings dataset.
//!
//! URIs are plain strings so the same construction works for local paths
//! and object-store prefixes; anything that actually touches the
//! filesystem goes through [`local_path`] first.

use std::fs;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;

use crate::config::HarnessConfig;
use crate::noise::NoiseSpec;

pub const BUILDING_CLASS_ID: u8 = 1;
pub const BACKGROUND_CLASS_ID: u8 = 2;

const RASTER_DIR: &str = "RGB-PanSharpen";
const LABEL_DIR: &str = "geojson/buildings";
const RASTER_FN_PREFIX: &str = "RGB-PanSharpen_AOI_2_Vegas_img";
const LABEL_FN_PREFIX: &str = "buildings_AOI_2_Vegas_img";
const NOISY_LABELS_DIR: &str = "noisy-labels";
const RV_OUTPUT_DIR: &str = "rv";
const STATS_FILENAME: &str = "noise-stats.json";

/// One segmentation class as the external framework sees it.
#[derive(Debug, Clone, Serialize)]
pub struct SegClass {
    pub name: &'static str,
    pub id: u8,
    pub color: &'static str,
}

pub fn class_map() -> Vec<SegClass> {
    vec![
        SegClass {
            name: "Building",
            id: BUILDING_CLASS_ID,
            color: "orange",
        },
        SegClass {
            name: "Background",
            id: BACKGROUND_CLASS_ID,
            color: "black",
        },
    ]
}

/// Storage locations for one imagery tile and its ground-truth labels.
/// Noise-dependent artifacts (noisy labels, predictions) are resolved
/// through the catalog since they are keyed by spec / experiment id.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub raster_uri: String,
    pub world_file_uri: String,
    pub labels_uri: String,
}

#[derive(Debug, Clone)]
pub struct BuildingsCatalog {
    root_uri: String,
    raw_data_uri: String,
    local_root_uri: String,
}

impl BuildingsCatalog {
    pub fn new(config: &HarnessConfig) -> Self {
        Self {
            root_uri: config.root_uri().to_string(),
            raw_data_uri: config.raw_data_uri().to_string(),
            local_root_uri: config.local_root_uri.clone(),
        }
    }

    pub fn raster_uri(&self, id: &str) -> String {
        let dir = join_uri(&self.raw_data_uri, RASTER_DIR);
        join_uri(&dir, &format!("{RASTER_FN_PREFIX}{id}.tif"))
    }

    /// Georeferencing sidecar next to the raster.
    pub fn world_file_uri(&self, id: &str) -> String {
        let dir = join_uri(&self.raw_data_uri, RASTER_DIR);
        join_uri(&dir, &format!("{RASTER_FN_PREFIX}{id}.tfw"))
    }

    pub fn geojson_uri(&self, id: &str) -> String {
        let dir = join_uri(&self.raw_data_uri, LABEL_DIR);
        join_uri(&dir, &format!("{LABEL_FN_PREFIX}{id}.geojson"))
    }

    pub fn noisy_geojson_uri(&self, spec: NoiseSpec, id: &str) -> String {
        let dir = join_uri(&join_uri(&self.root_uri, NOISY_LABELS_DIR), &spec.to_string());
        join_uri(&dir, &format!("{LABEL_FN_PREFIX}{id}.geojson"))
    }

    /// Root the external framework writes its outputs under.
    pub fn rv_root_uri(&self) -> String {
        join_uri(&self.root_uri, RV_OUTPUT_DIR)
    }

    pub fn eval_uri(&self, exp_id: &str) -> String {
        let dir = join_uri(&join_uri(&self.rv_root_uri(), "eval"), exp_id);
        join_uri(&dir, "eval.json")
    }

    pub fn prediction_uri(&self, exp_id: &str, id: &str) -> String {
        let dir = join_uri(&join_uri(&self.rv_root_uri(), "predict"), exp_id);
        join_uri(&dir, &format!("{id}.tif"))
    }

    /// Noise-impact stats live under the local root even when the dataset
    /// is remote; they are produced and consumed on the analysis machine.
    pub fn stats_uri(&self) -> String {
        join_uri(&self.local_root_uri, STATS_FILENAME)
    }

    /// Declared experiment set, for the external framework to pick up.
    pub fn experiments_uri(&self) -> String {
        let dir = join_uri(&self.local_root_uri, RV_OUTPUT_DIR);
        join_uri(&dir, "experiments.json")
    }

    pub fn curves_plot_dir(&self) -> String {
        join_uri(&join_uri(&self.local_root_uri, "plots"), "curves")
    }

    pub fn images_plot_dir(&self) -> String {
        join_uri(&join_uri(&self.local_root_uri, "plots"), "images")
    }

    pub fn scene(&self, id: &str) -> Scene {
        Scene {
            id: id.to_string(),
            raster_uri: self.raster_uri(id),
            world_file_uri: self.world_file_uri(id),
            labels_uri: self.geojson_uri(id),
        }
    }

    /// Enumerate scene ids from the raw label directory: every file named
    /// `<prefix><digits>.geojson` contributes its digits. Files that do
    /// not match are ignored. Returned sorted for reproducible iteration.
    pub fn scene_ids(&self) -> Result<Vec<String>> {
        let label_dir = local_path(&join_uri(&self.raw_data_uri, LABEL_DIR))?;
        let entries = fs::read_dir(&label_dir)
            .with_context(|| format!("failed to list label dir {}", label_dir.display()))?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(id) = parse_scene_id(name) {
                ids.push(id.to_string());
            }
        }
        ids.sort();
        Ok(ids)
    }
}

fn parse_scene_id(file_name: &str) -> Option<&str> {
    let id = file_name
        .strip_prefix(LABEL_FN_PREFIX)?
        .strip_suffix(".geojson")?;
    (!id.is_empty() && id.bytes().all(|b| b.is_ascii_digit())).then_some(id)
}

/// Experiment identifier: noise-spec key plus run index, e.g. `drop-0.1-0`.
pub fn exp_id(spec: NoiseSpec, run: u32) -> String {
    format!("{spec}-{run}")
}

/// Join URI segments with '/', working for both filesystem paths and
/// object-store prefixes.
pub fn join_uri(base: &str, part: &str) -> String {
    let base = base.trim_end_matches('/');
    format!("{base}/{part}")
}

/// Resolve a URI to a filesystem path. Remote (`scheme://`) URIs cannot
/// be opened directly by this harness.
pub fn local_path(uri: &str) -> Result<PathBuf> {
    if uri.contains("://") {
        bail!("{uri} is remote; this stage needs local data (run without --use-remote-data)");
    }
    Ok(PathBuf::from(uri))
}
