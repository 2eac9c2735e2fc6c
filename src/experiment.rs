//! Experiment declaration for the external training framework.
//!
//! Everything here is descriptive: plain structs serialized to JSON that
//! name the dataset split, task, and backend hyperparameters per noise
//! level. Training, prediction, and evaluation all happen outside the
//! harness, under the framework output root.

use std::fs;

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::Serialize;
use tracing::info;

use crate::catalog::{
    class_map, exp_id, local_path, BuildingsCatalog, SegClass, BACKGROUND_CLASS_ID,
    BUILDING_CLASS_ID,
};
use crate::config::HarnessConfig;
use crate::noise::{NoiseSpec, NoiseType};

#[derive(Debug, Clone, Serialize)]
pub struct ChipOptions {
    pub chips_per_scene: u32,
    pub debug_chip_probability: f64,
    pub negative_survival_probability: f64,
    pub target_classes: Vec<u8>,
    pub target_count_threshold: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct TaskConfig {
    pub task_type: &'static str,
    pub chip_size: u32,
    pub classes: Vec<SegClass>,
    pub chip_options: ChipOptions,
}

#[derive(Debug, Clone, Serialize)]
pub struct BackendConfig {
    pub backend_type: &'static str,
    pub model_defaults: &'static str,
    pub num_steps: u32,
    pub batch_size: u32,
    pub debug: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AnalyzerConfig {
    pub analyzer_type: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RasterSourceConfig {
    pub uri: String,
    pub channel_order: [usize; 3],
    pub stats_transformer: bool,
}

/// Labels enter the framework as vectors and are rasterized there.
#[derive(Debug, Clone, Serialize)]
pub struct LabelSourceConfig {
    pub vector_uri: String,
    pub background_class_id: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SceneConfig {
    pub id: String,
    pub raster_source: RasterSourceConfig,
    pub label_source: LabelSourceConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct DatasetConfig {
    pub train_scenes: Vec<SceneConfig>,
    pub validation_scenes: Vec<SceneConfig>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExperimentConfig {
    pub id: String,
    pub task: TaskConfig,
    pub backend: BackendConfig,
    pub analyzer: AnalyzerConfig,
    pub dataset: DatasetConfig,
    pub root_uri: String,
}

pub fn build_task() -> TaskConfig {
    TaskConfig {
        task_type: "SEMANTIC_SEGMENTATION",
        chip_size: 300,
        classes: class_map(),
        chip_options: ChipOptions {
            chips_per_scene: 9,
            debug_chip_probability: 1.0,
            negative_survival_probability: 0.25,
            target_classes: vec![BUILDING_CLASS_ID],
            target_count_threshold: 1000,
        },
    }
}

pub fn build_backend(test: bool) -> BackendConfig {
    let (num_steps, batch_size, debug) = if test { (1, 1, true) } else { (30000, 8, false) };
    BackendConfig {
        backend_type: "TF_DEEPLAB",
        model_defaults: "MOBILENET_V2",
        num_steps,
        batch_size,
        debug,
    }
}

/// One scene reference. Training scenes point at the noisy label set for
/// `spec`; validation scenes always read the ground truth.
pub fn build_scene(
    catalog: &BuildingsCatalog,
    spec: NoiseSpec,
    id: &str,
    is_validation: bool,
) -> SceneConfig {
    let vector_uri = if is_validation {
        catalog.geojson_uri(id)
    } else {
        catalog.noisy_geojson_uri(spec, id)
    };
    SceneConfig {
        id: id.to_string(),
        raster_source: RasterSourceConfig {
            uri: catalog.raster_uri(id),
            channel_order: [0, 1, 2],
            stats_transformer: true,
        },
        label_source: LabelSourceConfig {
            vector_uri,
            background_class_id: BACKGROUND_CLASS_ID,
        },
    }
}

/// Deterministic train/validation partition, identical across runs and
/// noise specs: sort, shuffle with the shared seed, cap the id list,
/// then cut at the train proportion.
pub fn split_scene_ids(
    config: &HarnessConfig,
    mut scene_ids: Vec<String>,
) -> Result<(Vec<String>, Vec<String>)> {
    if scene_ids.is_empty() {
        bail!("no scenes found; the raw data root is configured incorrectly");
    }
    scene_ids.sort();
    let mut rng = StdRng::seed_from_u64(config.seed);
    scene_ids.shuffle(&mut rng);

    let cap = config.split_scene_cap();
    scene_ids.truncate(cap);
    let num_train = (cap as f64 * config.train_proportion).round() as usize;
    let validation_ids = scene_ids.split_off(num_train.min(scene_ids.len()));
    Ok((scene_ids, validation_ids))
}

/// One experiment per (spec, run) pair over a shared split.
pub fn build_experiments(
    config: &HarnessConfig,
    catalog: &BuildingsCatalog,
    specs: &[NoiseSpec],
) -> Result<Vec<ExperimentConfig>> {
    let (train_ids, validation_ids) = split_scene_ids(config, catalog.scene_ids()?)?;

    let mut experiments = Vec::new();
    for &spec in specs {
        for &run in &config.runs {
            let dataset = DatasetConfig {
                train_scenes: train_ids
                    .iter()
                    .map(|id| build_scene(catalog, spec, id, false))
                    .collect(),
                validation_scenes: validation_ids
                    .iter()
                    .map(|id| build_scene(catalog, spec, id, true))
                    .collect(),
            };
            experiments.push(ExperimentConfig {
                id: exp_id(spec, run),
                task: build_task(),
                backend: build_backend(config.test),
                analyzer: AnalyzerConfig {
                    analyzer_type: "STATS_ANALYZER",
                },
                dataset,
                root_uri: catalog.rv_root_uri(),
            });
        }
    }
    Ok(experiments)
}

/// The `experiments` stage: declare the training sweep for one noise
/// family and write it where the external framework picks it up.
pub fn run_experiments(config: &HarnessConfig, noise_type: NoiseType) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    let specs = config.experiment_specs(noise_type)?;
    let experiments = build_experiments(config, &catalog, &specs)?;

    let out_path = local_path(&catalog.experiments_uri())?;
    if let Some(parent) = out_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    info!(
        "declaring {} experiments at {}",
        experiments.len(),
        out_path.display()
    );
    let raw = serde_json::to_string_pretty(&experiments)?;
    fs::write(&out_path, raw)
        .with_context(|| format!("failed to write {}", out_path.display()))
}
