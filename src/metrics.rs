//! Confusion-matrix accumulation and derived accuracy metrics.
//!
//! The same 3x3 matrix shape serves both comparisons the harness makes:
//! original vs noisy label rasters (how much damage a noise level does)
//! and ground-truth vs model predictions (how much of it the model
//! inherits, read from external evaluation output).

use std::collections::BTreeMap;
use std::fs;
use std::ops::{AddAssign, Div};
use std::path::Path;

use anyhow::{Context, Result};
use image::GrayImage;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::catalog::{local_path, BuildingsCatalog, Scene, BUILDING_CLASS_ID};
use crate::config::HarnessConfig;
use crate::georef::GeoTransform;
use crate::noise::{NoiseSpec, NoiseType};
use crate::raster::{raster_dimensions, rasterize_labels};
use crate::vector::FeatureCollection;

pub const NUM_CLASSES: usize = 3;

/// Pixel-count cross-tabulation over class indices {0 = ignore,
/// 1 = Building, 2 = Background}; rows index the reference class,
/// columns the compared class.
///
/// Every derived metric treats a zero denominator as 0.0, never NaN, so
/// degenerate matrices (empty scenes, classes never produced) chart as
/// zero instead of poisoning downstream averages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConfusionMatrix(pub [[f64; NUM_CLASSES]; NUM_CLASSES]);

impl ConfusionMatrix {
    pub fn zeros() -> Self {
        Self([[0.0; NUM_CLASSES]; NUM_CLASSES])
    }

    /// Count one pixel pair. Values outside the class range are ignored,
    /// as in a label-restricted cross-tabulation.
    pub fn add_pair(&mut self, reference: u8, compared: u8) {
        let (r, c) = (reference as usize, compared as usize);
        if r < NUM_CLASSES && c < NUM_CLASSES {
            self.0[r][c] += 1.0;
        }
    }

    /// Tabulate two class grids pixel by pixel. Both grids cover the same
    /// scene, so they share dimensions.
    pub fn from_rasters(reference: &GrayImage, compared: &GrayImage) -> Self {
        let mut m = Self::zeros();
        for (a, b) in reference.pixels().zip(compared.pixels()) {
            m.add_pair(a.0[0], b.0[0]);
        }
        m
    }

    pub fn total(&self) -> f64 {
        self.0.iter().flatten().sum()
    }

    fn trace(&self) -> f64 {
        (0..NUM_CLASSES).map(|i| self.0[i][i]).sum()
    }

    fn row_sum(&self, row: usize) -> f64 {
        self.0[row].iter().sum()
    }

    fn col_sum(&self, col: usize) -> f64 {
        self.0.iter().map(|row| row[col]).sum()
    }

    /// Fraction of pixels whose class agrees between the two rasters.
    pub fn accuracy(&self) -> f64 {
        ratio(self.trace(), self.total())
    }

    pub fn building_recall(&self) -> f64 {
        let b = BUILDING_CLASS_ID as usize;
        ratio(self.0[b][b], self.row_sum(b))
    }

    pub fn building_precision(&self) -> f64 {
        let b = BUILDING_CLASS_ID as usize;
        ratio(self.0[b][b], self.col_sum(b))
    }

    pub fn building_f1(&self) -> f64 {
        let p = self.building_precision();
        let r = self.building_recall();
        ratio(2.0 * p * r, p + r)
    }

    /// p(from -> to): of the pixels whose reference class is `from`, the
    /// fraction labelled `to` on the compared side.
    pub fn transition_prob(&self, from: usize, to: usize) -> f64 {
        ratio(self.0[from][to], self.row_sum(from))
    }
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        0.0
    } else {
        numerator / denominator
    }
}

impl AddAssign for ConfusionMatrix {
    fn add_assign(&mut self, rhs: Self) {
        for r in 0..NUM_CLASSES {
            for c in 0..NUM_CLASSES {
                self.0[r][c] += rhs.0[r][c];
            }
        }
    }
}

impl Div<f64> for ConfusionMatrix {
    type Output = Self;

    fn div(mut self, rhs: f64) -> Self {
        for cell in self.0.iter_mut().flatten() {
            *cell /= rhs;
        }
        self
    }
}

/// Accumulated noise-impact matrices keyed by noise-spec string, as
/// persisted in the stats JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExperimentStats(pub BTreeMap<String, ConfusionMatrix>);

impl ExperimentStats {
    pub fn insert(&mut self, spec: NoiseSpec, conf_mat: ConfusionMatrix) {
        self.0.insert(spec.to_string(), conf_mat);
    }

    pub fn conf_mat(&self, spec: NoiseSpec) -> Result<ConfusionMatrix> {
        self.0
            .get(&spec.to_string())
            .copied()
            .with_context(|| format!("no noise stats recorded for {spec}"))
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read stats {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse stats {}", path.display()))
    }

    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string(self)?;
        fs::write(path, raw).with_context(|| format!("failed to write stats {}", path.display()))
    }
}

/// Accumulate the original-vs-noisy confusion matrix for one spec over
/// the sampled scenes. Order-independent: the result is a sum of
/// per-scene tabulations.
pub fn compute_noise_metrics(
    catalog: &BuildingsCatalog,
    scenes: &[Scene],
    spec: NoiseSpec,
) -> Result<ConfusionMatrix> {
    info!("computing metrics for {spec}");
    let mut conf_mat = ConfusionMatrix::zeros();
    for scene in scenes {
        let georef = GeoTransform::read_world_file(&local_path(&scene.world_file_uri)?)?;
        let (width, height) = raster_dimensions(&local_path(&scene.raster_uri)?)?;
        let orig = FeatureCollection::read(&local_path(&scene.labels_uri)?)?;
        let noisy =
            FeatureCollection::read(&local_path(&catalog.noisy_geojson_uri(spec, &scene.id))?)?;
        let orig_grid = rasterize_labels(&orig.features, &georef, width, height);
        let noisy_grid = rasterize_labels(&noisy.features, &georef, width, height);
        conf_mat += ConfusionMatrix::from_rasters(&orig_grid, &noisy_grid);
    }
    Ok(conf_mat)
}

/// The `analyze` stage: sample scenes with the shared seed, accumulate
/// per-spec noise-impact matrices, and write the stats JSON.
pub fn run_analyze(config: &HarnessConfig) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    let mut scene_ids = catalog.scene_ids()?;
    let mut rng = StdRng::seed_from_u64(config.seed);
    scene_ids.shuffle(&mut rng);
    scene_ids.truncate(config.analysis_sample_size);
    let scenes: Vec<Scene> = scene_ids.iter().map(|id| catalog.scene(id)).collect();

    let mut stats = ExperimentStats::default();
    for noise_type in [NoiseType::Shift, NoiseType::Drop] {
        for spec in config.analysis_specs(noise_type)? {
            stats.insert(spec, compute_noise_metrics(&catalog, &scenes, spec)?);
        }
    }

    let stats_path = local_path(&catalog.stats_uri())?;
    info!("writing {}", stats_path.display());
    stats.write(&stats_path)
}
