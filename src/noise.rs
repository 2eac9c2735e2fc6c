//! Label-noise synthesis.
//!
//! Two perturbation families over a scene's building footprints:
//! random feature deletion (`Drop`) and random per-ring pixel translation
//! (`Shift`). Both are deterministic given a seeded RNG and a fixed scene
//! order, so a whole noisy dataset can be regenerated byte-identically.

use std::fmt;

use anyhow::{ensure, Result};
use clap::ValueEnum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::catalog::{local_path, BuildingsCatalog};
use crate::config::HarnessConfig;
use crate::georef::GeoTransform;
use crate::vector::{Feature, FeatureCollection, Geometry, Ring};

/// Noise family selector for stages that sweep one family at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum NoiseType {
    Shift,
    Drop,
}

impl NoiseType {
    pub fn label(&self) -> &'static str {
        match self {
            NoiseType::Shift => "shift",
            NoiseType::Drop => "drop",
        }
    }
}

/// One noise setting, keyed by its `Display` form (`shift-10`, `drop-0.1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NoiseSpec {
    /// Translate each outer ring by a random integer pixel offset drawn
    /// uniformly from `[-pixels, +pixels]` per axis.
    Shift { pixels: u32 },
    /// Delete each feature independently with probability `prob`.
    Drop { prob: f64 },
}

impl NoiseSpec {
    pub fn shift(pixels: u32) -> Self {
        NoiseSpec::Shift { pixels }
    }

    pub fn drop(prob: f64) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&prob),
            "drop probability {prob} outside [0, 1]"
        );
        Ok(NoiseSpec::Drop { prob })
    }

    pub fn noise_type(&self) -> NoiseType {
        match self {
            NoiseSpec::Shift { .. } => NoiseType::Shift,
            NoiseSpec::Drop { .. } => NoiseType::Drop,
        }
    }

    /// Noise level as a scalar, for chart axes.
    pub fn level(&self) -> f64 {
        match self {
            NoiseSpec::Shift { pixels } => f64::from(*pixels),
            NoiseSpec::Drop { prob } => *prob,
        }
    }
}

impl fmt::Display for NoiseSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NoiseSpec::Shift { pixels } => write!(f, "shift-{pixels}"),
            NoiseSpec::Drop { prob } => write!(f, "drop-{}", format_prob(*prob)),
        }
    }
}

/// Render a drop probability with at least one decimal place, so whole
/// numbers key as `drop-0.0` / `drop-1.0` in paths and stats files.
fn format_prob(prob: f64) -> String {
    let s = prob.to_string();
    if s.contains('.') {
        s
    } else {
        format!("{s}.0")
    }
}

/// Apply `spec` to a feature sequence, returning the perturbed features.
///
/// Drop mode keeps retained features untouched, whatever their geometry.
/// Shift mode flattens each areal feature to its outer rings, translates
/// every ring by its own integer pixel offset, and emits one single-ring
/// `Polygon` feature per ring. A MultiPolygon with N member polygons
/// therefore becomes N independent features. Non-areal geometries are
/// skipped with a warning and produce no output.
pub fn synthesize(
    features: &[Feature],
    spec: NoiseSpec,
    georef: &GeoTransform,
    rng: &mut StdRng,
) -> Vec<Feature> {
    let mut out = Vec::new();
    for feature in features {
        match spec {
            NoiseSpec::Drop { prob } => {
                if rng.random::<f64>() >= prob {
                    out.push(feature.clone());
                }
            }
            NoiseSpec::Shift { pixels } => {
                let Geometry::Area(area) = &feature.geometry else {
                    warn!("skipping {} geometry", feature.geometry.type_name());
                    continue;
                };
                for ring in area.outer_rings() {
                    let shifted = shift_ring(ring, pixels, georef, rng);
                    out.push(Feature::polygon(vec![shifted], feature.properties.clone()));
                }
            }
        }
    }
    out
}

fn shift_ring(ring: &Ring, pixels: u32, georef: &GeoTransform, rng: &mut StdRng) -> Ring {
    let level = f64::from(pixels);
    let dx = rng.random_range(-level..=level).round();
    let dy = rng.random_range(-level..=level).round();
    ring.iter()
        .map(|&[x, y]| {
            let (col, row) = georef.map_to_pixel(x, y);
            let (sx, sy) = georef.pixel_to_map(col + dx, row + dy);
            [sx, sy]
        })
        .collect()
}

/// The `synth` stage: regenerate every configured noisy label set.
///
/// One RNG seeded from the harness seed serves all specs in turn, so the
/// full sweep is reproducible end to end.
pub fn run_synth(config: &HarnessConfig) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    let scene_ids = catalog.scene_ids()?;
    let mut rng = StdRng::seed_from_u64(config.seed);

    for spec in config.synth_specs()? {
        make_noisy_labels(&catalog, &scene_ids, spec, &mut rng)?;
    }
    Ok(())
}

fn make_noisy_labels(
    catalog: &BuildingsCatalog,
    scene_ids: &[String],
    spec: NoiseSpec,
    rng: &mut StdRng,
) -> Result<()> {
    info!("synthesizing {spec} labels for {} scenes", scene_ids.len());
    for id in scene_ids {
        let georef = GeoTransform::read_world_file(&local_path(&catalog.world_file_uri(id))?)?;
        let labels = FeatureCollection::read(&local_path(&catalog.geojson_uri(id))?)?;
        let noisy = synthesize(&labels.features, spec, &georef, rng);
        let noisy_path = local_path(&catalog.noisy_geojson_uri(spec, id))?;
        debug!("writing {}", noisy_path.display());
        FeatureCollection::new(noisy).write(&noisy_path)?;
    }
    Ok(())
}
