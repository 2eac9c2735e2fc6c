//! Overlay montages for a few fixed scenes: ground-truth vs noisy label
//! outlines, and predicted-Building heat overlays, one panel grid per
//! noise family.

use std::path::Path;

use anyhow::{Context, Result};
use image::{imageops, GrayImage, Rgb, RgbImage};
use imageproc::drawing::draw_line_segment_mut;
use tracing::info;

use super::ensure_dir;
use crate::catalog::{exp_id, local_path, BuildingsCatalog, BUILDING_CLASS_ID};
use crate::config::HarnessConfig;
use crate::georef::GeoTransform;
use crate::noise::{NoiseSpec, NoiseType};
use crate::raster::{read_class_raster, read_display_raster, RasterStats};
use crate::vector::{FeatureCollection, Geometry};

const GROUND_TRUTH_COLOR: Rgb<u8> = Rgb([173, 216, 230]);
const NOISY_COLOR: Rgb<u8> = Rgb([255, 165, 0]);
const HEAT_ALPHA: f64 = 0.7;
const BUILDING_HEAT: f64 = 140.0 / 255.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PlotMode {
    NoisyLabels,
    Preds,
}

impl PlotMode {
    fn label(&self) -> &'static str {
        match self {
            PlotMode::NoisyLabels => "noisy-labels",
            PlotMode::Preds => "preds",
        }
    }
}

/// Everything one panel might draw for a (spec, scene) pair.
struct SceneView {
    display: RgbImage,
    label_rings: Vec<Vec<(f32, f32)>>,
    noisy_rings: Vec<Vec<(f32, f32)>>,
    pred: GrayImage,
}

fn pixel_rings(labels: &FeatureCollection, georef: &GeoTransform) -> Vec<Vec<(f32, f32)>> {
    let mut rings = Vec::new();
    for feature in &labels.features {
        let Geometry::Area(area) = &feature.geometry else {
            continue;
        };
        for ring in area.outer_rings() {
            rings.push(
                ring.iter()
                    .map(|&[x, y]| {
                        let (col, row) = georef.map_to_pixel(x, y);
                        (col as f32, row as f32)
                    })
                    .collect(),
            );
        }
    }
    rings
}

fn load_scene_view(
    catalog: &BuildingsCatalog,
    stats: &RasterStats,
    spec: NoiseSpec,
    run: u32,
    id: &str,
) -> Result<SceneView> {
    let display = read_display_raster(&local_path(&catalog.raster_uri(id))?, stats)?;
    let georef = GeoTransform::read_world_file(&local_path(&catalog.world_file_uri(id))?)?;
    let labels = FeatureCollection::read(&local_path(&catalog.geojson_uri(id))?)?;
    let noisy = FeatureCollection::read(&local_path(&catalog.noisy_geojson_uri(spec, id))?)?;
    let pred = read_class_raster(&local_path(&catalog.prediction_uri(&exp_id(spec, run), id))?)?;
    Ok(SceneView {
        display,
        label_rings: pixel_rings(&labels, &georef),
        noisy_rings: pixel_rings(&noisy, &georef),
        pred,
    })
}

fn draw_rings(panel: &mut RgbImage, rings: &[Vec<(f32, f32)>], color: Rgb<u8>) {
    for ring in rings {
        for pair in ring.windows(2) {
            draw_line_segment_mut(panel, pair[0], pair[1], color);
        }
    }
}

/// The "hot" colormap: black through red and yellow to white.
fn hot_rgb(t: f64) -> [f64; 3] {
    let t = t.clamp(0.0, 1.0);
    let r = (0.0416 + (1.0 - 0.0416) * t / 0.365079).min(1.0);
    let g = ((t - 0.365079) / (0.746032 - 0.365079)).clamp(0.0, 1.0);
    let b = ((t - 0.746032) / (1.0 - 0.746032)).clamp(0.0, 1.0);
    [r, g, b]
}

/// Blend the predicted-Building mask over the panel as a heat layer.
/// Non-building pixels darken toward the colormap origin, which is what
/// makes the building blobs glow against the imagery.
fn blend_heat(panel: &mut RgbImage, pred: &GrayImage) {
    for (x, y, px) in panel.enumerate_pixels_mut() {
        let is_building = pred
            .get_pixel_checked(x, y)
            .is_some_and(|p| p.0[0] == BUILDING_CLASS_ID);
        let heat = hot_rgb(if is_building { BUILDING_HEAT } else { 0.0 });
        for c in 0..3 {
            let blended = f64::from(px.0[c]) * (1.0 - HEAT_ALPHA) + heat[c] * 255.0 * HEAT_ALPHA;
            px.0[c] = blended.round() as u8;
        }
    }
}

fn render_panel(view: &SceneView, mode: PlotMode, noise_type: NoiseType) -> RgbImage {
    let mut panel = view.display.clone();
    // Dropped labels are a subset of the ground truth, so drawing both
    // sets would just hide the deletions.
    let skip_ground_truth = mode == PlotMode::NoisyLabels && noise_type == NoiseType::Drop;
    if !skip_ground_truth {
        draw_rings(&mut panel, &view.label_rings, GROUND_TRUTH_COLOR);
    }
    match mode {
        PlotMode::NoisyLabels => draw_rings(&mut panel, &view.noisy_rings, NOISY_COLOR),
        PlotMode::Preds => blend_heat(&mut panel, &view.pred),
    }
    panel
}

/// Compose panels row-major onto a white canvas.
fn montage(panels: &[RgbImage], rows: usize, cols: usize) -> RgbImage {
    let width = panels.iter().map(|p| p.width()).max().unwrap_or(1);
    let height = panels.iter().map(|p| p.height()).max().unwrap_or(1);
    let mut canvas = RgbImage::from_pixel(
        cols as u32 * width,
        rows as u32 * height,
        Rgb([255, 255, 255]),
    );
    for (i, panel) in panels.iter().enumerate() {
        let (row, col) = (i / cols, i % cols);
        imageops::overlay(
            &mut canvas,
            panel,
            i64::from(col as u32 * width),
            i64::from(row as u32 * height),
        );
    }
    canvas
}

/// Pick panels for one montage. `views` is indexed `[level][scene]`.
/// The noisy-labels montage shows the first scene across the non-zero
/// levels; the predictions montage shows every scene at every level.
fn render_montage(views: &[Vec<SceneView>], mode: PlotMode, noise_type: NoiseType) -> RgbImage {
    let level_start = match mode {
        PlotMode::NoisyLabels => 1,
        PlotMode::Preds => 0,
    };
    let num_scenes = match mode {
        PlotMode::NoisyLabels => views.first().map_or(0, Vec::len).min(1),
        PlotMode::Preds => views.first().map_or(0, Vec::len),
    };
    let levels = &views[level_start.min(views.len())..];

    let mut panels = Vec::new();
    for scene_idx in 0..num_scenes {
        for level_views in levels {
            panels.push(render_panel(&level_views[scene_idx], mode, noise_type));
        }
    }
    montage(&panels, num_scenes, levels.len().max(1))
}

/// The `plot-images` stage: montages of noisy-label overlays and
/// prediction heat overlays for a few fixed scenes.
pub fn run_plot_images(config: &HarnessConfig) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    let out_dir = ensure_dir(&catalog.images_plot_dir())?;
    let stats = RasterStats {
        means: config.display_channel_means,
        stds: config.display_channel_stds,
    };
    let run = config.runs.first().copied().unwrap_or(0);

    for noise_type in [NoiseType::Shift, NoiseType::Drop] {
        let specs = config.experiment_specs(noise_type)?;
        let mut views = Vec::new();
        for &spec in &specs {
            let mut row = Vec::new();
            for id in &config.plot_scene_ids {
                row.push(load_scene_view(&catalog, &stats, spec, run, id)?);
            }
            views.push(row);
        }
        for mode in [PlotMode::NoisyLabels, PlotMode::Preds] {
            let path = out_dir.join(format!("{}-{}.png", mode.label(), noise_type.label()));
            let image = render_montage(&views, mode, noise_type);
            image
                .save(&path)
                .with_context(|| format!("failed to write {}", path.display()))?;
            info!("saved plot to {}", path.display());
        }
    }
    Ok(())
}
