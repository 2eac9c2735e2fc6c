//! Combined error analysis: how much label damage turns into prediction
//! damage. Pairs the noise-impact matrices from the stats JSON with the
//! per-experiment evaluation matrices.

use std::path::Path;

use anyhow::Result;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use super::{ensure_dir, padded_range, read_eval};
use crate::catalog::{local_path, BuildingsCatalog};
use crate::config::HarnessConfig;
use crate::metrics::{ConfusionMatrix, ExperimentStats};
use crate::noise::{NoiseSpec, NoiseType};

/// Per-level matrix pairs for one noise family: label damage (original
/// vs noisy) and prediction damage (ground truth vs model output,
/// averaged over runs).
#[derive(Debug, Clone)]
pub struct CombinedStats {
    pub levels: Vec<f64>,
    pub gt_conf_mats: Vec<ConfusionMatrix>,
    pub pred_conf_mats: Vec<ConfusionMatrix>,
}

pub fn collect_combined_stats(
    catalog: &BuildingsCatalog,
    noise_stats: &ExperimentStats,
    specs: &[NoiseSpec],
    runs: &[u32],
) -> Result<CombinedStats> {
    let num_runs = runs.len() as f64;
    let mut out = CombinedStats {
        levels: Vec::new(),
        gt_conf_mats: Vec::new(),
        pred_conf_mats: Vec::new(),
    };
    for &spec in specs {
        let mut pred = ConfusionMatrix::zeros();
        for &run in runs {
            let eval = read_eval(catalog, spec, run)?;
            pred += eval.class_by_name("average")?.conf_mat3()?;
        }
        out.levels.push(spec.level());
        out.pred_conf_mats.push(pred / num_runs);
        out.gt_conf_mats.push(noise_stats.conf_mat(spec)?);
    }
    Ok(out)
}

fn building_f1s(conf_mats: &[ConfusionMatrix]) -> Vec<f64> {
    conf_mats.iter().map(ConfusionMatrix::building_f1).collect()
}

/// Building-F1 transfer chart: label F1 on x (reversed, so label quality
/// decreases left to right), prediction F1 on y, one series per family.
fn render_f1_chart(
    path: &Path,
    drop_stats: &CombinedStats,
    shift_stats: &CombinedStats,
) -> Result<()> {
    let drop_x = building_f1s(&drop_stats.gt_conf_mats);
    let drop_y = building_f1s(&drop_stats.pred_conf_mats);
    let shift_x = building_f1s(&shift_stats.gt_conf_mats);
    let shift_y = building_f1s(&shift_stats.pred_conf_mats);

    let mut all_x = drop_x.clone();
    all_x.extend_from_slice(&shift_x);
    let (x_min, x_max) = padded_range(&all_x);
    let mut all_y = drop_y.clone();
    all_y.extend_from_slice(&shift_y);
    let (y_min, y_max) = padded_range(&all_y);

    let root = BitMapBackend::new(path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_max..x_min, y_min..y_max)?;

    chart
        .configure_mesh()
        .x_desc("Label Building F1")
        .y_desc("Prediction Building F1")
        .draw()?;

    let series: [(&[f64], &[f64], &str, RGBColor); 2] = [
        (&drop_x, &drop_y, "dropped", BLUE),
        (&shift_x, &shift_y, "shifted", RED),
    ];
    for (xs, ys, label, color) in series {
        let points = xs.iter().copied().zip(ys.iter().copied());
        chart
            .draw_series(LineSeries::new(points, color))?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn render_prob_panel(
    area: &DrawingArea<BitMapBackend<'_>, Shift>,
    stats: &CombinedStats,
    x_transition: (usize, usize),
    x_label: &str,
    show_y_desc: bool,
) -> Result<()> {
    let x: Vec<f64> = stats
        .gt_conf_mats
        .iter()
        .map(|cm| round2(cm.transition_prob(x_transition.0, x_transition.1)))
        .collect();
    let y12: Vec<f64> = stats
        .pred_conf_mats
        .iter()
        .map(|cm| cm.transition_prob(1, 2))
        .collect();
    let y21: Vec<f64> = stats
        .pred_conf_mats
        .iter()
        .map(|cm| cm.transition_prob(2, 1))
        .collect();

    let (x_min, x_max) = padded_range(&x);
    let mut all_y = y12.clone();
    all_y.extend_from_slice(&y21);
    let (y_min, y_max) = padded_range(&all_y);

    let mut chart = ChartBuilder::on(area)
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, y_min..y_max)?;

    let mut mesh = chart.configure_mesh();
    mesh.x_desc(format!("Label error: p({x_label})"));
    if show_y_desc {
        mesh.y_desc("Prediction error");
    }
    mesh.draw()?;

    let series: [(&[f64], &str, RGBColor); 2] = [(&y12, "p(1->2)", BLUE), (&y21, "p(2->1)", RED)];
    for (values, label, color) in series {
        let points = x.iter().copied().zip(values.iter().copied());
        chart
            .draw_series(LineSeries::new(points, color))?
            .label(label)
            .legend(move |(px, py)| PathElement::new(vec![(px, py), (px + 20, py)], color));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;
    Ok(())
}

/// Transition-probability chart: prediction error against label error.
/// Shift gets one panel per label-error direction; drop collapses 2->1
/// label error (deletion only moves buildings to background), so a
/// single panel suffices.
fn render_transition_probs(
    path: &Path,
    noise_type: NoiseType,
    stats: &CombinedStats,
) -> Result<()> {
    let root = BitMapBackend::new(path, (1200, 900)).into_drawing_area();
    root.fill(&WHITE)?;
    let title = match noise_type {
        NoiseType::Drop => "Trained on randomly dropped labels",
        NoiseType::Shift => "Trained on randomly shifted labels",
    };
    let titled = root.titled(title, ("sans-serif", 24))?;

    match noise_type {
        NoiseType::Shift => {
            let panels = titled.split_evenly((2, 2));
            render_prob_panel(&panels[0], stats, (1, 2), "1->2", true)?;
            render_prob_panel(&panels[1], stats, (2, 1), "2->1", false)?;
        }
        NoiseType::Drop => {
            render_prob_panel(&titled, stats, (1, 2), "1->2", true)?;
        }
    }

    root.present()?;
    Ok(())
}

/// The `plot-combined` stage: F1 transfer chart plus per-family
/// transition-probability charts.
pub fn run_plot_combined(config: &HarnessConfig) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    let noise_stats = ExperimentStats::read(&local_path(&catalog.stats_uri())?)?;
    let drop_stats = collect_combined_stats(
        &catalog,
        &noise_stats,
        &config.analysis_specs(NoiseType::Drop)?,
        &config.runs,
    )?;
    let shift_stats = collect_combined_stats(
        &catalog,
        &noise_stats,
        &config.analysis_specs(NoiseType::Shift)?,
        &config.runs,
    )?;

    let out_dir = ensure_dir(&catalog.curves_plot_dir())?;
    let combined_path = out_dir.join("plot-combined.png");
    info!("saving plot to {}", combined_path.display());
    render_f1_chart(&combined_path, &drop_stats, &shift_stats)?;

    for (noise_type, stats) in [(NoiseType::Drop, &drop_stats), (NoiseType::Shift, &shift_stats)] {
        let path = out_dir.join(format!("probs-{}.png", noise_type.label()));
        info!("saving plot to {}", path.display());
        render_transition_probs(&path, noise_type, stats)?;
    }
    Ok(())
}
