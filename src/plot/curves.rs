//! Noise level vs prediction-accuracy curves, one chart per noise
//! family, from the external framework's evaluation output.

use std::path::Path;

use anyhow::Result;
use plotters::prelude::*;
use tracing::info;

use super::{ensure_dir, padded_range, read_eval};
use crate::catalog::{BuildingsCatalog, BUILDING_CLASS_ID};
use crate::config::HarnessConfig;
use crate::noise::{NoiseSpec, NoiseType};

/// Building-class scores per noise level, averaged over runs.
#[derive(Debug, Clone)]
pub struct CurveStats {
    pub levels: Vec<f64>,
    pub precisions: Vec<f64>,
    pub recalls: Vec<f64>,
    pub f1s: Vec<f64>,
}

pub fn collect_curve_stats(
    catalog: &BuildingsCatalog,
    specs: &[NoiseSpec],
    runs: &[u32],
) -> Result<CurveStats> {
    let num_runs = runs.len() as f64;
    let mut stats = CurveStats {
        levels: Vec::new(),
        precisions: Vec::new(),
        recalls: Vec::new(),
        f1s: Vec::new(),
    };
    for &spec in specs {
        let (mut precision, mut recall, mut f1) = (0.0, 0.0, 0.0);
        for &run in runs {
            let eval = read_eval(catalog, spec, run)?;
            let building = eval.class_by_id(BUILDING_CLASS_ID)?;
            precision += building.precision;
            recall += building.recall;
            f1 += building.f1;
        }
        stats.levels.push(spec.level());
        stats.precisions.push(precision / num_runs);
        stats.recalls.push(recall / num_runs);
        stats.f1s.push(f1 / num_runs);
    }
    Ok(stats)
}

fn chart_title(noise_type: NoiseType) -> &'static str {
    match noise_type {
        NoiseType::Drop => "Trained on randomly deleted labels",
        NoiseType::Shift => "Trained on randomly shifted labels",
    }
}

fn render_curves(path: &Path, noise_type: NoiseType, stats: &CurveStats) -> Result<()> {
    let root = BitMapBackend::new(path, (1000, 750)).into_drawing_area();
    root.fill(&WHITE)?;

    let (x_min, x_max) = padded_range(&stats.levels);
    let mut chart = ChartBuilder::on(&root)
        .caption(chart_title(noise_type), ("sans-serif", 24))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(50)
        .build_cartesian_2d(x_min..x_max, 0.0f64..1.0f64)?;

    chart
        .configure_mesh()
        .x_desc("Noise level")
        .y_desc("Prediction accuracy")
        .x_labels(stats.levels.len().max(2))
        .draw()?;

    let series: [(&[f64], &str, RGBColor); 3] = [
        (&stats.precisions, "precision", BLUE),
        (&stats.recalls, "recall", GREEN),
        (&stats.f1s, "f1", RED),
    ];
    for (values, label, color) in series {
        let points = stats.levels.iter().copied().zip(values.iter().copied());
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

/// The `plot-curves` stage: one accuracy-vs-noise chart per family.
pub fn run_plot_curves(config: &HarnessConfig) -> Result<()> {
    let catalog = BuildingsCatalog::new(config);
    let out_dir = ensure_dir(&catalog.curves_plot_dir())?;
    for noise_type in [NoiseType::Shift, NoiseType::Drop] {
        let specs = config.experiment_specs(noise_type)?;
        let stats = collect_curve_stats(&catalog, &specs, &config.runs)?;
        let path = out_dir.join(format!("plot-{}.png", noise_type.label()));
        info!("saving plot to {}", path.display());
        render_curves(&path, noise_type, &stats)?;
    }
    Ok(())
}
