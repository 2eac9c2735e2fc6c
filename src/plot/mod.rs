//! Rendering of aggregated metrics: accuracy curves, combined
//! label-vs-prediction error charts, and label/prediction overlay
//! montages.

pub mod combined;
pub mod curves;
pub mod images;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::catalog::{exp_id, local_path, BuildingsCatalog};
use crate::eval::Evaluation;
use crate::noise::NoiseSpec;

/// Resolve a plot directory URI and make sure it exists.
fn ensure_dir(uri: &str) -> Result<PathBuf> {
    let dir = local_path(uri)?;
    fs::create_dir_all(&dir).with_context(|| format!("failed to create {}", dir.display()))?;
    Ok(dir)
}

/// One experiment's evaluation output for a (spec, run) pair.
fn read_eval(catalog: &BuildingsCatalog, spec: NoiseSpec, run: u32) -> Result<Evaluation> {
    Evaluation::read(&local_path(&catalog.eval_uri(&exp_id(spec, run)))?)
}

/// Axis range covering `values` with 5% padding each side. A degenerate
/// span still yields a drawable range.
fn padded_range(values: &[f64]) -> (f64, f64) {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for &v in values {
        min = min.min(v);
        max = max.max(v);
    }
    if !min.is_finite() || !max.is_finite() {
        return (0.0, 1.0);
    }
    let span = max - min;
    let pad = if span == 0.0 { 0.5 } else { span * 0.05 };
    (min - pad, max + pad)
}
