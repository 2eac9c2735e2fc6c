//! Georeferencing via ESRI world files.
//!
//! Each scene raster carries a `.tfw` sidecar holding the six affine
//! coefficients that place pixels in map coordinates. The world-file line
//! order is x-scale, y-skew, x-skew, y-scale, x-origin, y-origin; the
//! origin names the center of the upper-left pixel.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};

/// Invertible pixel<->map affine transform.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform {
    /// Forward coefficients `[a, b, c, d, e, f]`:
    /// `x = a*col + b*row + c`, `y = d*col + e*row + f`.
    fwd: [f64; 6],
    /// Precomputed inverse in the same layout.
    inv: [f64; 6],
}

impl GeoTransform {
    pub fn new(fwd: [f64; 6]) -> Result<Self> {
        let [a, b, _c, d, e, _f] = fwd;
        let det = a * e - b * d;
        if det.abs() < f64::EPSILON {
            bail!("geotransform {fwd:?} is not invertible");
        }
        let inv = [
            e / det,
            -b / det,
            (b * fwd[5] - e * fwd[2]) / det,
            -d / det,
            a / det,
            (d * fwd[2] - a * fwd[5]) / det,
        ];
        Ok(Self { fwd, inv })
    }

    /// Parse the six-line world-file format.
    pub fn read_world_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read world file {}", path.display()))?;
        let values: Vec<f64> = raw
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| {
                line.parse::<f64>()
                    .with_context(|| format!("bad world-file line {line:?} in {}", path.display()))
            })
            .collect::<Result<_>>()?;
        if values.len() != 6 {
            bail!(
                "world file {} has {} values, expected 6",
                path.display(),
                values.len()
            );
        }
        // World-file order is [a, d, b, e, c, f].
        Self::new([
            values[0], values[2], values[4], values[1], values[3], values[5],
        ])
    }

    pub fn write_world_file(&self, path: &Path) -> Result<()> {
        let [a, b, c, d, e, f] = self.fwd;
        let raw = format!("{a}\n{d}\n{b}\n{e}\n{c}\n{f}\n");
        fs::write(path, raw)
            .with_context(|| format!("failed to write world file {}", path.display()))
    }

    pub fn pixel_to_map(&self, col: f64, row: f64) -> (f64, f64) {
        apply(&self.fwd, col, row)
    }

    pub fn map_to_pixel(&self, x: f64, y: f64) -> (f64, f64) {
        apply(&self.inv, x, y)
    }
}

fn apply(m: &[f64; 6], u: f64, v: f64) -> (f64, f64) {
    (m[0] * u + m[1] * v + m[2], m[3] * u + m[4] * v + m[5])
}
