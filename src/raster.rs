//! Raster-side label handling: burning vector labels onto class grids,
//! reading class rasters back, and display normalization of the source
//! imagery.

use std::path::Path;

use anyhow::{Context, Result};
use image::{GrayImage, Luma, Rgb, RgbImage};
use imageproc::drawing::draw_polygon_mut;
use imageproc::point::Point;
use tracing::warn;

use crate::catalog::{BACKGROUND_CLASS_ID, BUILDING_CLASS_ID};
use crate::georef::GeoTransform;
use crate::vector::{Feature, Geometry, Ring};

/// Burn a label set onto a width x height class grid: Background
/// everywhere, Building inside each outer ring (boundary included).
/// Rings that collapse below three distinct pixels are skipped.
pub fn rasterize_labels(
    features: &[Feature],
    georef: &GeoTransform,
    width: u32,
    height: u32,
) -> GrayImage {
    let mut grid = GrayImage::from_pixel(width, height, Luma([BACKGROUND_CLASS_ID]));
    for feature in features {
        let Geometry::Area(area) = &feature.geometry else {
            warn!("cannot rasterize {} geometry", feature.geometry.type_name());
            continue;
        };
        for ring in area.outer_rings() {
            match pixel_ring(ring, georef) {
                Some(points) => {
                    draw_polygon_mut(&mut grid, &points, Luma([BUILDING_CLASS_ID]));
                }
                None => warn!("skipping ring with fewer than 3 distinct pixels"),
            }
        }
    }
    grid
}

/// Project a ring to integer pixel vertices as an open path: consecutive
/// duplicates collapse and the closing vertex is stripped, since the
/// polygon fill requires first != last.
fn pixel_ring(ring: &Ring, georef: &GeoTransform) -> Option<Vec<Point<i32>>> {
    let mut points: Vec<Point<i32>> = Vec::with_capacity(ring.len());
    for &[x, y] in ring {
        let (col, row) = georef.map_to_pixel(x, y);
        let point = Point::new(col.round() as i32, row.round() as i32);
        if points.last() != Some(&point) {
            points.push(point);
        }
    }
    while points.len() > 1 && points.first() == points.last() {
        points.pop();
    }
    (points.len() >= 3).then_some(points)
}

/// Read a single-band class raster (e.g. a predicted label grid).
pub fn read_class_raster(path: &Path) -> Result<GrayImage> {
    let img = image::open(path)
        .with_context(|| format!("failed to read class raster {}", path.display()))?;
    Ok(img.to_luma8())
}

/// Raster width/height from the file header, without a full decode.
pub fn raster_dimensions(path: &Path) -> Result<(u32, u32)> {
    image::image_dimensions(path)
        .with_context(|| format!("failed to read raster header {}", path.display()))
}

/// Dataset-wide channel statistics used to normalize the 16-bit imagery
/// for display.
#[derive(Debug, Clone, Copy)]
pub struct RasterStats {
    pub means: [f64; 3],
    pub stds: [f64; 3],
}

/// Read a scene raster and map it to 8-bit for display: per-channel
/// z-scores, with [-3, 3] spanning 0..=255.
pub fn read_display_raster(path: &Path, stats: &RasterStats) -> Result<RgbImage> {
    let img = image::open(path)
        .with_context(|| format!("failed to read raster {}", path.display()))?
        .to_rgb16();
    let (width, height) = img.dimensions();
    let mut out = RgbImage::new(width, height);
    for (x, y, px) in img.enumerate_pixels() {
        let mut rgb = [0u8; 3];
        for c in 0..3 {
            let z = (f64::from(px.0[c]) - stats.means[c]) / stats.stds[c];
            let t = ((z + 3.0) / 6.0).clamp(0.0, 1.0);
            rgb[c] = (t * 255.0) as u8;
        }
        out.put_pixel(x, y, Rgb(rgb));
    }
    Ok(out)
}
