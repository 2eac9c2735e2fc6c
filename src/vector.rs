//! GeoJSON vector-label model.
//!
//! Only the shapes the pipeline manipulates (Polygon / MultiPolygon) are
//! parsed structurally; any other geometry is carried as raw JSON so a
//! collection round-trips losslessly even when it contains features this
//! harness never touches.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// One linear ring: `[x, y]` positions in map coordinates, first == last.
pub type Ring = Vec<[f64; 2]>;

/// Polygon-family geometry in standard GeoJSON nesting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum AreaGeometry {
    Polygon { coordinates: Vec<Ring> },
    MultiPolygon { coordinates: Vec<Vec<Ring>> },
}

impl AreaGeometry {
    /// Outer ring of the polygon, or of each member polygon in turn.
    /// Interior (hole) rings are not included.
    pub fn outer_rings(&self) -> Vec<&Ring> {
        match self {
            AreaGeometry::Polygon { coordinates } => coordinates.iter().take(1).collect(),
            AreaGeometry::MultiPolygon { coordinates } => {
                coordinates.iter().filter_map(|rings| rings.first()).collect()
            }
        }
    }
}

/// Feature geometry: a parsed areal shape, or anything else verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Geometry {
    Area(AreaGeometry),
    Other(serde_json::Value),
}

impl Geometry {
    pub fn polygon(rings: Vec<Ring>) -> Self {
        Geometry::Area(AreaGeometry::Polygon { coordinates: rings })
    }

    /// The GeoJSON `type` string, best effort for unparsed geometries.
    pub fn type_name(&self) -> &str {
        match self {
            Geometry::Area(AreaGeometry::Polygon { .. }) => "Polygon",
            Geometry::Area(AreaGeometry::MultiPolygon { .. }) => "MultiPolygon",
            Geometry::Other(value) => value
                .get("type")
                .and_then(|t| t.as_str())
                .unwrap_or("<untyped>"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feature {
    #[serde(rename = "type", default = "feature_type")]
    pub kind: String,
    pub geometry: Geometry,
    /// Opaque attributes, preserved verbatim through noise synthesis.
    #[serde(default)]
    pub properties: serde_json::Value,
}

fn feature_type() -> String {
    "Feature".to_string()
}

impl Feature {
    pub fn new(geometry: Geometry, properties: serde_json::Value) -> Self {
        Self {
            kind: feature_type(),
            geometry,
            properties,
        }
    }

    /// Convenience for the common single-ring polygon case.
    pub fn polygon(rings: Vec<Ring>, properties: serde_json::Value) -> Self {
        Self::new(Geometry::polygon(rings), properties)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureCollection {
    #[serde(rename = "type", default = "collection_type")]
    pub kind: String,
    pub features: Vec<Feature>,
}

fn collection_type() -> String {
    "FeatureCollection".to_string()
}

impl FeatureCollection {
    pub fn new(features: Vec<Feature>) -> Self {
        Self {
            kind: collection_type(),
            features,
        }
    }

    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read GeoJSON {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse GeoJSON {}", path.display()))
    }

    /// Serialize to `path`, creating parent directories as needed.
    pub fn write(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
        let raw = serde_json::to_string(self)?;
        fs::write(path, raw)
            .with_context(|| format!("failed to write GeoJSON {}", path.display()))
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }
}
