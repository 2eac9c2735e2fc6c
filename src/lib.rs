pub mod catalog;
pub mod config;
pub mod eval;
pub mod experiment;
pub mod georef;
pub mod metrics;
pub mod noise;
pub mod plot;
pub mod raster;
pub mod vector;

pub use catalog::{BuildingsCatalog, Scene, SegClass};
pub use config::HarnessConfig;
pub use eval::{ClassEvaluation, Evaluation};
pub use experiment::ExperimentConfig;
pub use georef::GeoTransform;
pub use metrics::{ConfusionMatrix, ExperimentStats};
pub use noise::{NoiseSpec, NoiseType};
pub use vector::{Feature, FeatureCollection, Geometry};
