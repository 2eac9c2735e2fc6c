mod fixtures;
pub use fixtures::*;

// Re-export commonly used types from noisy_buildings_semseg for tests
pub use noisy_buildings_semseg::catalog::{
    exp_id, local_path, BuildingsCatalog, BACKGROUND_CLASS_ID, BUILDING_CLASS_ID,
};
pub use noisy_buildings_semseg::config::HarnessConfig;
pub use noisy_buildings_semseg::metrics::{ConfusionMatrix, ExperimentStats};
pub use noisy_buildings_semseg::noise::{NoiseSpec, NoiseType};
pub use noisy_buildings_semseg::vector::{Feature, FeatureCollection, Geometry, Ring};
