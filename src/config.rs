use anyhow::Result;

use crate::noise::{NoiseSpec, NoiseType};

/// Shared configuration for every pipeline stage.
///
/// All the knobs the stages need live here as explicit fields instead of
/// per-stage globals: storage roots, the shared shuffle seed, scene caps,
/// and the noise-level grids each stage sweeps. The defaults reproduce the
/// SpaceNet Vegas setup this harness was built around; tests override the
/// roots to point at temporary directories.
#[derive(Debug, Clone)]
pub struct HarnessConfig {
    /// Read imagery/labels from the remote roots instead of the local ones.
    pub use_remote_data: bool,
    /// Shrink workloads to smoke-test size (tiny split, single train step).
    pub test: bool,

    /// Processed-data root on the object store (noisy labels, rv output).
    pub remote_root_uri: String,
    /// Processed-data root on local disk. Plots and stats always land here.
    pub local_root_uri: String,
    /// Raw SpaceNet imagery + labels on the object store.
    pub remote_raw_data_uri: String,
    /// Raw SpaceNet imagery + labels on local disk.
    pub local_raw_data_uri: String,

    /// Seed for every deterministic shuffle and for noise synthesis.
    pub seed: u64,
    /// Fraction of the capped scene list used for training.
    pub train_proportion: f64,
    /// Scene cap for the train/validation split.
    pub max_split_scenes: usize,
    /// Scene cap for the split under `test`.
    pub test_max_split_scenes: usize,
    /// Number of scenes sampled when measuring noise impact.
    pub analysis_sample_size: usize,

    /// Shift magnitudes (pixels) the synth stage generates labels for.
    pub synth_shift_levels: Vec<u32>,
    /// Drop probabilities the synth stage generates labels for.
    pub synth_drop_levels: Vec<f64>,
    /// Shift magnitudes the analyze stage accumulates stats for.
    pub analysis_shift_levels: Vec<u32>,
    /// Drop probabilities the analyze stage accumulates stats for.
    pub analysis_drop_levels: Vec<f64>,
    /// Shift magnitudes experiments were trained on (also the curve plots).
    pub experiment_shift_levels: Vec<u32>,
    /// Drop probabilities experiments were trained on (also the curve plots).
    pub experiment_drop_levels: Vec<f64>,
    /// Repeated-run indices to average evaluation results over.
    pub runs: Vec<u32>,
    /// Scenes shown in the overlay montages.
    pub plot_scene_ids: Vec<String>,
    /// Per-channel means of the raw imagery, for display normalization.
    pub display_channel_means: [f64; 3],
    /// Per-channel standard deviations of the raw imagery.
    pub display_channel_stds: [f64; 3],
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            use_remote_data: false,
            test: false,
            remote_root_uri: "s3://raster-vision-lf-dev/noisy-buildings-semseg".to_string(),
            local_root_uri: "/opt/data/noisy-buildings-semseg".to_string(),
            remote_raw_data_uri: "s3://spacenet-dataset/SpaceNet_Buildings_Dataset_Round2/spacenetV2_Train/AOI_2_Vegas"
                .to_string(),
            local_raw_data_uri: "/opt/data/AOI_2_Vegas_Train".to_string(),
            seed: 5678,
            train_proportion: 0.8,
            max_split_scenes: 1000,
            test_max_split_scenes: 20,
            analysis_sample_size: 50,
            synth_shift_levels: vec![0, 10, 20, 30, 40],
            synth_drop_levels: vec![0.0, 0.1, 0.2, 0.3, 0.4],
            analysis_shift_levels: vec![0, 10, 20, 30, 40, 50],
            analysis_drop_levels: vec![0.0, 0.1, 0.2, 0.3, 0.4, 0.5],
            experiment_shift_levels: vec![0, 10, 20, 40],
            experiment_drop_levels: vec![0.0, 0.1, 0.2, 0.4],
            runs: vec![0],
            plot_scene_ids: vec!["3590".to_string(), "581".to_string(), "1246".to_string()],
            display_channel_means: [462.4939189390183, 633.5548961566001, 464.99947912120706],
            display_channel_stds: [248.46624190502172, 271.07249107975275, 162.06929299061807],
        }
    }
}

impl HarnessConfig {
    pub fn new(use_remote_data: bool, test: bool) -> Self {
        Self {
            use_remote_data,
            test,
            ..Self::default()
        }
    }

    /// Processed-data root for the current data location.
    pub fn root_uri(&self) -> &str {
        if self.use_remote_data {
            &self.remote_root_uri
        } else {
            &self.local_root_uri
        }
    }

    /// Raw-dataset root for the current data location.
    pub fn raw_data_uri(&self) -> &str {
        if self.use_remote_data {
            &self.remote_raw_data_uri
        } else {
            &self.local_raw_data_uri
        }
    }

    /// Scene cap for the train/validation split, honoring test mode.
    pub fn split_scene_cap(&self) -> usize {
        if self.test {
            self.test_max_split_scenes
        } else {
            self.max_split_scenes
        }
    }

    /// Every spec the synth stage generates labels for, shifts first.
    pub fn synth_specs(&self) -> Result<Vec<NoiseSpec>> {
        let mut specs: Vec<NoiseSpec> = self
            .synth_shift_levels
            .iter()
            .map(|&pixels| NoiseSpec::shift(pixels))
            .collect();
        for &prob in &self.synth_drop_levels {
            specs.push(NoiseSpec::drop(prob)?);
        }
        Ok(specs)
    }

    /// One family's specs at the analysis grid resolution.
    pub fn analysis_specs(&self, noise_type: NoiseType) -> Result<Vec<NoiseSpec>> {
        specs_for(
            noise_type,
            &self.analysis_shift_levels,
            &self.analysis_drop_levels,
        )
    }

    /// One family's specs at the grid experiments were trained on.
    pub fn experiment_specs(&self, noise_type: NoiseType) -> Result<Vec<NoiseSpec>> {
        specs_for(
            noise_type,
            &self.experiment_shift_levels,
            &self.experiment_drop_levels,
        )
    }
}

fn specs_for(noise_type: NoiseType, shifts: &[u32], drops: &[f64]) -> Result<Vec<NoiseSpec>> {
    match noise_type {
        NoiseType::Shift => Ok(shifts.iter().map(|&pixels| NoiseSpec::shift(pixels)).collect()),
        NoiseType::Drop => drops.iter().map(|&prob| NoiseSpec::drop(prob)).collect(),
    }
}
