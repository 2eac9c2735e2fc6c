//! Evaluation output of the external training framework.
//!
//! `eval.json` carries an `overall` array of per-class records; the
//! harness selects the Building record by class id for accuracy curves
//! and the "average" record by name for combined error analysis.

use std::fs;
use std::path::Path;

use anyhow::{bail, ensure, Context, Result};
use serde::Deserialize;

use crate::metrics::{ConfusionMatrix, NUM_CLASSES};

/// One per-class record. Fields the framework may omit default to zero
/// or `None`; the matrix shape varies between historical outputs.
#[derive(Debug, Clone, Deserialize)]
pub struct ClassEvaluation {
    #[serde(default)]
    pub class_id: Option<u8>,
    #[serde(default)]
    pub class_name: Option<String>,
    #[serde(default)]
    pub precision: f64,
    #[serde(default)]
    pub recall: f64,
    #[serde(default)]
    pub f1: f64,
    #[serde(default)]
    pub conf_mat: Option<Vec<Vec<f64>>>,
}

impl ClassEvaluation {
    /// The record's confusion matrix lifted into the 3-class frame.
    ///
    /// Some evaluation runs predate the ignore class and ship 2x2
    /// matrices over {Building, Background}; those embed at rows and
    /// columns 1..3 so class indices stay aligned. 3x3 matrices pass
    /// through unchanged.
    pub fn conf_mat3(&self) -> Result<ConfusionMatrix> {
        let Some(cm) = &self.conf_mat else {
            bail!("evaluation record carries no conf_mat");
        };
        let offset = match cm.len() {
            n if n == NUM_CLASSES => 0,
            n if n == NUM_CLASSES - 1 => 1,
            n => bail!("unsupported conf_mat with {n} rows"),
        };
        let mut out = ConfusionMatrix::zeros();
        for (r, row) in cm.iter().enumerate() {
            ensure!(
                row.len() == cm.len(),
                "ragged conf_mat row: {} columns in a {}-row matrix",
                row.len(),
                cm.len()
            );
            for (c, &value) in row.iter().enumerate() {
                out.0[r + offset][c + offset] = value;
            }
        }
        Ok(out)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Evaluation {
    pub overall: Vec<ClassEvaluation>,
}

impl Evaluation {
    pub fn read(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read evaluation {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("failed to parse evaluation {}", path.display()))
    }

    pub fn class_by_id(&self, class_id: u8) -> Result<&ClassEvaluation> {
        self.overall
            .iter()
            .find(|e| e.class_id == Some(class_id))
            .with_context(|| format!("no evaluation record for class id {class_id}"))
    }

    pub fn class_by_name(&self, class_name: &str) -> Result<&ClassEvaluation> {
        self.overall
            .iter()
            .find(|e| e.class_name.as_deref() == Some(class_name))
            .with_context(|| format!("no evaluation record named {class_name:?}"))
    }
}
