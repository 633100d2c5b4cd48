use nalgebra::DMatrix;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use super::features::FEATURE_COLS;
use crate::error::ArtifactError;

const DEGENERATE_SCALE: f64 = 1e-10;

/// Fitted linear feature scaler, frozen at training time. Only transforms
/// here; fitting belongs to the external training tooling.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FeatureScaler {
    MinMax {
        data_min: Vec<f64>,
        data_max: Vec<f64>,
    },
    Standard {
        mean: Vec<f64>,
        scale: Vec<f64>,
    },
}

impl FeatureScaler {
    pub fn load_from_file(path: &str) -> Result<Self, ArtifactError> {
        if !Path::new(path).exists() {
            return Err(ArtifactError::NotFound(path.to_string()));
        }

        let content = fs::read_to_string(path).map_err(|e| ArtifactError::Malformed {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let scaler: FeatureScaler =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Malformed {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        scaler.check_columns(path)?;

        info!("Loaded {} feature scaler from {}", scaler.kind_name(), path);
        Ok(scaler)
    }

    fn check_columns(&self, path: &str) -> Result<(), ArtifactError> {
        let columns = match self {
            FeatureScaler::MinMax { data_min, data_max } => (data_min.len(), data_max.len()),
            FeatureScaler::Standard { mean, scale } => (mean.len(), scale.len()),
        };
        if columns != (FEATURE_COLS, FEATURE_COLS) {
            return Err(ArtifactError::Malformed {
                path: path.to_string(),
                message: format!(
                    "scaler must carry {} columns, got {} and {}",
                    FEATURE_COLS, columns.0, columns.1
                ),
            });
        }
        Ok(())
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FeatureScaler::MinMax { .. } => "min-max",
            FeatureScaler::Standard { .. } => "standard",
        }
    }

    /// Map raw feature values into the range the model was trained on.
    pub fn transform(&self, frame: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(frame.nrows(), frame.ncols(), |row, col| {
            let (offset, scale) = self.column_params(col);
            (frame[(row, col)] - offset) / scale
        })
    }

    /// Inverse of `transform`, back to raw feature space.
    pub fn inverse_transform(&self, frame: &DMatrix<f64>) -> DMatrix<f64> {
        DMatrix::from_fn(frame.nrows(), frame.ncols(), |row, col| {
            let (offset, scale) = self.column_params(col);
            frame[(row, col)] * scale + offset
        })
    }

    // A degenerate column (constant during training) scales by 1 so the
    // transform stays invertible.
    fn column_params(&self, col: usize) -> (f64, f64) {
        match self {
            FeatureScaler::MinMax { data_min, data_max } => {
                let range = data_max[col] - data_min[col];
                let scale = if range.abs() < DEGENERATE_SCALE {
                    1.0
                } else {
                    range
                };
                (data_min[col], scale)
            }
            FeatureScaler::Standard { mean, scale } => {
                let std_dev = if scale[col].abs() < DEGENERATE_SCALE {
                    1.0
                } else {
                    scale[col]
                };
                (mean[col], std_dev)
            }
        }
    }
}
