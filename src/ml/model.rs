use nalgebra::{DMatrix, DVector};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::info;

use super::features::{FEATURE_COLS, HORIZON, SEQ_LEN};
use crate::error::{ArtifactError, ServiceError};

/// Interface for trained sequence forecasting models.
pub trait SequenceModel: Send + Sync {
    /// Predict one scaled value per horizon day from a (SEQ_LEN, FEATURE_COLS)
    /// window of scaled features.
    fn predict(&self, window: &DMatrix<f64>) -> Result<Vec<f64>, ServiceError>;

    fn name(&self) -> &str;
}

/// Weight artifact exported by the training tooling: a single LSTM layer
/// with gates in i, f, g, o order and a dense head mapping the final hidden
/// state to one output per horizon day.
#[derive(Debug, Deserialize)]
struct LstmArtifact {
    hidden_size: usize,
    w_ih: Vec<Vec<f64>>,
    w_hh: Vec<Vec<f64>>,
    bias: Vec<f64>,
    head_w: Vec<Vec<f64>>,
    head_b: Vec<f64>,
}

#[derive(Debug)]
pub struct LstmForecaster {
    hidden_size: usize,
    w_ih: DMatrix<f64>,
    w_hh: DMatrix<f64>,
    bias: DVector<f64>,
    head_w: DMatrix<f64>,
    head_b: DVector<f64>,
}

impl LstmForecaster {
    pub fn load_from_file(path: &str) -> Result<Self, ArtifactError> {
        if !Path::new(path).exists() {
            return Err(ArtifactError::NotFound(path.to_string()));
        }

        let content = fs::read_to_string(path).map_err(|e| ArtifactError::Malformed {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let artifact: LstmArtifact =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Malformed {
                path: path.to_string(),
                message: e.to_string(),
            })?;

        let forecaster = Self::from_artifact(artifact).map_err(|message| {
            ArtifactError::Malformed {
                path: path.to_string(),
                message,
            }
        })?;

        info!(
            "Loaded LSTM forecaster from {} (hidden size {})",
            path, forecaster.hidden_size
        );
        Ok(forecaster)
    }

    fn from_artifact(artifact: LstmArtifact) -> Result<Self, String> {
        let hidden = artifact.hidden_size;
        if hidden == 0 {
            return Err("hidden_size must be positive".to_string());
        }

        let w_ih = matrix_from_rows("w_ih", &artifact.w_ih, 4 * hidden, FEATURE_COLS)?;
        let w_hh = matrix_from_rows("w_hh", &artifact.w_hh, 4 * hidden, hidden)?;
        let head_w = matrix_from_rows("head_w", &artifact.head_w, HORIZON, hidden)?;

        if artifact.bias.len() != 4 * hidden {
            return Err(format!(
                "bias must have {} entries, got {}",
                4 * hidden,
                artifact.bias.len()
            ));
        }
        if artifact.head_b.len() != HORIZON {
            return Err(format!(
                "head_b must have {} entries, got {}",
                HORIZON,
                artifact.head_b.len()
            ));
        }

        Ok(Self {
            hidden_size: hidden,
            w_ih,
            w_hh,
            bias: DVector::from_vec(artifact.bias),
            head_w,
            head_b: DVector::from_vec(artifact.head_b),
        })
    }
}

impl SequenceModel for LstmForecaster {
    fn predict(&self, window: &DMatrix<f64>) -> Result<Vec<f64>, ServiceError> {
        if window.nrows() != SEQ_LEN || window.ncols() != FEATURE_COLS {
            return Err(ServiceError::Prediction(format!(
                "input window must be ({}, {}), got ({}, {})",
                SEQ_LEN,
                FEATURE_COLS,
                window.nrows(),
                window.ncols()
            )));
        }

        let hidden = self.hidden_size;
        let mut h = DVector::zeros(hidden);
        let mut c = DVector::zeros(hidden);

        for t in 0..SEQ_LEN {
            let x = window.row(t).transpose();
            let z = &self.w_ih * x + &self.w_hh * &h + &self.bias;

            let i = z.rows(0, hidden).map(sigmoid);
            let f = z.rows(hidden, hidden).map(sigmoid);
            let g = z.rows(2 * hidden, hidden).map(f64::tanh);
            let o = z.rows(3 * hidden, hidden).map(sigmoid);

            c = f.component_mul(&c) + i.component_mul(&g);
            h = o.component_mul(&c.map(f64::tanh));
        }

        let output = &self.head_w * h + &self.head_b;
        Ok(output.iter().copied().collect())
    }

    fn name(&self) -> &str {
        "lstm-forecaster"
    }
}

fn matrix_from_rows(
    name: &str,
    rows: &[Vec<f64>],
    expected_rows: usize,
    expected_cols: usize,
) -> Result<DMatrix<f64>, String> {
    if rows.len() != expected_rows {
        return Err(format!(
            "{} must have {} rows, got {}",
            name,
            expected_rows,
            rows.len()
        ));
    }
    if rows.iter().any(|row| row.len() != expected_cols) {
        return Err(format!("{} rows must all have {} columns", name, expected_cols));
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Ok(DMatrix::from_row_slice(expected_rows, expected_cols, &flat))
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
