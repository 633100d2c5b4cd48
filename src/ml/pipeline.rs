use nalgebra::DMatrix;
use serde::Serialize;
use std::sync::Arc;

use super::features::{ValidatedSeries, FEATURE_COLS, HORIZON, SEQ_LEN};
use super::model::SequenceModel;
use super::scaler::FeatureScaler;
use crate::error::ServiceError;

#[derive(Debug, Clone, Serialize)]
pub struct ForecastResult {
    pub daywise: Vec<f64>,
    pub forecast: f64,
    pub horizon_days: usize,
}

/// Turns a validated daily series into a 7-day forecast: features, scaling,
/// trailing window, model inference, then the inverse transforms back to
/// daily amounts.
pub struct ForecastPipeline {
    scaler: Arc<FeatureScaler>,
    model: Arc<dyn SequenceModel>,
}

impl ForecastPipeline {
    pub fn new(scaler: Arc<FeatureScaler>, model: Arc<dyn SequenceModel>) -> Self {
        Self { scaler, model }
    }

    pub fn forecast(&self, input: &ValidatedSeries) -> Result<ForecastResult, ServiceError> {
        let frame = input.feature_frame();
        let scaled = self.scaler.transform(&frame);
        let window = scaled.rows(scaled.nrows() - SEQ_LEN, SEQ_LEN).into_owned();

        let predicted = self.model.predict(&window)?;
        if predicted.len() != HORIZON {
            return Err(ServiceError::Prediction(format!(
                "model returned {} values, expected {}",
                predicted.len(),
                HORIZON
            )));
        }

        // The scaler is fitted on all three feature columns, so the scaled
        // predictions go into column 0 of a zero-filled frame; the other
        // columns are placeholders for the inverse transform.
        let mut placeholder = DMatrix::zeros(HORIZON, FEATURE_COLS);
        for (row, value) in predicted.iter().enumerate() {
            placeholder[(row, 0)] = *value;
        }
        let inverted = self.scaler.inverse_transform(&placeholder);

        let daywise: Vec<f64> = (0..HORIZON).map(|row| inverted[(row, 0)].exp_m1()).collect();
        let forecast = daywise.iter().sum();

        Ok(ForecastResult {
            daywise,
            forecast,
            horizon_days: HORIZON,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedModel {
        output: Vec<f64>,
    }

    impl SequenceModel for FixedModel {
        fn predict(&self, _window: &DMatrix<f64>) -> Result<Vec<f64>, ServiceError> {
            Ok(self.output.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    fn identity_scaler() -> FeatureScaler {
        FeatureScaler::MinMax {
            data_min: vec![0.0, 0.0, 0.0],
            data_max: vec![1.0, 1.0, 1.0],
        }
    }

    fn pipeline_with_output(output: Vec<f64>) -> ForecastPipeline {
        ForecastPipeline::new(
            Arc::new(identity_scaler()),
            Arc::new(FixedModel { output }),
        )
    }

    fn input_series() -> ValidatedSeries {
        let series: Vec<f64> = (0..45).map(|i| 20.0 + (i % 7) as f64).collect();
        ValidatedSeries::new(series, None).unwrap()
    }

    #[test]
    fn returns_seven_days_and_their_exact_sum() {
        let scaled_outputs: Vec<f64> = (1..=7).map(|d| (d as f64).ln_1p()).collect();
        let pipeline = pipeline_with_output(scaled_outputs);

        let result = pipeline.forecast(&input_series()).unwrap();

        assert_eq!(result.horizon_days, HORIZON);
        assert_eq!(result.daywise.len(), HORIZON);
        for (day, value) in result.daywise.iter().enumerate() {
            // identity scaler, so expm1 undoes the ln_1p above
            assert!((value - (day + 1) as f64).abs() < 1e-9);
        }
        assert_eq!(result.forecast, result.daywise.iter().sum::<f64>());
    }

    #[test]
    fn applies_inverse_scaling_before_inverse_log() {
        let scaler = FeatureScaler::MinMax {
            data_min: vec![1.0, 0.0, 0.0],
            data_max: vec![3.0, 6.0, 1.0],
        };
        let pipeline = ForecastPipeline::new(
            Arc::new(scaler),
            Arc::new(FixedModel {
                output: vec![0.5; HORIZON],
            }),
        );

        let result = pipeline.forecast(&input_series()).unwrap();

        // 0.5 inverse-scales to 2.0 in log space, then expm1
        let expected = 2.0f64.exp_m1();
        for value in &result.daywise {
            assert!((value - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn rejects_model_output_of_wrong_length() {
        let pipeline = pipeline_with_output(vec![0.1; 3]);
        let err = pipeline.forecast(&input_series()).unwrap_err();
        assert!(matches!(err, ServiceError::Prediction(_)));
    }
}
