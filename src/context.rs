use std::sync::Arc;
use tracing::warn;

use crate::config::Config;
use crate::error::{ArtifactError, ServiceError};
use crate::ml::{
    CategoryClassifier, FeatureScaler, ForecastPipeline, ForecastResult, LstmForecaster,
    ValidatedSeries,
};

/// Immutable service state built once at startup and shared read-only
/// across request handlers. A capability whose artifacts failed to load
/// stays unavailable and answers 503, the process keeps running.
pub struct ServiceContext {
    pipeline: Option<ForecastPipeline>,
    classifier: Option<CategoryClassifier>,
}

impl ServiceContext {
    pub fn initialize(config: &Config) -> Self {
        let scaler = load_or_warn(
            "feature scaler",
            FeatureScaler::load_from_file(&config.artifacts.scaler_path),
        );
        let model = load_or_warn(
            "sequence model",
            LstmForecaster::load_from_file(&config.artifacts.model_path),
        );
        let pipeline = match (scaler, model) {
            (Some(scaler), Some(model)) => {
                Some(ForecastPipeline::new(Arc::new(scaler), Arc::new(model)))
            }
            _ => None,
        };

        let classifier = load_or_warn(
            "category classifier",
            CategoryClassifier::load_from_file(&config.artifacts.classifier_path),
        );

        Self {
            pipeline,
            classifier,
        }
    }

    /// Input validation runs first so a malformed request is rejected
    /// before artifact availability is even consulted.
    pub fn forecast(
        &self,
        series: Vec<f64>,
        dates: Option<Vec<String>>,
    ) -> Result<ForecastResult, ServiceError> {
        let input = ValidatedSeries::new(series, dates)?;
        let pipeline = self.pipeline.as_ref().ok_or_else(|| {
            ServiceError::Unavailable("forecast model or scaler is not loaded".to_string())
        })?;
        pipeline.forecast(&input)
    }

    pub fn classify(&self, description: &str) -> Result<String, ServiceError> {
        if description.trim().is_empty() {
            return Err(ServiceError::Validation(
                "'description' is required".to_string(),
            ));
        }
        let classifier = self.classifier.as_ref().ok_or_else(|| {
            ServiceError::Unavailable("category classifier is not loaded".to_string())
        })?;
        classifier.classify(description)
    }

    #[cfg(test)]
    pub fn from_parts(
        pipeline: Option<ForecastPipeline>,
        classifier: Option<CategoryClassifier>,
    ) -> Self {
        Self {
            pipeline,
            classifier,
        }
    }
}

fn load_or_warn<T>(what: &str, result: Result<T, ArtifactError>) -> Option<T> {
    match result {
        Ok(artifact) => Some(artifact),
        Err(e) => {
            warn!("{} unavailable: {}", what, e);
            None
        }
    }
}
