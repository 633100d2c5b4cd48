use serde::Deserialize;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::info;

use crate::error::{ArtifactError, ServiceError};

/// Multinomial naive-Bayes text classifier exported by the training
/// tooling: class names, per-class log-priors, a token vocabulary and
/// per-class per-token log-likelihoods.
#[derive(Debug, Deserialize)]
pub struct CategoryClassifier {
    classes: Vec<String>,
    class_log_prior: Vec<f64>,
    vocabulary: HashMap<String, usize>,
    feature_log_prob: Vec<Vec<f64>>,
}

impl CategoryClassifier {
    pub fn load_from_file(path: &str) -> Result<Self, ArtifactError> {
        if !Path::new(path).exists() {
            return Err(ArtifactError::NotFound(path.to_string()));
        }

        let content = fs::read_to_string(path).map_err(|e| ArtifactError::Malformed {
            path: path.to_string(),
            message: e.to_string(),
        })?;
        let classifier: CategoryClassifier =
            serde_json::from_str(&content).map_err(|e| ArtifactError::Malformed {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        classifier.validate().map_err(|message| ArtifactError::Malformed {
            path: path.to_string(),
            message,
        })?;

        info!(
            "Loaded category classifier from {} ({} classes, {} tokens)",
            path,
            classifier.classes.len(),
            classifier.vocabulary.len()
        );
        Ok(classifier)
    }

    fn validate(&self) -> Result<(), String> {
        if self.classes.is_empty() {
            return Err("classifier must define at least one class".to_string());
        }
        if self.class_log_prior.len() != self.classes.len() {
            return Err("class_log_prior length must match classes".to_string());
        }
        if self.feature_log_prob.len() != self.classes.len() {
            return Err("feature_log_prob must have one row per class".to_string());
        }
        let vocab_size = self.vocabulary.len();
        if self.feature_log_prob.iter().any(|row| row.len() != vocab_size) {
            return Err("feature_log_prob rows must match vocabulary size".to_string());
        }
        if self.vocabulary.values().any(|&column| column >= vocab_size) {
            return Err("vocabulary column out of range".to_string());
        }
        Ok(())
    }

    /// Pick the highest-scoring class for a description. Tokens outside the
    /// training vocabulary are skipped, so an all-unknown description falls
    /// back to the class priors.
    pub fn classify(&self, description: &str) -> Result<String, ServiceError> {
        let tokens = tokenize(description);
        if tokens.is_empty() {
            return Err(ServiceError::Validation(
                "'description' is required".to_string(),
            ));
        }

        let mut best_class = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (class, prior) in self.class_log_prior.iter().enumerate() {
            let mut score = *prior;
            for token in &tokens {
                if let Some(&column) = self.vocabulary.get(token.as_str()) {
                    score += self.feature_log_prob[class][column];
                }
            }
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }

        Ok(self.classes[best_class].clone())
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_classifier() -> CategoryClassifier {
        // Two classes over a four-token vocabulary; "coffee" and "lunch"
        // lean food, "uber" and "train" lean transport.
        let vocabulary: HashMap<String, usize> = [
            ("coffee".to_string(), 0),
            ("lunch".to_string(), 1),
            ("uber".to_string(), 2),
            ("train".to_string(), 3),
        ]
        .into_iter()
        .collect();

        CategoryClassifier {
            classes: vec!["Food".to_string(), "Transport".to_string()],
            class_log_prior: vec![(0.6f64).ln(), (0.4f64).ln()],
            vocabulary,
            feature_log_prob: vec![
                vec![(0.4f64).ln(), (0.4f64).ln(), (0.1f64).ln(), (0.1f64).ln()],
                vec![(0.1f64).ln(), (0.1f64).ln(), (0.4f64).ln(), (0.4f64).ln()],
            ],
        }
    }

    #[test]
    fn classifies_by_token_evidence() {
        let classifier = sample_classifier();
        assert_eq!(classifier.classify("Morning coffee").unwrap(), "Food");
        assert_eq!(classifier.classify("Uber to the train station").unwrap(), "Transport");
    }

    #[test]
    fn unknown_tokens_fall_back_to_priors() {
        let classifier = sample_classifier();
        assert_eq!(classifier.classify("zzz qqq").unwrap(), "Food");
    }

    #[test]
    fn empty_description_is_a_validation_error() {
        let classifier = sample_classifier();
        let err = classifier.classify("   ").unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn rejects_mismatched_artifact_dimensions() {
        let mut classifier = sample_classifier();
        classifier.class_log_prior.pop();
        assert!(classifier.validate().is_err());
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = CategoryClassifier::load_from_file("no/such/classifier.json").unwrap_err();
        assert!(matches!(err, ArtifactError::NotFound(_)));
    }
}
