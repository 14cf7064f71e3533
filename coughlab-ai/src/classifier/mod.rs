//! Disease classification
//!
//! The upload path only depends on the [`Classifier`] trait, so the mock can
//! be swapped for a trained model without touching request handling.

pub mod mock;

pub use mock::MockClassifier;

use crate::features::FeatureVector;
use crate::models::Probabilities;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("No disease labels to classify against")]
    NoLabels,

    #[error("Classifier failure: {0}")]
    Internal(String),
}

/// Normalized probability distribution with its arg-max
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub label: String,
    pub confidence: f64,
    /// Probabilities in the order the labels were passed
    pub distribution: Probabilities,
}

impl Classification {
    /// Normalize raw non-negative scores over `labels` and pick the winner
    ///
    /// Ties go to the earliest label. An all-zero score vector becomes a
    /// uniform distribution.
    pub fn from_scores(labels: &[String], scores: &[f64]) -> Result<Self, ClassifierError> {
        if labels.is_empty() {
            return Err(ClassifierError::NoLabels);
        }
        if labels.len() != scores.len() {
            return Err(ClassifierError::Internal(format!(
                "{} scores for {} labels",
                scores.len(),
                labels.len()
            )));
        }

        let total: f64 = scores.iter().sum();
        let normalized: Vec<f64> = if total > 0.0 && total.is_finite() {
            scores.iter().map(|s| s / total).collect()
        } else {
            vec![1.0 / labels.len() as f64; labels.len()]
        };

        let mut best = 0;
        for (i, p) in normalized.iter().enumerate() {
            if *p > normalized[best] {
                best = i;
            }
        }

        Ok(Self {
            label: labels[best].clone(),
            confidence: normalized[best],
            distribution: labels.iter().cloned().zip(normalized).collect(),
        })
    }
}

/// Produces a distribution over disease labels
pub trait Classifier: Send + Sync {
    /// Identifier for logs and health output
    fn name(&self) -> &'static str;

    /// Classify a recording's features against `labels`
    fn predict(
        &self,
        features: &FeatureVector,
        labels: &[String],
    ) -> Result<Classification, ClassifierError>;
}
