//! Placeholder classifier returning random normalized probabilities

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::{Classification, Classifier, ClassifierError};
use crate::features::FeatureVector;

/// Random classifier standing in for a trained model
///
/// Ignores the features: one uniform `[0, 1)` draw per label, normalized.
pub struct MockClassifier {
    rng: Mutex<StdRng>,
}

impl Default for MockClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl MockClassifier {
    /// Unseeded, different output every run
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Reproducible sequence of predictions
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Classifier for MockClassifier {
    fn name(&self) -> &'static str {
        "mock"
    }

    fn predict(
        &self,
        _features: &FeatureVector,
        labels: &[String],
    ) -> Result<Classification, ClassifierError> {
        if labels.is_empty() {
            return Err(ClassifierError::NoLabels);
        }

        let scores: Vec<f64> = {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| ClassifierError::Internal("random source poisoned".to_string()))?;
            labels.iter().map(|_| rng.gen::<f64>()).collect()
        };

        Classification::from_scores(labels, &scores)
    }
}
