//! Prediction records and upload responses
//!
//! Field names are the JSON wire format and the on-disk cache format.

use coughlab_common::DiseaseRecord;

use super::Probabilities;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Cough types reported in [`AnalysisDetails`]
pub const COUGH_TYPES: [&str; 3] = ["Dry", "Wet", "Mixed"];

/// Result of analyzing one recording
///
/// Created on a cache miss and returned verbatim on every later hit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRecord {
    /// Predicted disease label
    pub disease: String,
    /// Probability of the predicted label
    pub confidence: f64,
    /// Probability of every label, in disease-table order
    pub all_probabilities: Probabilities,
    /// Reference entry for `disease`
    pub disease_info: DiseaseRecord,
    /// Local time of analysis, `YYYY-MM-DD HH:MM:SS`
    pub timestamp: String,
    pub analysis_details: AnalysisDetails,
    pub file_info: FileInfo,
}

/// Display-only cough descriptors
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisDetails {
    pub cough_intensity: String,
    pub cough_frequency: String,
    pub cough_type: String,
}

impl AnalysisDetails {
    /// Random intensity 60-99%, frequency 1-9 per minute, and type
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let intensity: u32 = rng.gen_range(60..100);
        let frequency: u32 = rng.gen_range(1..10);
        let cough_type = COUGH_TYPES.choose(rng).copied().unwrap_or("Mixed");
        Self {
            cough_intensity: format!("{}%", intensity),
            cough_frequency: format!("{} per minute", frequency),
            cough_type: cough_type.to_string(),
        }
    }
}

/// Where the upload was stored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Name under the recordings directory
    pub filename: String,
    /// Name supplied by the client
    pub original_name: String,
}

/// Whether a response came from the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnalysisNote {
    #[serde(rename = "Previously analyzed audio")]
    PreviouslyAnalyzed,
    #[serde(rename = "New audio analysis")]
    NewAnalysis,
}

/// Body of a successful `POST /upload`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub prediction: PredictionRecord,
    pub note: AnalysisNote,
}
