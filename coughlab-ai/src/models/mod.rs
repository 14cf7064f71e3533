//! Data models for coughlab-ai

pub mod prediction;
pub mod probabilities;

pub use prediction::{AnalysisDetails, AnalysisNote, FileInfo, PredictionRecord, UploadResponse};
pub use probabilities::Probabilities;
