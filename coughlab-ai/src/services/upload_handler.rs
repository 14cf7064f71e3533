//! Upload orchestration
//!
//! **Pipeline, in order:**
//! 1. Validate filename and size (nothing is written on rejection)
//! 2. Save the raw bytes under a timestamped name
//! 3. Hash the bytes that were saved
//! 4. Cache hit: return the stored record.
//!    Cache miss: extract features, classify, build and store the record.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::Bytes;
use coughlab_common::{time, DiseaseTable};
use tracing::{debug, info};

use super::content_hash::hash_upload;
use super::recording_store::RecordingStore;
use crate::audio::{AudioError, AudioLoader};
use crate::cache::{InsertOutcome, PredictionStore};
use crate::classifier::Classifier;
use crate::error::{ApiError, ApiResult};
use crate::features::{FeatureExtractor, FeatureVector};
use crate::models::{AnalysisDetails, AnalysisNote, FileInfo, PredictionRecord, UploadResponse};

/// Extensions accepted by `POST /upload`
pub const ALLOWED_EXTENSIONS: [&str; 4] = ["wav", "mp3", "m4a", "webm"];

/// Lowercased extension of `filename` if it is one we accept
///
/// A name without a dot has no extension.
pub fn allowed_extension(filename: &str) -> Option<String> {
    let (_, ext) = filename.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    ALLOWED_EXTENSIONS.contains(&ext.as_str()).then_some(ext)
}

/// Check the client filename, returning its extension
pub fn validate_filename(filename: &str) -> ApiResult<String> {
    if filename.is_empty() {
        return Err(ApiError::Validation("No selected file".to_string()));
    }
    allowed_extension(filename).ok_or_else(|| {
        ApiError::Validation(format!(
            "File type not allowed. Accepted extensions: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))
    })
}

/// Runs the upload pipeline
///
/// All collaborators are injected; nothing here is global.
pub struct UploadHandler {
    recordings: RecordingStore,
    store: Arc<dyn PredictionStore>,
    classifier: Arc<dyn Classifier>,
    diseases: Arc<DiseaseTable>,
    loader: AudioLoader,
    extractor: Arc<FeatureExtractor>,
    max_upload_bytes: usize,
}

impl UploadHandler {
    pub fn new(
        recordings_dir: impl Into<PathBuf>,
        store: Arc<dyn PredictionStore>,
        classifier: Arc<dyn Classifier>,
        diseases: Arc<DiseaseTable>,
    ) -> Self {
        Self {
            recordings: RecordingStore::new(recordings_dir),
            store,
            classifier,
            diseases,
            loader: AudioLoader::default(),
            extractor: Arc::new(FeatureExtractor::new()),
            max_upload_bytes: coughlab_common::config::DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_max_upload_bytes(mut self, max_upload_bytes: usize) -> Self {
        self.max_upload_bytes = max_upload_bytes;
        self
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_bytes
    }

    pub fn store(&self) -> &Arc<dyn PredictionStore> {
        &self.store
    }

    pub fn classifier_name(&self) -> &'static str {
        self.classifier.name()
    }

    /// Analyze one uploaded file
    pub async fn handle(&self, original_name: &str, bytes: Bytes) -> ApiResult<UploadResponse> {
        let extension = validate_filename(original_name)?;
        if bytes.len() > self.max_upload_bytes {
            return Err(ApiError::PayloadTooLarge(format!(
                "File exceeds the {} byte upload limit",
                self.max_upload_bytes
            )));
        }

        let saved = self
            .recordings
            .save(&bytes, &extension, &time::now())
            .await?;

        let hash = hash_upload(bytes).await?;
        debug!(hash = %hash, filename = %saved.filename, "Saved upload");

        if let Some(record) = self.store.get(&hash).await? {
            info!(hash = %hash, disease = %record.disease, "Cache hit");
            return Ok(UploadResponse {
                prediction: record,
                note: AnalysisNote::PreviouslyAnalyzed,
            });
        }

        let features = self.extract_features(saved.path.clone()).await?;

        let labels = self.diseases.labels();
        let classification = self.classifier.predict(&features, &labels)?;

        let disease_info = self
            .diseases
            .get(&classification.label)
            .cloned()
            .ok_or_else(|| {
                ApiError::Internal(format!(
                    "Classifier returned unknown disease '{}'",
                    classification.label
                ))
            })?;

        let analysis_details = AnalysisDetails::random(&mut rand::thread_rng());

        let record = PredictionRecord {
            disease: classification.label,
            confidence: classification.confidence,
            all_probabilities: classification.distribution,
            disease_info,
            timestamp: time::display_timestamp(&time::now()),
            analysis_details,
            file_info: FileInfo {
                filename: saved.filename,
                original_name: original_name.to_string(),
            },
        };

        let response = match self.store.insert_if_absent(&hash, record).await? {
            InsertOutcome::Inserted(record) => {
                info!(
                    hash = %hash,
                    disease = %record.disease,
                    confidence = record.confidence,
                    classifier = self.classifier.name(),
                    "New prediction stored"
                );
                UploadResponse {
                    prediction: record,
                    note: AnalysisNote::NewAnalysis,
                }
            }
            InsertOutcome::Existing(record) => {
                // Identical upload finished first; its record wins
                info!(hash = %hash, "Concurrent duplicate upload, returning stored prediction");
                UploadResponse {
                    prediction: record,
                    note: AnalysisNote::PreviouslyAnalyzed,
                }
            }
        };

        Ok(response)
    }

    /// Decode and summarize a saved recording on the blocking pool
    async fn extract_features(&self, path: PathBuf) -> ApiResult<FeatureVector> {
        let loader = self.loader.clone();
        let extractor = self.extractor.clone();

        let features = tokio::task::spawn_blocking(move || -> Result<FeatureVector, AudioError> {
            let waveform = loader.load_path(&path)?;
            debug!(
                seconds = waveform.duration_seconds(),
                samples = waveform.samples().len(),
                "Waveform loaded"
            );
            extractor.extract(&waveform)
        })
        .await
        .map_err(|e| ApiError::Internal(format!("Feature extraction task failed: {}", e)))??;

        debug!(features = ?features.as_slice(), "Features extracted");
        Ok(features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::JsonFileStore;
    use crate::classifier::MockClassifier;
    use std::io::Cursor;

    fn sine_wav(freq: f32, seconds: f32) -> Bytes {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 22_050,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..(seconds * 22_050.0) as usize {
                let t = i as f32 / 22_050.0;
                let v = (0.4 * (2.0 * std::f32::consts::PI * freq * t).sin() * i16::MAX as f32) as i16;
                writer.write_sample(v).unwrap();
            }
            writer.finalize().unwrap();
        }
        Bytes::from(cursor.into_inner())
    }

    async fn handler(dir: &std::path::Path) -> UploadHandler {
        let store = Arc::new(JsonFileStore::open(dir.join("history.json")).await.unwrap());
        UploadHandler::new(
            dir.join("recordings"),
            store,
            Arc::new(MockClassifier::new()),
            Arc::new(DiseaseTable::standard()),
        )
    }

    fn recordings_in(dir: &std::path::Path) -> usize {
        std::fs::read_dir(dir.join("recordings"))
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    #[test]
    fn test_allowed_extension() {
        assert_eq!(allowed_extension("cough.wav"), Some("wav".to_string()));
        assert_eq!(allowed_extension("Cough.M4A"), Some("m4a".to_string()));
        assert_eq!(allowed_extension("a.b.webm"), Some("webm".to_string()));
        assert_eq!(allowed_extension("malware.exe"), None);
        assert_eq!(allowed_extension("noextension"), None);
        assert_eq!(allowed_extension("trailingdot."), None);
    }

    #[test]
    fn test_validate_filename_messages() {
        match validate_filename("") {
            Err(ApiError::Validation(msg)) => assert_eq!(msg, "No selected file"),
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(validate_filename("x.exe"), Err(ApiError::Validation(_))));
        assert_eq!(validate_filename("x.MP3").unwrap(), "mp3");
    }

    #[tokio::test]
    async fn test_new_then_cached() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await;
        let wav = sine_wav(440.0, 1.0);

        let first = handler.handle("cough.wav", wav.clone()).await.unwrap();
        assert_eq!(first.note, AnalysisNote::NewAnalysis);
        assert_eq!(first.prediction.file_info.original_name, "cough.wav");
        assert!(first.prediction.file_info.filename.starts_with("recording_"));

        let second = handler.handle("again.wav", wav).await.unwrap();
        assert_eq!(second.note, AnalysisNote::PreviouslyAnalyzed);
        assert_eq!(second.prediction, first.prediction);

        // Both uploads are kept on disk, one cache entry
        assert_eq!(recordings_in(dir.path()), 2);
        assert_eq!(handler.store().len().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_disease_info_matches_prediction() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await;
        let table = DiseaseTable::standard();

        let response = handler.handle("cough.wav", sine_wav(300.0, 0.5)).await.unwrap();
        let prediction = response.prediction;

        assert_eq!(Some(&prediction.disease_info), table.get(&prediction.disease));
        assert_eq!(prediction.all_probabilities.len(), table.len());
        assert_eq!(prediction.all_probabilities.get(&prediction.disease), Some(prediction.confidence));
        assert_eq!(
            prediction.all_probabilities.labels().collect::<Vec<_>>(),
            table.labels()
        );
    }

    #[tokio::test]
    async fn test_rejected_extension_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await;

        let err = handler
            .handle("setup.exe", Bytes::from_static(b"MZ\x90\x00"))
            .await
            .unwrap_err();

        assert_eq!(err.status(), axum::http::StatusCode::BAD_REQUEST);
        assert_eq!(recordings_in(dir.path()), 0);
        assert_eq!(handler.store().len().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_oversized_rejected_before_saving() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await.with_max_upload_bytes(1024);

        let err = handler
            .handle("big.wav", Bytes::from(vec![0u8; 1025]))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::PayloadTooLarge(_)));
        assert_eq!(recordings_in(dir.path()), 0);
    }

    #[tokio::test]
    async fn test_undecodable_audio_is_server_error_and_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler(dir.path()).await;

        let err = handler
            .handle("cough.mp3", Bytes::from_static(b"this is not an mp3 file"))
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Audio(_)), "got {:?}", err);
        assert_eq!(err.status(), axum::http::StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(handler.store().len().await.unwrap(), 0);
    }
}
