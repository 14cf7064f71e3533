//! Router fixtures and request builders

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use coughlab_ai::cache::open_store;
use coughlab_ai::classifier::{Classification, Classifier, ClassifierError, MockClassifier};
use coughlab_ai::features::FeatureVector;
use coughlab_ai::services::UploadHandler;
use coughlab_ai::AppState;
use coughlab_common::config::{CacheBackend, RootFolder, DEFAULT_MAX_UPLOAD_BYTES};
use coughlab_common::DiseaseTable;
use http_body_util::BodyExt;
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "coughlab-test-boundary-7MA4YWxkTrZu0gW";

/// Router over a temporary root folder
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub dir: TempDir,
}

impl TestApp {
    /// JSON cache, mock classifier, default upload limit
    pub async fn new() -> Self {
        Self::with_options(CacheBackend::Json, Arc::new(MockClassifier::new()), DEFAULT_MAX_UPLOAD_BYTES).await
    }

    pub async fn with_options(
        backend: CacheBackend,
        classifier: Arc<dyn Classifier>,
        max_upload_bytes: usize,
    ) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create temp dir");
        Self::open_in(dir, backend, classifier, max_upload_bytes).await
    }

    /// Build an app over an existing root folder, as a restart would
    pub async fn open_in(
        dir: TempDir,
        backend: CacheBackend,
        classifier: Arc<dyn Classifier>,
        max_upload_bytes: usize,
    ) -> Self {
        let root = RootFolder::new(dir.path());
        root.ensure_directories().expect("Failed to create root folder");

        let store = open_store(backend, &root).await.expect("Failed to open store");
        let handler = UploadHandler::new(
            root.recordings_dir(),
            store,
            classifier,
            Arc::new(DiseaseTable::standard()),
        )
        .with_max_upload_bytes(max_upload_bytes);

        let state = AppState::new(handler);
        let router = coughlab_ai::build_router(state.clone());

        Self { router, state, dir }
    }

    pub fn root(&self) -> RootFolder {
        RootFolder::new(self.dir.path())
    }

    /// Files currently in the recordings directory
    pub fn recording_count(&self) -> usize {
        std::fs::read_dir(self.root().recordings_dir())
            .map(|entries| entries.count())
            .unwrap_or(0)
    }

    pub async fn cached_predictions(&self) -> usize {
        self.state.upload_handler.store().len().await.expect("Failed to count cache")
    }

    pub async fn upload(&self, filename: &str, content: &[u8]) -> (StatusCode, serde_json::Value) {
        send(&self.router, upload_request("audio", Some(filename), content)).await
    }

    pub async fn health(&self) -> serde_json::Value {
        let request = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .expect("Failed to build request");
        let (status, body) = send(&self.router, request).await;
        assert_eq!(status, StatusCode::OK);
        body
    }
}

/// Single-part multipart body, returning (content type, body)
pub fn multipart_body(field: &str, filename: Option<&str>, content: &[u8]) -> (String, Vec<u8>) {
    let mut body = Vec::with_capacity(content.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match filename {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n",
                field, name
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n", field).as_bytes(),
        ),
    }
    body.extend_from_slice(b"Content-Type: application/octet-stream\r\n\r\n");
    body.extend_from_slice(content);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());

    (format!("multipart/form-data; boundary={}", BOUNDARY), body)
}

pub fn upload_request(field: &str, filename: Option<&str>, content: &[u8]) -> Request<Body> {
    let (content_type, body) = multipart_body(field, filename, content);
    Request::builder()
        .method("POST")
        .uri("/upload")
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .expect("Failed to build request")
}

/// Send one request and return the body text as received
pub async fn send_raw(router: &Router, request: Request<Body>) -> (StatusCode, String) {
    let response = router.clone().oneshot(request).await.expect("Request failed");
    let status = response.status();
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("Failed to read body")
        .to_bytes();
    (status, String::from_utf8_lossy(&bytes).into_owned())
}

/// Send one request and decode the JSON response
pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let (status, text) = send_raw(router, request).await;
    let json = serde_json::from_str(&text).unwrap_or(serde_json::Value::Null);
    (status, json)
}

/// Always predicts `label` with confidence 0.9
pub struct FixedClassifier {
    pub label: String,
}

impl FixedClassifier {
    pub fn new(label: &str) -> Self {
        Self {
            label: label.to_string(),
        }
    }
}

impl Classifier for FixedClassifier {
    fn name(&self) -> &'static str {
        "fixed"
    }

    fn predict(&self, features: &FeatureVector, labels: &[String]) -> Result<Classification, ClassifierError> {
        assert_eq!(features.len(), 15);
        let others = (labels.len().saturating_sub(1)).max(1) as f64;
        let distribution = labels
            .iter()
            .map(|l| {
                let p = if *l == self.label { 0.9 } else { 0.1 / others };
                (l.clone(), p)
            })
            .collect();
        Ok(Classification {
            label: self.label.clone(),
            confidence: 0.9,
            distribution,
        })
    }
}
