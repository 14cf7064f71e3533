//! Services for coughlab-ai

pub mod content_hash;
pub mod recording_store;
pub mod upload_handler;

pub use content_hash::{content_hash, hash_upload};
pub use recording_store::{RecordingStore, SavedRecording};
pub use upload_handler::{allowed_extension, validate_filename, UploadHandler, ALLOWED_EXTENSIONS};
