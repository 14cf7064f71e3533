//! Test Helper Utilities
//!
//! Shared utilities for testing coughlab-ai

#![allow(dead_code)]

pub mod audio_generator;
pub mod test_app;

pub use audio_generator::{generate_silent_mp3, generate_test_wav, AudioConfig};
pub use test_app::{multipart_body, send, send_raw, upload_request, FixedClassifier, TestApp};
