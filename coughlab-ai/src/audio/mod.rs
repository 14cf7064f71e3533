//! Audio decoding into analysis-ready waveforms

pub mod loader;

pub use loader::AudioLoader;

use thiserror::Error;

/// Sample rate all waveforms are converted to before feature extraction
pub const ANALYSIS_SAMPLE_RATE: u32 = 22_050;

/// Only the first few seconds of a recording are analyzed
pub const MAX_DURATION_SECONDS: f64 = 5.0;

/// Audio loading and validation failures
#[derive(Debug, Error)]
pub enum AudioError {
    /// File could not be probed or decoded as audio
    #[error("Failed to decode audio: {0}")]
    Decode(String),

    /// Decoding succeeded but produced no samples
    #[error("Audio contains no samples")]
    EmptyAudio,

    #[error("Invalid sample rate: {0} Hz")]
    InvalidSampleRate(u32),

    #[error("Resampling failed: {0}")]
    Resample(String),

    #[error("Spectral transform failed: {0}")]
    Transform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Mono PCM waveform
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    /// Wrap mono samples, rejecting a zero sample rate
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }
        Ok(Self {
            samples,
            sample_rate,
        })
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_seconds(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }

    /// Keep at most `seconds` of audio from the start
    pub fn truncated(mut self, seconds: f64) -> Self {
        let max_samples = (seconds * self.sample_rate as f64).floor() as usize;
        self.samples.truncate(max_samples);
        self
    }
}
