//! Acoustic feature extraction
//!
//! Summarizes a waveform as a 15-element vector:
//!
//! | Index  | Feature                                  |
//! |--------|------------------------------------------|
//! | 0..13  | Mean of each of 13 MFCC trajectories     |
//! | 13     | Mean spectral centroid (Hz)              |
//! | 14     | Mean frame RMS energy                    |
//!
//! Transform parameters are fixed so the same waveform always produces the
//! same vector, bit for bit.

pub mod mel;
pub mod spectrogram;

use tracing::debug;

use crate::audio::{AudioError, Waveform};
use spectrogram::{center_pad, fft_frequencies, frame_count, magnitude_stft, Spectrogram};

/// FFT window length in samples
pub const N_FFT: usize = 2048;
/// Distance between successive frames in samples
pub const HOP_LENGTH: usize = 512;
/// Mel bands feeding the cepstral transform
pub const N_MELS: usize = 128;
/// Cepstral coefficients kept per frame
pub const N_MFCC: usize = 13;
/// Dynamic range kept below the loudest mel bin
pub const TOP_DB: f64 = 80.0;
/// Power floor before taking logarithms
pub const AMIN: f64 = 1e-10;

/// Length of a [`FeatureVector`]
pub const FEATURE_LEN: usize = N_MFCC + 2;

/// Fixed-length summary of a waveform
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector(Vec<f64>);

impl FeatureVector {
    fn from_parts(mfcc_means: Vec<f64>, centroid_mean: f64, rms_mean: f64) -> Self {
        let mut values = mfcc_means;
        values.push(centroid_mean);
        values.push(rms_mean);
        debug_assert_eq!(values.len(), FEATURE_LEN);
        Self(values)
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn mfcc_means(&self) -> &[f64] {
        &self.0[..N_MFCC]
    }

    pub fn spectral_centroid_mean(&self) -> f64 {
        self.0[N_MFCC]
    }

    pub fn rms_mean(&self) -> f64 {
        self.0[N_MFCC + 1]
    }
}

/// Computes [`FeatureVector`]s from waveforms
///
/// Holds no state besides a cached mel filterbank for the last sample rate
/// seen, so a single instance can be shared behind an `Arc`.
#[derive(Debug, Default)]
pub struct FeatureExtractor {
    filterbank: std::sync::Mutex<Option<(u32, std::sync::Arc<Vec<Vec<f64>>>)>>,
}

impl FeatureExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract the 15-element feature vector
    ///
    /// Fails with [`AudioError::EmptyAudio`] for a waveform without samples.
    pub fn extract(&self, waveform: &Waveform) -> Result<FeatureVector, AudioError> {
        if waveform.is_empty() {
            return Err(AudioError::EmptyAudio);
        }
        let sample_rate = waveform.sample_rate();
        if sample_rate == 0 {
            return Err(AudioError::InvalidSampleRate(sample_rate));
        }

        let spec = magnitude_stft(waveform.samples(), N_FFT, HOP_LENGTH)?;

        let mfcc_means = self.mfcc_means(&spec, sample_rate);
        let centroid_mean = spectral_centroid_mean(&spec, sample_rate);
        let rms_mean = rms_mean(waveform.samples(), N_FFT, HOP_LENGTH);

        debug!(
            frames = spec.num_frames(),
            centroid_mean,
            rms_mean,
            "Extracted features"
        );

        Ok(FeatureVector::from_parts(mfcc_means, centroid_mean, rms_mean))
    }

    fn filterbank_for(&self, sample_rate: u32) -> std::sync::Arc<Vec<Vec<f64>>> {
        let mut cached = match self.filterbank.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some((rate, fb)) = cached.as_ref() {
            if *rate == sample_rate {
                return fb.clone();
            }
        }
        let fb = std::sync::Arc::new(mel::mel_filterbank(sample_rate, N_FFT, N_MELS));
        *cached = Some((sample_rate, fb.clone()));
        fb
    }

    /// Mean over time of each MFCC trajectory
    fn mfcc_means(&self, spec: &Spectrogram, sample_rate: u32) -> Vec<f64> {
        let filterbank = self.filterbank_for(sample_rate);

        // Log-mel spectrogram, frames x mels
        let mut log_mel: Vec<Vec<f64>> = spec
            .frames
            .iter()
            .map(|magnitudes| {
                filterbank
                    .iter()
                    .map(|weights| {
                        let power: f64 = weights
                            .iter()
                            .zip(magnitudes)
                            .map(|(w, m)| w * m * m)
                            .sum();
                        mel::power_to_db(power, AMIN)
                    })
                    .collect()
            })
            .collect();

        // Clamp to TOP_DB below the global peak
        let peak = log_mel
            .iter()
            .flatten()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        let floor = peak - TOP_DB;
        for value in log_mel.iter_mut().flatten() {
            if *value < floor {
                *value = floor;
            }
        }

        let mut sums = vec![0.0f64; N_MFCC];
        for frame in &log_mel {
            for (sum, coeff) in sums.iter_mut().zip(mel::dct_ortho(frame, N_MFCC)) {
                *sum += coeff;
            }
        }

        let frames = log_mel.len() as f64;
        sums.into_iter().map(|s| s / frames).collect()
    }
}

/// Mean over time of the per-frame spectral centroid
///
/// Silent frames contribute a centroid of 0.
fn spectral_centroid_mean(spec: &Spectrogram, sample_rate: u32) -> f64 {
    let freqs = fft_frequencies(sample_rate, spec.n_fft);

    let total: f64 = spec
        .frames
        .iter()
        .map(|magnitudes| {
            let weight: f64 = magnitudes.iter().sum();
            if weight <= f64::MIN_POSITIVE {
                return 0.0;
            }
            let weighted: f64 = magnitudes.iter().zip(&freqs).map(|(m, f)| m * f).sum();
            weighted / weight
        })
        .sum();

    total / spec.num_frames() as f64
}

/// Mean over time of the per-frame root-mean-square energy
///
/// Frames use the same centered layout as the STFT, without a window.
fn rms_mean(samples: &[f32], frame_length: usize, hop: usize) -> f64 {
    let padded = center_pad(samples, frame_length);
    let num_frames = frame_count(samples.len(), hop);

    let total: f64 = (0..num_frames)
        .map(|t| {
            let frame = &padded[t * hop..t * hop + frame_length];
            let mean_square = frame.iter().map(|x| x * x).sum::<f64>() / frame_length as f64;
            mean_square.sqrt()
        })
        .sum();

    total / num_frames as f64
}
