//! Short-time Fourier transform
//!
//! Frames are centered: the signal is zero-padded by `n_fft / 2` on both
//! sides, so frame `t` is centered on sample `t * hop` and a signal of `n`
//! samples yields `1 + n / hop` frames.

use realfft::RealFftPlanner;

use crate::audio::AudioError;

/// Magnitude spectrogram, `frames[t][k]` = |X_t(k)| for `k` in `0..=n_fft/2`
#[derive(Debug, Clone)]
pub struct Spectrogram {
    pub n_fft: usize,
    pub frames: Vec<Vec<f64>>,
}

impl Spectrogram {
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    pub fn num_frames(&self) -> usize {
        self.frames.len()
    }
}

/// Periodic Hann window
pub fn hann_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let phase = 2.0 * std::f64::consts::PI * i as f64 / n as f64;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

/// Zero-pad `signal` by `n_fft / 2` on both sides
pub fn center_pad(signal: &[f32], n_fft: usize) -> Vec<f64> {
    let pad = n_fft / 2;
    let mut padded = vec![0.0f64; signal.len() + 2 * pad];
    for (dst, &src) in padded[pad..pad + signal.len()].iter_mut().zip(signal) {
        *dst = src as f64;
    }
    padded
}

/// Number of centered frames for a signal of `len` samples
pub fn frame_count(len: usize, hop: usize) -> usize {
    1 + len / hop
}

/// Compute the centered magnitude STFT of a mono signal
pub fn magnitude_stft(signal: &[f32], n_fft: usize, hop: usize) -> Result<Spectrogram, AudioError> {
    let padded = center_pad(signal, n_fft);
    let num_frames = frame_count(signal.len(), hop);

    let mut planner = RealFftPlanner::<f64>::new();
    let fft = planner.plan_fft_forward(n_fft);

    let window = hann_window(n_fft);
    let mut scratch = fft.make_scratch_vec();
    let mut frame_buf = vec![0.0f64; n_fft];
    let mut spectrum = fft.make_output_vec();

    let mut frames = Vec::with_capacity(num_frames);

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;

        for i in 0..n_fft {
            frame_buf[i] = padded[start + i] * window[i];
        }

        fft.process_with_scratch(&mut frame_buf, &mut spectrum, &mut scratch)
            .map_err(|e| AudioError::Transform(format!("FFT failed: {}", e)))?;

        frames.push(spectrum.iter().map(|c| c.norm()).collect());
    }

    Ok(Spectrogram { n_fft, frames })
}

/// Frequency in Hz of each STFT bin
pub fn fft_frequencies(sample_rate: u32, n_fft: usize) -> Vec<f64> {
    (0..=n_fft / 2)
        .map(|k| k as f64 * sample_rate as f64 / n_fft as f64)
        .collect()
}
