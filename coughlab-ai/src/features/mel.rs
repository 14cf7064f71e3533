//! Mel filterbank and cepstral helpers
//!
//! Slaney-style mel scale (linear below 1 kHz, logarithmic above) with
//! area-normalized triangular filters, decibel compression and an
//! orthonormal DCT-II.

const F_SP: f64 = 200.0 / 3.0;
const MIN_LOG_HZ: f64 = 1000.0;
const MIN_LOG_MEL: f64 = MIN_LOG_HZ / F_SP;

fn log_step() -> f64 {
    6.4f64.ln() / 27.0
}

pub fn hz_to_mel(hz: f64) -> f64 {
    if hz >= MIN_LOG_HZ {
        MIN_LOG_MEL + (hz / MIN_LOG_HZ).ln() / log_step()
    } else {
        hz / F_SP
    }
}

pub fn mel_to_hz(mel: f64) -> f64 {
    if mel >= MIN_LOG_MEL {
        MIN_LOG_HZ * (log_step() * (mel - MIN_LOG_MEL)).exp()
    } else {
        F_SP * mel
    }
}

/// `n` frequencies evenly spaced on the mel scale between `fmin` and `fmax`
fn mel_frequencies(n: usize, fmin: f64, fmax: f64) -> Vec<f64> {
    let min_mel = hz_to_mel(fmin);
    let max_mel = hz_to_mel(fmax);
    (0..n)
        .map(|i| {
            let mel = if n > 1 {
                min_mel + (max_mel - min_mel) * i as f64 / (n - 1) as f64
            } else {
                min_mel
            };
            mel_to_hz(mel)
        })
        .collect()
}

/// Triangular mel filterbank, `weights[m][k]` over `n_fft / 2 + 1` bins
pub fn mel_filterbank(sample_rate: u32, n_fft: usize, n_mels: usize) -> Vec<Vec<f64>> {
    let fmax = sample_rate as f64 / 2.0;
    let fft_freqs = super::spectrogram::fft_frequencies(sample_rate, n_fft);
    let mel_f = mel_frequencies(n_mels + 2, 0.0, fmax);

    (0..n_mels)
        .map(|m| {
            let lower_width = mel_f[m + 1] - mel_f[m];
            let upper_width = mel_f[m + 2] - mel_f[m + 1];
            let enorm = 2.0 / (mel_f[m + 2] - mel_f[m]);

            fft_freqs
                .iter()
                .map(|&f| {
                    let lower = (f - mel_f[m]) / lower_width;
                    let upper = (mel_f[m + 2] - f) / upper_width;
                    lower.min(upper).max(0.0) * enorm
                })
                .collect()
        })
        .collect()
}

/// Convert a power value to decibels relative to 1.0, floored at `amin`
pub fn power_to_db(power: f64, amin: f64) -> f64 {
    10.0 * power.max(amin).log10()
}

/// Orthonormal DCT-II, first `n_out` coefficients
pub fn dct_ortho(input: &[f64], n_out: usize) -> Vec<f64> {
    let n = input.len() as f64;
    (0..n_out)
        .map(|k| {
            let sum: f64 = input
                .iter()
                .enumerate()
                .map(|(i, &x)| {
                    x * (std::f64::consts::PI * k as f64 * (2.0 * i as f64 + 1.0) / (2.0 * n)).cos()
                })
                .sum();
            let scale = if k == 0 { (1.0 / n).sqrt() } else { (2.0 / n).sqrt() };
            sum * scale
        })
        .collect()
}
