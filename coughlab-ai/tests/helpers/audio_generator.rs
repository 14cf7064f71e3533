//! Audio Test Fixture Generator
//!
//! In-memory WAV files for upload tests

use std::io::Cursor;

/// Configuration for generated audio
#[derive(Debug, Clone)]
pub struct AudioConfig {
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub frequency_hz: f64,
    pub amplitude: f64,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            duration_seconds: 3.0,
            sample_rate: 22_050,
            channels: 1,
            frequency_hz: 440.0,
            amplitude: 0.5,
        }
    }
}

/// Generate a 16-bit sine WAV with the given configuration
pub fn generate_test_wav(config: &AudioConfig) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("Failed to create WAV writer");
        let total_frames = (config.duration_seconds * config.sample_rate as f64) as usize;

        for i in 0..total_frames {
            let t = i as f64 / config.sample_rate as f64;
            let value = config.amplitude * (2.0 * std::f64::consts::PI * config.frequency_hz * t).sin();
            let sample = (value * i16::MAX as f64) as i16;
            for _ in 0..config.channels {
                writer.write_sample(sample).expect("Failed to write sample");
            }
        }
        writer.finalize().expect("Failed to finalize WAV");
    }
    cursor.into_inner()
}

/// Silent MPEG-1 Layer III stream: 44.1 kHz mono at 128 kbit/s
///
/// Every frame is a bare header followed by zeroed side info and main data,
/// which decodes to digital silence (1152 samples per frame).
pub fn generate_silent_mp3(frames: usize) -> Vec<u8> {
    const FRAME_LEN: usize = 417;
    const HEADER: [u8; 4] = [0xFF, 0xFB, 0x90, 0xC0];

    let mut mp3 = Vec::with_capacity(frames * FRAME_LEN);
    for _ in 0..frames {
        let mut frame = [0u8; FRAME_LEN];
        frame[..HEADER.len()].copy_from_slice(&HEADER);
        mp3.extend_from_slice(&frame);
    }
    mp3
}
