//! Audio file loader
//!
//! Decodes any container/codec symphonia supports into a mono waveform at
//! [`ANALYSIS_SAMPLE_RATE`], keeping only the first [`MAX_DURATION_SECONDS`].
//!
//! Browser recordings arrive as WebM/Opus, so the Opus decoder from
//! symphonia-adapter-libopus is registered alongside symphonia's own codecs.

use std::io::Cursor;
use std::path::Path;
use std::sync::OnceLock;

use rubato::{
    Resampler, SincFixedIn, SincInterpolationParameters, SincInterpolationType, WindowFunction,
};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{CodecRegistry, DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia_adapter_libopus::OpusDecoder;
use tracing::{debug, warn};

use super::{AudioError, Waveform, ANALYSIS_SAMPLE_RATE, MAX_DURATION_SECONDS};

/// Codec registry with Opus plus every codec enabled in symphonia
fn codec_registry() -> &'static CodecRegistry {
    static CODEC_REGISTRY: OnceLock<CodecRegistry> = OnceLock::new();
    CODEC_REGISTRY.get_or_init(|| {
        let mut registry = CodecRegistry::new();
        registry.register_all::<OpusDecoder>();
        symphonia::default::register_enabled_codecs(&mut registry);
        registry
    })
}

/// Audio loader producing fixed-rate mono waveforms
#[derive(Debug, Clone)]
pub struct AudioLoader {
    target_sample_rate: u32,
    max_duration_seconds: f64,
}

impl Default for AudioLoader {
    fn default() -> Self {
        Self {
            target_sample_rate: ANALYSIS_SAMPLE_RATE,
            max_duration_seconds: MAX_DURATION_SECONDS,
        }
    }
}

impl AudioLoader {
    /// Decode an audio file from disk
    ///
    /// The file extension is used as a probe hint only; content sniffing
    /// decides the actual format.
    pub fn load_path(&self, path: &Path) -> Result<Waveform, AudioError> {
        debug!(path = %path.display(), "Loading audio file");

        let file = std::fs::File::open(path)?;
        let mss = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        self.decode(mss, hint)
    }

    /// Decode an in-memory audio file
    pub fn load_bytes(&self, bytes: Vec<u8>, extension: Option<&str>) -> Result<Waveform, AudioError> {
        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        self.decode(mss, hint)
    }

    fn decode(&self, mss: MediaSourceStream, hint: Hint) -> Result<Waveform, AudioError> {
        let probed = symphonia::default::get_probe()
            .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
            .map_err(|e| AudioError::Decode(format!("unrecognized format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| AudioError::Decode("no audio tracks found".to_string()))?;

        let track_id = track.id;
        let codec_params = track.codec_params.clone();

        let mut decoder = codec_registry()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| AudioError::Decode(format!("unsupported codec: {}", e)))?;

        let mut native_rate = codec_params.sample_rate.unwrap_or(0);
        let mut mono: Vec<f32> = Vec::new();
        let mut max_frames = self.frame_limit(native_rate);

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(AudioError::Decode(format!("failed to read packet: {}", e))),
            };

            if packet.track_id() != track_id {
                continue;
            }

            let decoded = match decoder.decode(&packet) {
                Ok(decoded) => decoded,
                Err(SymphoniaError::DecodeError(msg)) => {
                    // Corrupt packet, the stream may still be usable
                    warn!("Skipping undecodable packet: {}", msg);
                    continue;
                }
                Err(e) => return Err(AudioError::Decode(format!("failed to decode packet: {}", e))),
            };

            let spec = *decoded.spec();
            if native_rate == 0 {
                native_rate = spec.rate;
                max_frames = self.frame_limit(native_rate);
            }

            let channels = spec.channels.count().max(1);
            let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
            buffer.copy_interleaved_ref(decoded);

            for frame in buffer.samples().chunks(channels) {
                mono.push(frame.iter().sum::<f32>() / channels as f32);
            }

            if mono.len() >= max_frames {
                break;
            }
        }

        if native_rate == 0 {
            return Err(AudioError::InvalidSampleRate(0));
        }

        if mono.is_empty() {
            return Err(AudioError::EmptyAudio);
        }

        debug!(
            frames = mono.len(),
            native_rate,
            target_rate = self.target_sample_rate,
            "Decoded audio"
        );

        let samples = if native_rate != self.target_sample_rate {
            self.resample(mono, native_rate)?
        } else {
            mono
        };

        if samples.is_empty() {
            return Err(AudioError::EmptyAudio);
        }

        // The last decoded packet and the resampler can both overshoot the limit
        Ok(Waveform::new(samples, self.target_sample_rate)?.truncated(self.max_duration_seconds))
    }

    /// Native-rate frames after which decoding can stop
    fn frame_limit(&self, native_rate: u32) -> usize {
        if native_rate == 0 {
            return usize::MAX;
        }
        (self.max_duration_seconds * native_rate as f64).floor() as usize
    }

    /// Single-pass sinc resampling of a mono signal
    fn resample(&self, samples: Vec<f32>, source_rate: u32) -> Result<Vec<f32>, AudioError> {
        let num_frames = samples.len();

        let params = SincInterpolationParameters {
            sinc_len: 256,
            f_cutoff: 0.95,
            interpolation: SincInterpolationType::Linear,
            oversampling_factor: 256,
            window: WindowFunction::BlackmanHarris2,
        };

        let ratio = self.target_sample_rate as f64 / source_rate as f64;

        let mut resampler = SincFixedIn::<f32>::new(ratio, 2.0, params, num_frames, 1)
            .map_err(|e| AudioError::Resample(e.to_string()))?;

        let mut output = resampler
            .process(&[samples], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;

        let resampled = output.pop().unwrap_or_default();

        debug!(
            "Resampled {} frames ({} Hz) → {} frames ({} Hz)",
            num_frames,
            source_rate,
            resampled.len(),
            self.target_sample_rate
        );

        Ok(resampled)
    }
}
