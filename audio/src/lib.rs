//! Audio processing utilities for voice conversion.
//!
//! This crate provides the format boundary of the conversion pipeline:
//!
//! - [`Waveform`]: planar multi-channel samples tagged with a sample rate
//! - [`resampler`]: sample rate conversion backed by rubato
//! - [`file`]: decoding arbitrary audio files and writing WAV output
//!
//! # Example
//!
//! ```rust
//! use voxshift_audio::{resample, Waveform, WORKING_SAMPLE_RATE};
//!
//! // 100ms of silence at 44.1kHz, stereo
//! let wave = Waveform::new(vec![vec![0.0; 4410], vec![0.0; 4410]], 44100).unwrap();
//!
//! let mono = Waveform::mono(wave.mix_to_mono(), wave.sample_rate()).unwrap();
//! let working = resample(&mono, WORKING_SAMPLE_RATE).unwrap();
//! assert_eq!(working.len(), 1600);
//! ```

mod error;
pub mod file;
pub mod resampler;
mod waveform;

pub use error::AudioError;
pub use file::{read_audio, write_wav};
pub use resampler::{output_len, resample, resample_samples};
pub use waveform::{NORMALIZE_EPSILON, Waveform, fit_length, normalize_peak, peak};

/// Sample rate every model-facing signal is converted to.
pub const WORKING_SAMPLE_RATE: u32 = 16000;
