use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    #[error("audio: invalid sample rate {0}")]
    InvalidRate(u32),

    #[error("audio: waveform needs at least one channel")]
    NoChannels,

    #[error("audio: channel {channel} has {got} frames, expected {expected}")]
    ChannelLength {
        channel: usize,
        expected: usize,
        got: usize,
    },

    #[error("audio: open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("audio: decode {}: {reason}", path.display())]
    Decode { path: PathBuf, reason: String },

    #[error("audio: encode {}: {reason}", path.display())]
    Encode { path: PathBuf, reason: String },

    #[error("audio: resample: {0}")]
    Resample(String),
}

impl From<rubato::ResamplerConstructionError> for AudioError {
    fn from(e: rubato::ResamplerConstructionError) -> Self {
        AudioError::Resample(e.to_string())
    }
}

impl From<rubato::ResampleError> for AudioError {
    fn from(e: rubato::ResampleError) -> Self {
        AudioError::Resample(e.to_string())
    }
}
