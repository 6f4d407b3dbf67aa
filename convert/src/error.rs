use std::path::PathBuf;

use thiserror::Error;
use voxshift_audio::AudioError;

use crate::convertor::Stage;

/// Errors returned by conversion operations.
///
/// Session-level errors (see [`ConvertError::is_fatal`]) mean no file could
/// be converted correctly. Everything else is scoped to a single file.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("invalid sample rate {0}")]
    InvalidRate(u32),

    #[error("invalid target index {}: {reason}", path.display())]
    InvalidIndex { path: PathBuf, reason: String },

    #[error("unreadable input {}: {reason}", path.display())]
    UnreadableInput { path: PathBuf, reason: String },

    #[error("cannot load model from {}: {reason}", path.display())]
    ModelLoadFailure { path: PathBuf, reason: String },

    #[error("cannot write {}: {reason}", path.display())]
    WriteFailure { path: PathBuf, reason: String },

    #[error("engine: {0}")]
    Engine(String),

    #[error("engine returned {got} samples for a {expected}-sample segment")]
    LengthMismatch { expected: usize, got: usize },

    #[error("cancelled while {stage}")]
    Cancelled { stage: Stage },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error(transparent)]
    Audio(AudioError),
}

impl ConvertError {
    /// Returns true for errors that invalidate the whole session.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConvertError::InvalidRate(_)
                | ConvertError::InvalidIndex { .. }
                | ConvertError::ModelLoadFailure { .. }
                | ConvertError::Config(_)
        )
    }
}

impl From<AudioError> for ConvertError {
    fn from(e: AudioError) -> Self {
        match e {
            AudioError::InvalidRate(rate) => ConvertError::InvalidRate(rate),
            AudioError::Open { path, source } => ConvertError::UnreadableInput {
                path,
                reason: source.to_string(),
            },
            AudioError::Decode { path, reason } => ConvertError::UnreadableInput { path, reason },
            AudioError::Encode { path, reason } => ConvertError::WriteFailure { path, reason },
            other => ConvertError::Audio(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_classification() {
        assert!(ConvertError::InvalidRate(0).is_fatal());
        assert!(ConvertError::Config("x".into()).is_fatal());
        assert!(
            ConvertError::ModelLoadFailure {
                path: "m".into(),
                reason: "missing".into()
            }
            .is_fatal()
        );
        assert!(
            !ConvertError::UnreadableInput {
                path: "a.wav".into(),
                reason: "bad".into()
            }
            .is_fatal()
        );
        assert!(!ConvertError::Engine("boom".into()).is_fatal());
        assert!(
            !ConvertError::Cancelled {
                stage: Stage::Converting
            }
            .is_fatal()
        );
    }

    #[test]
    fn audio_errors_map_to_taxonomy() {
        let e: ConvertError = AudioError::Decode {
            path: "x.mp3".into(),
            reason: "bad header".into(),
        }
        .into();
        assert!(matches!(e, ConvertError::UnreadableInput { .. }));
        assert!(e.to_string().contains("x.mp3"));

        let e: ConvertError = AudioError::Encode {
            path: "out/x.wav".into(),
            reason: "disk full".into(),
        }
        .into();
        assert!(matches!(e, ConvertError::WriteFailure { .. }));

        let e: ConvertError = AudioError::InvalidRate(0).into();
        assert!(matches!(e, ConvertError::InvalidRate(0)));

        let e: ConvertError = AudioError::NoChannels.into();
        assert!(matches!(e, ConvertError::Audio(_)));
    }
}
