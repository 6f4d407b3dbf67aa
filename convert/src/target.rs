//! Target voice representation and its two acquisition modes.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::info;
use voxshift_audio::{WORKING_SAMPLE_RATE, Waveform, read_audio, resample};

use crate::engine::ConversionEngine;
use crate::error::ConvertError;
use crate::index;

/// Index path value meaning "no index, encode the reference instead".
pub const NO_INDEX: &str = "none";

/// Fixed-size embedding of a target voice.
///
/// Created once per session and never mutated afterwards; clones share the
/// same values.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetRepresentation {
    engine: String,
    values: Arc<[f32]>,
}

impl TargetRepresentation {
    /// Creates a representation tagged with the engine kind that produced it.
    pub fn new(engine: impl Into<String>, values: Vec<f32>) -> Self {
        Self {
            engine: engine.into(),
            values: values.into(),
        }
    }

    /// Kind of the engine that produced this representation.
    pub fn engine(&self) -> &str {
        &self.engine
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn dimension(&self) -> usize {
        self.values.len()
    }
}

/// Where the session's target voice comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetSource {
    /// Encode a reference recording with the engine.
    Reference(PathBuf),
    /// Load a previously saved index; no encoding cost.
    Index(PathBuf),
}

impl TargetSource {
    /// Picks the acquisition mode. An index path wins unless it is empty or
    /// the [`NO_INDEX`] sentinel (case-insensitive).
    pub fn resolve(reference: impl Into<PathBuf>, index: Option<&str>) -> Self {
        match index.map(str::trim) {
            Some(idx) if !idx.is_empty() && !idx.eq_ignore_ascii_case(NO_INDEX) => {
                TargetSource::Index(PathBuf::from(idx))
            }
            _ => TargetSource::Reference(reference.into()),
        }
    }
}

/// Acquires target representations through one engine.
pub struct TargetEncoder<'a> {
    engine: &'a dyn ConversionEngine,
}

impl<'a> TargetEncoder<'a> {
    pub fn new(engine: &'a dyn ConversionEngine) -> Self {
        Self { engine }
    }

    /// Acquires the target using exactly one mode.
    pub fn acquire(&self, source: &TargetSource) -> Result<TargetRepresentation, ConvertError> {
        match source {
            TargetSource::Reference(path) => self.encode_file(path),
            TargetSource::Index(path) => self.load_index(path),
        }
    }

    /// Live mode: decodes a reference file and encodes it.
    pub fn encode_file(&self, path: &Path) -> Result<TargetRepresentation, ConvertError> {
        info!(path = %path.display(), "loading target reference");
        let wave = read_audio(path)?;
        self.encode_waveform(&wave)
    }

    /// Encodes a reference waveform, keeping only its first channel.
    pub fn encode_waveform(&self, wave: &Waveform) -> Result<TargetRepresentation, ConvertError> {
        let working = resample(wave, WORKING_SAMPLE_RATE)?;
        info!(seconds = working.duration_secs(), "encoding target");
        let target = self.engine.encode_target(working.first_channel())?;
        self.check(&target).map_err(ConvertError::Engine)?;
        Ok(target)
    }

    /// Index mode: loads a saved representation and checks that it belongs
    /// to this engine.
    pub fn load_index(&self, path: &Path) -> Result<TargetRepresentation, ConvertError> {
        info!(path = %path.display(), "loading target index");
        let target = index::load_file(path)?;
        self.check(&target).map_err(|reason| ConvertError::InvalidIndex {
            path: path.to_path_buf(),
            reason,
        })?;
        Ok(target)
    }

    fn check(&self, target: &TargetRepresentation) -> Result<(), String> {
        if target.engine() != self.engine.kind() {
            return Err(format!(
                "target was produced by engine {:?}, loaded engine is {:?}",
                target.engine(),
                self.engine.kind()
            ));
        }
        if target.dimension() != self.engine.target_dimension() {
            return Err(format!(
                "target has dimension {}, engine expects {}",
                target.dimension(),
                self.engine.target_dimension()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_prefers_index() {
        let src = TargetSource::resolve("target.wav", Some("voice.idx"));
        assert_eq!(src, TargetSource::Index("voice.idx".into()));
    }

    #[test]
    fn resolve_sentinel_means_reference() {
        for idx in [None, Some("NONE"), Some("none"), Some(""), Some("  ")] {
            let src = TargetSource::resolve("target.wav", idx);
            assert_eq!(src, TargetSource::Reference("target.wav".into()));
        }
    }

    #[test]
    fn representation_clone_shares_values() {
        let t = TargetRepresentation::new("dsp", vec![220.0, 0.1]);
        let c = t.clone();
        assert_eq!(t, c);
        assert_eq!(c.dimension(), 2);
        assert_eq!(c.engine(), "dsp");
        assert!(std::ptr::eq(t.values().as_ptr(), c.values().as_ptr()));
    }
}
