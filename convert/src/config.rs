//! Session configuration: every option a conversion run recognizes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::chunk::{ConversionMode, MAX_CHUNK_SIZE};
use crate::convertor::ConvertOptions;
use crate::engine::EngineOptions;
use crate::error::ConvertError;
use crate::params::{ConversionParams, Device, PitchAlgorithm};
use crate::target::TargetSource;

/// Options for one conversion session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConvertConfig {
    /// Directory of input recordings.
    pub inputs: PathBuf,
    /// Directory converted files are written to (created if absent).
    pub outputs: PathBuf,
    /// Model directory containing `engine.json`.
    pub models: PathBuf,
    /// Pitch shift in semitones.
    pub pitch_shift: f32,
    /// Reference recording of the target voice.
    pub target: PathBuf,
    /// Saved target index; `NONE` means encode `target` instead.
    pub index: String,
    pub device: Device,
    pub alpha: f32,
    pub normalize: bool,
    /// Chunk size in working-rate samples; 0 converts whole files.
    pub chunk: usize,
    pub adain: bool,
    pub pitch_estimation: PitchAlgorithm,
    /// Windows converted concurrently when chunking.
    pub chunk_workers: usize,
    pub preserve_channels: bool,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        Self {
            inputs: PathBuf::from("./inputs/"),
            outputs: PathBuf::from("./outputs/"),
            models: PathBuf::from("./models/"),
            pitch_shift: 0.0,
            target: PathBuf::from("./target.wav"),
            index: "NONE".to_string(),
            device: Device::Cpu,
            alpha: 0.0,
            normalize: false,
            chunk: 0,
            adain: false,
            pitch_estimation: PitchAlgorithm::Default,
            chunk_workers: 1,
            preserve_channels: false,
        }
    }
}

impl ConvertConfig {
    pub fn validate(&self) -> Result<(), ConvertError> {
        self.params().validate()?;
        if self.chunk_workers == 0 {
            return Err(ConvertError::Config(
                "chunk workers must be at least 1".into(),
            ));
        }
        if self.chunk > MAX_CHUNK_SIZE {
            return Err(ConvertError::Config(format!(
                "chunk size {} exceeds the maximum of {}",
                self.chunk, MAX_CHUNK_SIZE
            )));
        }
        Ok(())
    }

    pub fn params(&self) -> ConversionParams {
        ConversionParams {
            pitch_shift: self.pitch_shift,
            alpha: self.alpha,
            adain: self.adain,
            pitch_algorithm: self.pitch_estimation,
        }
    }

    pub fn options(&self) -> ConvertOptions {
        ConvertOptions {
            mode: ConversionMode::from_chunk_size(self.chunk),
            normalize: self.normalize,
            chunk_workers: self.chunk_workers,
            preserve_channels: self.preserve_channels,
        }
    }

    pub fn target_source(&self) -> TargetSource {
        TargetSource::resolve(&self.target, Some(&self.index))
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            device: self.device,
        }
    }
}
