//! Built-in signal-processing conversion engine.
//!
//! `dsp` needs no trained weights. Its target representation is the
//! reference's median F0 and level; conversion moves the source pitch by the
//! requested shift plus `alpha` of the way toward the target's F0, then
//! adjusts loudness toward the target's level.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::trace;
use voxshift_audio::WORKING_SAMPLE_RATE;

use crate::engine::{ConversionEngine, EngineOptions};
use crate::error::ConvertError;
use crate::params::{ConversionParams, Device, PitchAlgorithm};
use crate::pitch::{PitchConfig, PitchEstimator};
use crate::target::TargetRepresentation;
use crate::vocoder::PitchShifter;

/// Levels below this are treated as silence when computing gains.
const LEVEL_FLOOR: f32 = 1e-8;

/// Options read from the `engine.json` manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DspConfig {
    /// Pitch analysis frame length in samples.
    pub frame_length: usize,
    /// Pitch analysis hop in samples.
    pub hop_length: usize,
    pub f0_min: f32,
    pub f0_max: f32,
    /// FFT size of the pitch shifter in samples, a multiple of 4.
    pub fft_size: usize,
    pub voicing_threshold: f32,
}

impl Default for DspConfig {
    fn default() -> Self {
        Self {
            frame_length: 1024,
            hop_length: 256,
            f0_min: 50.0,
            f0_max: 1000.0,
            fft_size: 1024,
            voicing_threshold: 0.3,
        }
    }
}

impl DspConfig {
    fn pitch_config(&self) -> PitchConfig {
        PitchConfig {
            sample_rate: WORKING_SAMPLE_RATE,
            frame_length: self.frame_length,
            hop_length: self.hop_length,
            f0_min: self.f0_min,
            f0_max: self.f0_max,
            voicing_threshold: self.voicing_threshold,
        }
    }
}

/// Signal-processing implementation of [`ConversionEngine`].
pub struct DspEngine {
    cfg: DspConfig,
    pitch: PitchEstimator,
    shifter: PitchShifter,
}

impl DspEngine {
    /// Engine kind used in manifests and index files.
    pub const KIND: &'static str = "dsp";

    /// Number of values in a `dsp` target: `[median_f0_hz, level]`.
    pub const TARGET_DIMENSION: usize = 2;

    pub fn new(cfg: DspConfig) -> Result<Self, ConvertError> {
        let pitch = PitchEstimator::new(cfg.pitch_config()).map_err(ConvertError::Config)?;
        let shifter = PitchShifter::new(cfg.fft_size).map_err(ConvertError::Config)?;
        Ok(Self {
            cfg,
            pitch,
            shifter,
        })
    }

    pub fn config(&self) -> &DspConfig {
        &self.cfg
    }

    /// Shift in semitones for one segment: the requested shift plus `alpha`
    /// of the interval from the source's F0 to the target's.
    fn effective_shift(&self, segment: &[f32], target_f0: f32, params: &ConversionParams) -> f32 {
        if params.alpha == 0.0 || target_f0 <= 0.0 {
            return params.pitch_shift;
        }
        match self.pitch.median_f0(segment, params.pitch_algorithm) {
            Some(source_f0) => {
                params.pitch_shift + params.alpha * 12.0 * (target_f0 / source_f0).log2()
            }
            None => params.pitch_shift,
        }
    }
}

impl ConversionEngine for DspEngine {
    fn kind(&self) -> &str {
        Self::KIND
    }

    fn target_dimension(&self) -> usize {
        Self::TARGET_DIMENSION
    }

    fn encode_target(&self, reference: &[f32]) -> Result<TargetRepresentation, ConvertError> {
        if reference.len() < self.cfg.frame_length {
            return Err(ConvertError::Engine(format!(
                "reference too short: need at least {} samples, got {}",
                self.cfg.frame_length,
                reference.len()
            )));
        }
        let f0 = self
            .pitch
            .median_f0(reference, PitchAlgorithm::Default)
            .unwrap_or(0.0);
        let (_, level) = mean_std(reference);
        Ok(TargetRepresentation::new(Self::KIND, vec![f0, level]))
    }

    fn convert(
        &self,
        segment: &[f32],
        target: &TargetRepresentation,
        params: &ConversionParams,
    ) -> Result<Vec<f32>, ConvertError> {
        if target.engine() != Self::KIND || target.dimension() != Self::TARGET_DIMENSION {
            return Err(ConvertError::Engine(format!(
                "target from engine {:?} with dimension {} cannot drive the dsp engine",
                target.engine(),
                target.dimension()
            )));
        }
        if segment.is_empty() {
            return Ok(Vec::new());
        }
        let (target_f0, target_level) = (target.values()[0], target.values()[1]);

        let semitones = self.effective_shift(segment, target_f0, params);
        let ratio = 2f32.powf(semitones / 12.0);
        trace!(semitones, ratio, len = segment.len(), "dsp convert");

        let mut out = if (ratio - 1.0).abs() < 1e-6 {
            segment.to_vec()
        } else {
            self.shifter.shift(segment, ratio)
        };

        if params.adain {
            match_statistics(&mut out, target_level);
        } else if params.alpha != 0.0 {
            blend_level(&mut out, target_level, params.alpha);
        }
        Ok(out)
    }
}

/// Loader registered under [`DspEngine::KIND`].
pub(crate) fn load(
    _model_dir: &Path,
    options: &serde_json::Value,
    opts: &EngineOptions,
) -> Result<Arc<dyn ConversionEngine>, String> {
    if opts.device != Device::Cpu {
        return Err(format!("dsp engine runs on cpu only, requested {}", opts.device));
    }
    let cfg: DspConfig =
        serde_json::from_value(options.clone()).map_err(|e| format!("dsp options: {e}"))?;
    let engine = DspEngine::new(cfg).map_err(|e| e.to_string())?;
    Ok(Arc::new(engine))
}

fn mean_std(samples: &[f32]) -> (f32, f32) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f32;
    let mean = samples.iter().sum::<f32>() / n;
    let var = samples.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    (mean, var.sqrt())
}

/// Re-normalizes to zero mean and the target's level.
fn match_statistics(samples: &mut [f32], target_level: f32) {
    let (mean, std) = mean_std(samples);
    if std < LEVEL_FLOOR {
        return;
    }
    let scale = target_level / std;
    for s in samples.iter_mut() {
        *s = (*s - mean) * scale;
    }
}

/// Moves the level `alpha` of the way toward the target's.
fn blend_level(samples: &mut [f32], target_level: f32, alpha: f32) {
    let (_, std) = mean_std(samples);
    if std < LEVEL_FLOOR {
        return;
    }
    let gain = 1.0 + alpha * (target_level / std - 1.0);
    for s in samples.iter_mut() {
        *s *= gain;
    }
}
