//! Per-invocation conversion parameters and the compute device selector.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConvertError;

/// Algorithm used to estimate the fundamental frequency of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PitchAlgorithm {
    #[default]
    Default,
    Dio,
    Harvest,
}

impl PitchAlgorithm {
    /// Returns the lowercase name used on the command line and in config files.
    pub fn as_str(&self) -> &'static str {
        match self {
            PitchAlgorithm::Default => "default",
            PitchAlgorithm::Dio => "dio",
            PitchAlgorithm::Harvest => "harvest",
        }
    }
}

impl fmt::Display for PitchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PitchAlgorithm {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Ok(PitchAlgorithm::Default),
            "dio" => Ok(PitchAlgorithm::Dio),
            "harvest" => Ok(PitchAlgorithm::Harvest),
            other => Err(ConvertError::Config(format!(
                "unknown pitch estimation algorithm {other:?} (want default, dio or harvest)"
            ))),
        }
    }
}

/// Conversion parameters applied to every segment of one file.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionParams {
    /// Pitch shift in semitones (positive is higher).
    pub pitch_shift: f32,
    /// Blend between source-likeness (0) and target-likeness (1).
    pub alpha: f32,
    /// Re-normalize segment statistics to the target's (adaptive instance normalization).
    pub adain: bool,
    /// Pitch estimation algorithm.
    pub pitch_algorithm: PitchAlgorithm,
}

impl ConversionParams {
    pub fn with_pitch_shift(mut self, semitones: f32) -> Self {
        self.pitch_shift = semitones;
        self
    }

    pub fn with_alpha(mut self, alpha: f32) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_adain(mut self, adain: bool) -> Self {
        self.adain = adain;
        self
    }

    pub fn with_pitch_algorithm(mut self, algorithm: PitchAlgorithm) -> Self {
        self.pitch_algorithm = algorithm;
        self
    }

    /// Rejects non-finite values.
    pub fn validate(&self) -> Result<(), ConvertError> {
        if !self.pitch_shift.is_finite() {
            return Err(ConvertError::Config(format!(
                "pitch shift must be finite, got {}",
                self.pitch_shift
            )));
        }
        if !self.alpha.is_finite() {
            return Err(ConvertError::Config(format!(
                "alpha must be finite, got {}",
                self.alpha
            )));
        }
        Ok(())
    }
}

/// Compute backend an engine should run on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Device {
    #[default]
    Cpu,
    Cuda(u32),
    Metal,
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => f.write_str("cpu"),
            Device::Cuda(n) => write!(f, "cuda:{n}"),
            Device::Metal => f.write_str("metal"),
        }
    }
}

impl FromStr for Device {
    type Err = ConvertError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim().to_ascii_lowercase();
        match s.as_str() {
            "cpu" => return Ok(Device::Cpu),
            "cuda" => return Ok(Device::Cuda(0)),
            "metal" | "mps" => return Ok(Device::Metal),
            _ => {}
        }
        if let Some(idx) = s.strip_prefix("cuda:") {
            return idx
                .parse()
                .map(Device::Cuda)
                .map_err(|_| ConvertError::Config(format!("invalid cuda device index {idx:?}")));
        }
        Err(ConvertError::Config(format!(
            "unknown device {s:?} (want cpu, cuda[:N] or metal)"
        )))
    }
}

impl TryFrom<String> for Device {
    type Error = ConvertError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Device> for String {
    fn from(d: Device) -> Self {
        d.to_string()
    }
}
