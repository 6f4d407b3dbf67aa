use crate::error::ConvertError;
use crate::params::{ConversionParams, Device};
use crate::target::TargetRepresentation;

/// Voice conversion model: encodes target voices and converts segments.
///
/// All audio crossing this trait is mono `f32` at
/// [`WORKING_SAMPLE_RATE`](voxshift_audio::WORKING_SAMPLE_RATE).
///
/// # Contract
///
/// - [`convert`](ConversionEngine::convert) returns exactly as many samples
///   as it was given.
/// - Both entry points are deterministic for identical inputs and weights.
/// - Calls have no side effects and no ordering dependency, so segments of
///   one recording may be converted in any order or concurrently.
///
/// # Thread Safety
///
/// Implementations must be safe for concurrent use.
pub trait ConversionEngine: Send + Sync {
    /// Engine kind as named in the model manifest (e.g. `"dsp"`).
    fn kind(&self) -> &str;

    /// Number of values in the target representations this engine produces.
    fn target_dimension(&self) -> usize;

    /// Derives a target voice representation from a reference recording.
    fn encode_target(&self, reference: &[f32]) -> Result<TargetRepresentation, ConvertError>;

    /// Converts one segment toward `target`.
    fn convert(
        &self,
        segment: &[f32],
        target: &TargetRepresentation,
        params: &ConversionParams,
    ) -> Result<Vec<f32>, ConvertError>;
}

/// Options passed to engine loaders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineOptions {
    /// Compute backend to load weights onto.
    pub device: Device,
}
