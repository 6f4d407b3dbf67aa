//! Planar waveform type and sample-level helpers.

use crate::error::AudioError;

/// Guard added to the peak before normalizing so silent input stays silent.
pub const NORMALIZE_EPSILON: f32 = 1e-8;

/// Floating-point samples per channel, tagged with a sample rate.
///
/// Channels are stored planar (one `Vec` per channel) and always have the
/// same number of frames.
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    channels: Vec<Vec<f32>>,
    sample_rate: u32,
}

impl Waveform {
    /// Creates a waveform from planar channel data.
    pub fn new(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self, AudioError> {
        if sample_rate == 0 {
            return Err(AudioError::InvalidRate(sample_rate));
        }
        let expected = channels.first().ok_or(AudioError::NoChannels)?.len();
        for (i, ch) in channels.iter().enumerate() {
            if ch.len() != expected {
                return Err(AudioError::ChannelLength {
                    channel: i,
                    expected,
                    got: ch.len(),
                });
            }
        }
        Ok(Self {
            channels,
            sample_rate,
        })
    }

    /// Creates a single-channel waveform.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AudioError> {
        Self::new(vec![samples], sample_rate)
    }

    /// Creates a waveform from interleaved frames. Trailing samples that do
    /// not fill a whole frame are dropped.
    pub fn from_interleaved(
        data: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, AudioError> {
        if num_channels == 0 {
            return Err(AudioError::NoChannels);
        }
        let frames = data.len() / num_channels;
        let channels = (0..num_channels)
            .map(|ch| {
                data.iter()
                    .skip(ch)
                    .step_by(num_channels)
                    .take(frames)
                    .copied()
                    .collect()
            })
            .collect();
        Self::new(channels, sample_rate)
    }

    /// Sample rate in Hz.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel).
    pub fn len(&self) -> usize {
        self.channels[0].len()
    }

    /// Returns true if the waveform has no frames.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.sample_rate as f64
    }

    /// Returns the planar channel data.
    pub fn channels(&self) -> &[Vec<f32>] {
        &self.channels
    }

    /// Returns one channel, if present.
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        self.channels.get(index).map(Vec::as_slice)
    }

    /// Returns the first channel.
    pub fn first_channel(&self) -> &[f32] {
        &self.channels[0]
    }

    /// Reduces all channels to one by averaging them frame by frame.
    pub fn mix_to_mono(&self) -> Vec<f32> {
        if self.channels.len() == 1 {
            return self.channels[0].clone();
        }
        let scale = 1.0 / self.channels.len() as f32;
        (0..self.len())
            .map(|i| self.channels.iter().map(|ch| ch[i]).sum::<f32>() * scale)
            .collect()
    }

    /// Repeats a mono signal across `num_channels` channels.
    pub fn duplicate_mono(
        samples: Vec<f32>,
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self, AudioError> {
        if num_channels == 0 {
            return Err(AudioError::NoChannels);
        }
        Self::new(vec![samples; num_channels], sample_rate)
    }

    /// Returns the frames interleaved channel by channel.
    pub fn interleaved(&self) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.len() * self.channels.len());
        for i in 0..self.len() {
            for ch in &self.channels {
                out.push(ch[i]);
            }
        }
        out
    }
}

/// Returns the largest absolute sample value, or 0 for empty input.
pub fn peak(samples: &[f32]) -> f32 {
    samples.iter().fold(0.0f32, |m, s| m.max(s.abs()))
}

/// Scales samples so the peak magnitude is (just under) 1.
///
/// Divides by `peak + NORMALIZE_EPSILON`, so an all-zero signal is returned
/// unchanged instead of dividing by zero.
pub fn normalize_peak(samples: &mut [f32]) {
    let scale = 1.0 / (peak(samples) + NORMALIZE_EPSILON);
    for s in samples.iter_mut() {
        *s *= scale;
    }
}

/// Truncates or zero-pads `samples` to exactly `len` frames.
pub fn fit_length(samples: &mut Vec<f32>, len: usize) {
    samples.resize(len, 0.0);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_zero_rate() {
        let err = Waveform::mono(vec![0.0; 4], 0).unwrap_err();
        assert!(matches!(err, AudioError::InvalidRate(0)));
    }

    #[test]
    fn new_rejects_ragged_channels() {
        let err = Waveform::new(vec![vec![0.0; 4], vec![0.0; 3]], 16000).unwrap_err();
        assert!(matches!(
            err,
            AudioError::ChannelLength {
                channel: 1,
                expected: 4,
                got: 3
            }
        ));
    }

    #[test]
    fn new_rejects_no_channels() {
        assert!(matches!(
            Waveform::new(vec![], 16000),
            Err(AudioError::NoChannels)
        ));
    }

    #[test]
    fn from_interleaved_splits_channels() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0];
        let w = Waveform::from_interleaved(&data, 2, 8000).unwrap();
        assert_eq!(w.num_channels(), 2);
        assert_eq!(w.len(), 3);
        assert_eq!(w.channel(0).unwrap(), &[1.0, 3.0, 5.0]);
        assert_eq!(w.channel(1).unwrap(), &[2.0, 4.0, 6.0]);
        assert_eq!(w.interleaved(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn mix_to_mono_averages() {
        let w = Waveform::new(vec![vec![1.0, 0.5], vec![0.0, -0.5]], 16000).unwrap();
        assert_eq!(w.mix_to_mono(), vec![0.5, 0.0]);
    }

    #[test]
    fn first_channel_is_not_averaged() {
        let w = Waveform::new(vec![vec![1.0, 1.0], vec![-1.0, -1.0]], 16000).unwrap();
        assert_eq!(w.first_channel(), &[1.0, 1.0]);
    }

    #[test]
    fn duplicate_mono_copies_channels() {
        let w = Waveform::duplicate_mono(vec![0.1, 0.2], 3, 22050).unwrap();
        assert_eq!(w.num_channels(), 3);
        assert!(w.channels().iter().all(|c| c == &vec![0.1, 0.2]));
    }

    #[test]
    fn duration_matches_rate() {
        let w = Waveform::mono(vec![0.0; 8000], 16000).unwrap();
        assert!((w.duration_secs() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn normalize_scales_to_unit_peak() {
        let mut s = vec![0.25, -0.5, 0.1];
        normalize_peak(&mut s);
        assert!((peak(&s) - 1.0).abs() < 1e-6);
        assert!((s[0] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn normalize_twice_is_stable() {
        let mut s: Vec<f32> = (0..100).map(|i| (i as f32 * 0.3).sin() * 0.7).collect();
        normalize_peak(&mut s);
        let once = s.clone();
        normalize_peak(&mut s);
        for (a, b) in once.iter().zip(&s) {
            assert!((a - b).abs() < 1e-6);
        }
    }

    #[test]
    fn normalize_silence_stays_silent() {
        let mut s = vec![0.0f32; 64];
        normalize_peak(&mut s);
        assert!(s.iter().all(|v| *v == 0.0));
    }

    #[test]
    fn fit_length_pads_and_truncates() {
        let mut s = vec![1.0, 2.0, 3.0];
        fit_length(&mut s, 5);
        assert_eq!(s, vec![1.0, 2.0, 3.0, 0.0, 0.0]);
        fit_length(&mut s, 2);
        assert_eq!(s, vec![1.0, 2.0]);
    }
}
