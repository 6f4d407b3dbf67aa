//! Sample rate conversion.
//!
//! Whole-buffer resampling using the rubato FFT resampler, a pure Rust
//! implementation without any FFI dependencies. Output length scales by
//! `dst_rate / src_rate`, rounded to the nearest frame.
//!
//! # Example
//!
//! ```rust
//! use voxshift_audio::resample_samples;
//!
//! let input = vec![0.0f32; 44100];
//! let output = resample_samples(&input, 44100, 16000).unwrap();
//! assert_eq!(output.len(), 16000);
//! ```

mod rubato_impl;

use crate::error::AudioError;
use crate::waveform::Waveform;

/// Returns the number of frames `len` input frames occupy at `dst_rate`.
pub fn output_len(len: usize, src_rate: u32, dst_rate: u32) -> usize {
    if src_rate == 0 {
        return 0;
    }
    let src = src_rate as u128;
    ((len as u128 * dst_rate as u128 + src / 2) / src) as usize
}

/// Resamples every channel of `wave` to `dst_rate`.
pub fn resample(wave: &Waveform, dst_rate: u32) -> Result<Waveform, AudioError> {
    check_rate(dst_rate)?;
    let channels = rubato_impl::resample_planar(wave.channels(), wave.sample_rate(), dst_rate)?;
    Waveform::new(channels, dst_rate)
}

/// Resamples a single channel from `src_rate` to `dst_rate`.
pub fn resample_samples(
    samples: &[f32],
    src_rate: u32,
    dst_rate: u32,
) -> Result<Vec<f32>, AudioError> {
    check_rate(src_rate)?;
    check_rate(dst_rate)?;
    let mut out = rubato_impl::resample_planar(&[samples.to_vec()], src_rate, dst_rate)?;
    Ok(out.pop().unwrap_or_default())
}

fn check_rate(rate: u32) -> Result<(), AudioError> {
    if rate == 0 {
        return Err(AudioError::InvalidRate(rate));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sine(freq: f32, rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_output_len() {
        assert_eq!(output_len(44100, 44100, 16000), 16000);
        assert_eq!(output_len(50000, 44100, 16000), 18141);
        assert_eq!(output_len(0, 44100, 16000), 0);
        assert_eq!(output_len(10, 0, 16000), 0);
    }

    #[test]
    fn test_invalid_rate() {
        assert!(matches!(
            resample_samples(&[0.0; 10], 0, 16000),
            Err(AudioError::InvalidRate(0))
        ));
        assert!(matches!(
            resample_samples(&[0.0; 10], 16000, 0),
            Err(AudioError::InvalidRate(0))
        ));
    }

    #[test]
    fn test_same_rate_is_identity() {
        let input = sine(440.0, 16000, 1000);
        let output = resample_samples(&input, 16000, 16000).unwrap();
        assert_eq!(input, output);
    }

    #[test]
    fn test_downsample_length() {
        let input = sine(440.0, 48000, 4800);
        let output = resample_samples(&input, 48000, 16000).unwrap();
        assert_eq!(output.len(), 1600);
    }

    #[test]
    fn test_upsample_length() {
        let input = sine(440.0, 16000, 1234);
        let output = resample_samples(&input, 16000, 44100).unwrap();
        assert_eq!(output.len(), output_len(1234, 16000, 44100));
    }

    #[test]
    fn test_round_trip_length() {
        let input = sine(220.0, 44100, 50000);
        let down = resample_samples(&input, 44100, 16000).unwrap();
        let up = resample_samples(&down, 16000, 44100).unwrap();
        // One working-rate frame spans ~2.76 file-rate frames.
        assert!((up.len() as i64 - input.len() as i64).abs() <= 3);
    }

    #[test]
    fn test_round_trip_preserves_energy() {
        let input = sine(440.0, 44100, 44100);
        let down = resample_samples(&input, 44100, 16000).unwrap();
        let up = resample_samples(&down, 16000, 44100).unwrap();
        let rms = |s: &[f32]| (s.iter().map(|v| v * v).sum::<f32>() / s.len() as f32).sqrt();
        // Compare away from the edges where filter transients live.
        let ratio = rms(&up[4000..40000]) / rms(&input[4000..40000]);
        assert!((ratio - 1.0).abs() < 0.05, "energy ratio {ratio}");
    }

    #[test]
    fn test_empty_input() {
        let output = resample_samples(&[], 44100, 16000).unwrap();
        assert!(output.is_empty());
    }

    #[test]
    fn test_resample_waveform_keeps_channels() {
        let wave = Waveform::new(vec![sine(440.0, 32000, 3200), vec![0.0; 3200]], 32000).unwrap();
        let out = resample(&wave, 16000).unwrap();
        assert_eq!(out.num_channels(), 2);
        assert_eq!(out.len(), 1600);
        assert_eq!(out.sample_rate(), 16000);
        assert!(out.channel(1).unwrap().iter().all(|s| s.abs() < 1e-6));
    }
}
