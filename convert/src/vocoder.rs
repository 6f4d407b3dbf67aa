//! Length-preserving pitch shifting with a phase vocoder.
//!
//! The segment is time-stretched by the pitch ratio, then read back at the
//! same ratio so the output keeps the input's length and timing.

use std::f32::consts::PI;
use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

const TWO_PI: f32 = 2.0 * PI;

/// Smallest pitch ratio applied; lower requests are clamped (two octaves down).
pub const MIN_RATIO: f32 = 0.25;
/// Largest pitch ratio applied; higher requests are clamped (two octaves up).
pub const MAX_RATIO: f32 = 4.0;

/// Phase vocoder with cached FFT plans. Shareable across threads.
pub struct PitchShifter {
    fft_size: usize,
    hop: usize,
    window: Vec<f32>,
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
}

impl PitchShifter {
    pub fn new(fft_size: usize) -> Result<Self, String> {
        if fft_size < 16 || fft_size % 4 != 0 {
            return Err(format!(
                "fft size must be a multiple of 4 and at least 16, got {fft_size}"
            ));
        }
        let mut planner = FftPlanner::new();
        let window = (0..fft_size)
            .map(|i| 0.5 - 0.5 * (TWO_PI * i as f32 / fft_size as f32).cos())
            .collect();
        Ok(Self {
            fft_size,
            hop: fft_size / 4,
            window,
            forward: planner.plan_fft_forward(fft_size),
            inverse: planner.plan_fft_inverse(fft_size),
        })
    }

    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Multiplies every frequency by `ratio` (2.0 is one octave up).
    ///
    /// The output always has the input's length. The applied ratio is
    /// quantized to `synthesis_hop / analysis_hop`.
    pub fn shift(&self, input: &[f32], ratio: f32) -> Vec<f32> {
        if input.is_empty() {
            return Vec::new();
        }
        let ratio = ratio.clamp(MIN_RATIO, MAX_RATIO);
        let synthesis_hop = ((self.hop as f32 * ratio).round() as usize).max(1);
        if synthesis_hop == self.hop {
            return input.to_vec();
        }
        let stretched = self.stretch(input, synthesis_hop);

        // Input sample i sits at padded analysis position i + N and lands at
        // (i + N/2) * r + N/2 in the stretched signal.
        let r = synthesis_hop as f64 / self.hop as f64;
        let half = self.fft_size as f64 / 2.0;
        (0..input.len())
            .map(|i| cubic_at(&stretched, (i as f64 + half) * r + half))
            .collect()
    }

    /// Time-stretches by `synthesis_hop / hop`. The input is read with N zeros
    /// in front and enough zeros behind to cover the last sample.
    fn stretch(&self, input: &[f32], synthesis_hop: usize) -> Vec<f32> {
        let n = self.fft_size;
        let bins = n / 2 + 1;
        let frames = (input.len() + n).div_ceil(self.hop) + 1;
        let out_len = (frames - 1) * synthesis_hop + n;

        let mut output = vec![0.0f32; out_len];
        let mut window_sum = vec![0.0f32; out_len];
        let mut buffer = vec![Complex::new(0.0f32, 0.0); n];
        let mut prev_phase = vec![0.0f32; bins];
        let mut phase_accum = vec![0.0f32; bins];
        let hop_ratio = synthesis_hop as f32 / self.hop as f32;
        let norm = 1.0 / n as f32;

        for frame in 0..frames {
            let start = frame * self.hop;
            for (j, (slot, &w)) in buffer.iter_mut().zip(&self.window).enumerate() {
                let sample = (start + j)
                    .checked_sub(n)
                    .and_then(|i| input.get(i))
                    .copied()
                    .unwrap_or(0.0);
                *slot = Complex::new(sample * w, 0.0);
            }
            self.forward.process(&mut buffer);

            for bin in 0..bins {
                let (magnitude, phase) = buffer[bin].to_polar();
                if frame == 0 {
                    phase_accum[bin] = phase;
                } else {
                    let expected = TWO_PI * bin as f32 * self.hop as f32 / n as f32;
                    let deviation = wrap_phase(phase - prev_phase[bin] - expected);
                    phase_accum[bin] =
                        wrap_phase(phase_accum[bin] + (expected + deviation) * hop_ratio);
                }
                prev_phase[bin] = phase;
                buffer[bin] = Complex::from_polar(magnitude, phase_accum[bin]);
            }
            for bin in 1..bins - 1 {
                buffer[n - bin] = buffer[bin].conj();
            }
            self.inverse.process(&mut buffer);

            let out_start = frame * synthesis_hop;
            for (j, &w) in self.window.iter().enumerate() {
                output[out_start + j] += buffer[j].re * norm * w;
                window_sum[out_start + j] += w * w;
            }
        }

        // Clamp the divisor so sparse-overlap edges are not amplified.
        let floor = window_sum.iter().copied().fold(0.0f32, f32::max) * 0.1;
        for (s, &ws) in output.iter_mut().zip(&window_sum) {
            let ws = ws.max(floor);
            if ws > 1e-6 {
                *s /= ws;
            }
        }
        output
    }
}

/// Wraps a phase to [-PI, PI).
#[inline]
fn wrap_phase(phase: f32) -> f32 {
    let p = phase + PI;
    p - (p / TWO_PI).floor() * TWO_PI - PI
}

/// 4-point Hermite interpolation with zeros outside the signal.
fn cubic_at(x: &[f32], pos: f64) -> f32 {
    let idx = pos.floor() as isize;
    let frac = (pos - idx as f64) as f32;
    let at = |i: isize| -> f32 {
        if i < 0 {
            0.0
        } else {
            x.get(i as usize).copied().unwrap_or(0.0)
        }
    };
    let (s0, s1, s2, s3) = (at(idx - 1), at(idx), at(idx + 1), at(idx + 2));
    let c1 = 0.5 * (s2 - s0);
    let c2 = s0 - 2.5 * s1 + 2.0 * s2 - 0.5 * s3;
    let c3 = 0.5 * (s3 - s0) + 1.5 * (s1 - s2);
    ((c3 * frac + c2) * frac + c1) * frac + s1
}
