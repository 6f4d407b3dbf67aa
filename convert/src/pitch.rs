//! Frame-based fundamental frequency (F0) estimation.
//!
//! Three estimators are provided, selected by [`PitchAlgorithm`]:
//!
//! - `Default`: normalized autocorrelation with first-peak picking
//! - `Dio`: event-interval estimation on a low-passed signal, after DIO
//!   (zero-crossing and peak intervals averaged per frame)
//! - `Harvest`: cumulative mean normalized difference function (YIN-style)
//!   with parabolic refinement; slower, fewer octave errors
//!
//! Each returns one `Option<f32>` per frame: `None` for unvoiced or silent
//! frames, `Some(hz)` otherwise.

use crate::params::PitchAlgorithm;

/// Absolute threshold for the difference-function estimator.
const CMND_THRESHOLD: f32 = 0.15;
/// Frames whose energy is below this are treated as silence.
const SILENCE_ENERGY: f32 = 1e-8;
/// Maximum relative spread of event intervals for a voiced frame.
const MAX_INTERVAL_SPREAD: f32 = 0.2;

/// Configures F0 estimation.
#[derive(Debug, Clone, PartialEq)]
pub struct PitchConfig {
    /// Input sample rate in Hz (default: 16000).
    pub sample_rate: u32,
    /// Analysis frame length in samples (default: 1024 = 64ms @ 16kHz).
    pub frame_length: usize,
    /// Frame hop in samples (default: 256 = 16ms @ 16kHz).
    pub hop_length: usize,
    /// Lowest detectable F0 in Hz (default: 50).
    pub f0_min: f32,
    /// Highest detectable F0 in Hz (default: 1000).
    pub f0_max: f32,
    /// Minimum normalized autocorrelation for a voiced frame (default: 0.3).
    pub voicing_threshold: f32,
}

impl Default for PitchConfig {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            frame_length: 1024,
            hop_length: 256,
            f0_min: 50.0,
            f0_max: 1000.0,
            voicing_threshold: 0.3,
        }
    }
}

impl PitchConfig {
    /// Checks that the lag search range fits inside one frame.
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate == 0 || self.hop_length == 0 {
            return Err("sample rate and hop length must be positive".into());
        }
        if !(self.f0_min > 0.0 && self.f0_min < self.f0_max) {
            return Err(format!(
                "need 0 < f0_min < f0_max, got {} and {}",
                self.f0_min, self.f0_max
            ));
        }
        if self.min_lag() < 2 {
            return Err(format!("f0_max {} is too close to Nyquist", self.f0_max));
        }
        if self.max_lag() * 2 > self.frame_length {
            return Err(format!(
                "frame length {} must cover two periods of f0_min {}",
                self.frame_length, self.f0_min
            ));
        }
        Ok(())
    }

    fn min_lag(&self) -> usize {
        (self.sample_rate as f32 / self.f0_max).floor() as usize
    }

    fn max_lag(&self) -> usize {
        (self.sample_rate as f32 / self.f0_min).ceil() as usize
    }
}

/// Estimates F0 tracks with a fixed configuration.
#[derive(Debug, Clone)]
pub struct PitchEstimator {
    cfg: PitchConfig,
}

impl PitchEstimator {
    pub fn new(cfg: PitchConfig) -> Result<Self, String> {
        cfg.validate()?;
        Ok(Self { cfg })
    }

    pub fn config(&self) -> &PitchConfig {
        &self.cfg
    }

    /// Returns one F0 estimate per frame. Signals shorter than one frame
    /// yield an empty track.
    pub fn track(&self, signal: &[f32], algorithm: PitchAlgorithm) -> Vec<Option<f32>> {
        let cfg = &self.cfg;
        if signal.len() < cfg.frame_length {
            return Vec::new();
        }
        let num_frames = (signal.len() - cfg.frame_length) / cfg.hop_length + 1;
        (0..num_frames)
            .map(|f| {
                let start = f * cfg.hop_length;
                let frame = &signal[start..start + cfg.frame_length];
                match algorithm {
                    PitchAlgorithm::Default => autocorrelation_f0(frame, cfg),
                    PitchAlgorithm::Dio => event_interval_f0(frame, cfg),
                    PitchAlgorithm::Harvest => difference_f0(frame, cfg),
                }
            })
            .collect()
    }

    /// Median F0 over voiced frames, or `None` if no frame is voiced.
    pub fn median_f0(&self, signal: &[f32], algorithm: PitchAlgorithm) -> Option<f32> {
        let mut voiced: Vec<f32> = self.track(signal, algorithm).into_iter().flatten().collect();
        if voiced.is_empty() {
            return None;
        }
        voiced.sort_by(|a, b| a.total_cmp(b));
        Some(voiced[voiced.len() / 2])
    }
}

fn remove_dc(frame: &[f32]) -> Vec<f32> {
    let mean = frame.iter().sum::<f32>() / frame.len() as f32;
    frame.iter().map(|v| v - mean).collect()
}

/// Refines the position of an extremum at `i` using its two neighbours.
fn parabolic_offset(prev: f32, cur: f32, next: f32) -> f32 {
    let denom = prev - 2.0 * cur + next;
    if denom.abs() < 1e-12 {
        return 0.0;
    }
    (0.5 * (prev - next) / denom).clamp(-0.5, 0.5)
}

fn in_range(f0: f32, cfg: &PitchConfig) -> Option<f32> {
    (f0 >= cfg.f0_min && f0 <= cfg.f0_max).then_some(f0)
}

fn autocorrelation_f0(frame: &[f32], cfg: &PitchConfig) -> Option<f32> {
    let x = remove_dc(frame);
    let n = x.len();
    let energy: f32 = x.iter().map(|v| v * v).sum();
    if energy / (n as f32) < SILENCE_ENERGY {
        return None;
    }

    let (min_lag, max_lag) = (cfg.min_lag(), cfg.max_lag());
    // Normalized autocorrelation, one extra lag on each side for peak tests.
    let r: Vec<f32> = (min_lag - 1..=max_lag + 1)
        .map(|lag| {
            let (mut num, mut e0, mut e1) = (0.0f32, 0.0f32, 0.0f32);
            for i in 0..n - lag {
                num += x[i] * x[i + lag];
                e0 += x[i] * x[i];
                e1 += x[i + lag] * x[i + lag];
            }
            let den = (e0 * e1).sqrt();
            if den > 0.0 { num / den } else { 0.0 }
        })
        .collect();

    let best = r[1..r.len() - 1].iter().cloned().fold(f32::MIN, f32::max);
    if best < cfg.voicing_threshold {
        return None;
    }
    // First local maximum close to the global one avoids octave-down errors.
    for k in 1..r.len() - 1 {
        if r[k] >= r[k - 1] && r[k] >= r[k + 1] && r[k] >= 0.9 * best {
            let lag = (min_lag - 1 + k) as f32 + parabolic_offset(r[k - 1], r[k], r[k + 1]);
            return in_range(cfg.sample_rate as f32 / lag, cfg);
        }
    }
    None
}

fn event_interval_f0(frame: &[f32], cfg: &PitchConfig) -> Option<f32> {
    let x = remove_dc(frame);
    let energy: f32 = x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32;
    if energy < SILENCE_ENERGY {
        return None;
    }

    // Moving-average low-pass keeps the fundamental, suppresses harmonics.
    let width = (cfg.sample_rate as f32 / (2.0 * cfg.f0_max)).round().max(1.0) as usize;
    let mut smooth = Vec::with_capacity(x.len());
    let mut acc = 0.0f32;
    for i in 0..x.len() {
        acc += x[i];
        if i >= width {
            acc -= x[i - width];
        }
        smooth.push(acc / width.min(i + 1) as f32);
    }

    // Event positions: rising and falling zero crossings, peaks and dips.
    let mut events: [Vec<f32>; 4] = Default::default();
    for i in 1..smooth.len() - 1 {
        let (a, b) = (smooth[i - 1], smooth[i]);
        if a < 0.0 && b >= 0.0 {
            events[0].push(i as f32 - 1.0 + a / (a - b));
        } else if a > 0.0 && b <= 0.0 {
            events[1].push(i as f32 - 1.0 + a / (a - b));
        }
        let c = smooth[i + 1];
        if b > a && b >= c && b > 0.0 {
            events[2].push(i as f32);
        } else if b < a && b <= c && b < 0.0 {
            events[3].push(i as f32);
        }
    }

    let min_period = cfg.sample_rate as f32 / cfg.f0_max;
    let max_period = cfg.sample_rate as f32 / cfg.f0_min;
    let mut intervals = Vec::new();
    for positions in &events {
        for w in positions.windows(2) {
            let d = w[1] - w[0];
            if d >= min_period && d <= max_period {
                intervals.push(d);
            }
        }
    }
    if intervals.len() < 4 {
        return None;
    }

    let mean = intervals.iter().sum::<f32>() / intervals.len() as f32;
    let var = intervals.iter().map(|d| (d - mean).powi(2)).sum::<f32>() / intervals.len() as f32;
    if var.sqrt() / mean > MAX_INTERVAL_SPREAD {
        return None;
    }
    in_range(cfg.sample_rate as f32 / mean, cfg)
}

fn difference_f0(frame: &[f32], cfg: &PitchConfig) -> Option<f32> {
    let x = remove_dc(frame);
    let energy: f32 = x.iter().map(|v| v * v).sum::<f32>() / x.len() as f32;
    if energy < SILENCE_ENERGY {
        return None;
    }

    let (min_lag, max_lag) = (cfg.min_lag(), cfg.max_lag());
    let window = x.len() - max_lag - 1;

    // d[tau] for tau in 0..=max_lag+1
    let mut d = vec![0.0f32; max_lag + 2];
    for (tau, slot) in d.iter_mut().enumerate().skip(1) {
        let mut sum = 0.0f32;
        for i in 0..window {
            let diff = x[i] - x[i + tau];
            sum += diff * diff;
        }
        *slot = sum;
    }

    // Cumulative mean normalization.
    let mut cmnd = vec![1.0f32; d.len()];
    let mut running = 0.0f32;
    for tau in 1..d.len() {
        running += d[tau];
        cmnd[tau] = if running > 0.0 {
            d[tau] * tau as f32 / running
        } else {
            1.0
        };
    }

    let mut tau = min_lag.max(1);
    while tau <= max_lag {
        if cmnd[tau] < CMND_THRESHOLD {
            while tau < max_lag && cmnd[tau + 1] < cmnd[tau] {
                tau += 1;
            }
            let lag = tau as f32 + parabolic_offset(cmnd[tau - 1], cmnd[tau], cmnd[tau + 1]);
            return in_range(cfg.sample_rate as f32 / lag, cfg);
        }
        tau += 1;
    }
    None
}
