//! The streaming convertor: one recording in, one converted recording out.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use voxshift_audio::{
    WORKING_SAMPLE_RATE, Waveform, fit_length, normalize_peak, read_audio, resample,
    resample_samples, write_wav,
};

use crate::chunk::{ChunkPlan, ConversionMode};
use crate::engine::ConversionEngine;
use crate::error::ConvertError;
use crate::params::ConversionParams;
use crate::target::TargetRepresentation;

/// Extension of every output file.
pub const OUTPUT_EXTENSION: &str = "wav";

/// Per-file processing stage, used in logs and cancellation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Loaded,
    Converting,
    Converted,
    Resampled,
    Normalized,
    Written,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Loaded => "loaded",
            Stage::Converting => "converting",
            Stage::Converted => "converted",
            Stage::Resampled => "resampled",
            Stage::Normalized => "normalized",
            Stage::Written => "written",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Options that shape how each file is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConvertOptions {
    pub mode: ConversionMode,
    /// Peak-normalize the output.
    pub normalize: bool,
    /// Windows converted concurrently in chunked mode.
    pub chunk_workers: usize,
    /// Duplicate the mono result to the input's channel count.
    pub preserve_channels: bool,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            mode: ConversionMode::WholeFile,
            normalize: false,
            chunk_workers: 1,
            preserve_channels: false,
        }
    }
}

/// Converts recordings with a shared engine.
///
/// The convertor holds no per-file state; one instance can serve any number
/// of files, sequentially or from several threads.
#[derive(Clone)]
pub struct StreamingConvertor {
    engine: Arc<dyn ConversionEngine>,
    options: ConvertOptions,
}

impl StreamingConvertor {
    pub fn new(engine: Arc<dyn ConversionEngine>, options: ConvertOptions) -> Self {
        Self { engine, options }
    }

    pub fn engine(&self) -> &Arc<dyn ConversionEngine> {
        &self.engine
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Converts a mono working-rate signal. The result has the same length.
    pub fn convert_samples(
        &self,
        samples: &[f32],
        target: &TargetRepresentation,
        params: &ConversionParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<f32>, ConvertError> {
        if samples.is_empty() {
            return Ok(Vec::new());
        }
        check_cancel(cancel, Stage::Converting)?;

        match self.options.mode {
            ConversionMode::WholeFile => {
                let out = self.engine.convert(samples, target, params)?;
                if out.len() != samples.len() {
                    return Err(ConvertError::LengthMismatch {
                        expected: samples.len(),
                        got: out.len(),
                    });
                }
                Ok(out)
            }
            ConversionMode::Chunked(chunk) => {
                let plan = ChunkPlan::new(samples.len(), chunk)?;
                debug!(
                    chunk = plan.chunk_size(),
                    windows = plan.window_count(),
                    workers = self.options.chunk_workers,
                    "chunk plan"
                );
                let bodies = if self.options.chunk_workers > 1 {
                    self.convert_windows_parallel(&plan, samples, target, params, cancel)?
                } else {
                    self.convert_windows(&plan, samples, target, params, cancel)?
                };
                Ok(plan.assemble(bodies))
            }
        }
    }

    fn convert_window(
        &self,
        plan: &ChunkPlan,
        samples: &[f32],
        i: usize,
        target: &TargetRepresentation,
        params: &ConversionParams,
    ) -> Result<Vec<f32>, ConvertError> {
        let window = plan.window(samples, i);
        let converted = self.engine.convert(&window, target, params)?;
        let body = plan.trim(&converted)?;
        debug!(window = i + 1, of = plan.window_count(), "chunk converted");
        Ok(body.to_vec())
    }

    fn convert_windows(
        &self,
        plan: &ChunkPlan,
        samples: &[f32],
        target: &TargetRepresentation,
        params: &ConversionParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>, ConvertError> {
        let mut bodies = Vec::with_capacity(plan.window_count());
        for i in 0..plan.window_count() {
            check_cancel(cancel, Stage::Converting)?;
            bodies.push(self.convert_window(plan, samples, i, target, params)?);
        }
        Ok(bodies)
    }

    /// Converts windows on scoped worker threads that pull window indices
    /// from a shared counter. Bodies are put back in window order.
    fn convert_windows_parallel(
        &self,
        plan: &ChunkPlan,
        samples: &[f32],
        target: &TargetRepresentation,
        params: &ConversionParams,
        cancel: &CancellationToken,
    ) -> Result<Vec<Vec<f32>>, ConvertError> {
        let count = plan.window_count();
        let workers = self.options.chunk_workers.min(count);
        let next = &AtomicUsize::new(0);
        let failed = &AtomicBool::new(false);

        let results: Vec<Vec<(usize, Result<Vec<f32>, ConvertError>)>> =
            std::thread::scope(|s| {
                let handles: Vec<_> = (0..workers)
                    .map(move |_| {
                        s.spawn(move || {
                            let mut done = Vec::new();
                            loop {
                                if failed.load(Ordering::Relaxed) {
                                    break;
                                }
                                let i = next.fetch_add(1, Ordering::Relaxed);
                                if i >= count {
                                    break;
                                }
                                let result = check_cancel(cancel, Stage::Converting).and_then(
                                    |()| self.convert_window(plan, samples, i, target, params),
                                );
                                if result.is_err() {
                                    failed.store(true, Ordering::Relaxed);
                                }
                                done.push((i, result));
                            }
                            done
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .map(|h| {
                        h.join().unwrap_or_else(|_| {
                            vec![(0, Err(ConvertError::Engine("chunk worker panicked".into())))]
                        })
                    })
                    .collect()
            });

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; count];
        let mut first_err: Option<(usize, ConvertError)> = None;
        for (i, result) in results.into_iter().flatten() {
            match result {
                Ok(body) => slots[i] = Some(body),
                Err(e) => {
                    if first_err.as_ref().is_none_or(|(j, _)| i < *j) {
                        first_err = Some((i, e));
                    }
                }
            }
        }
        if let Some((_, e)) = first_err {
            return Err(e);
        }
        slots
            .into_iter()
            .enumerate()
            .map(|(i, body)| {
                body.ok_or_else(|| ConvertError::Engine(format!("window {i} was not converted")))
            })
            .collect()
    }

    /// Converts a decoded recording and returns it at its original rate and
    /// frame count.
    pub fn convert_waveform(
        &self,
        wave: &Waveform,
        target: &TargetRepresentation,
        params: &ConversionParams,
        cancel: &CancellationToken,
    ) -> Result<Waveform, ConvertError> {
        let rate = wave.sample_rate();
        let frames = wave.len();
        let channels = if self.options.preserve_channels {
            wave.num_channels()
        } else {
            1
        };
        if wave.is_empty() {
            debug!("empty input, nothing to convert");
            return Ok(Waveform::duplicate_mono(Vec::new(), channels, rate)?);
        }

        let working = resample(wave, WORKING_SAMPLE_RATE)?;
        let mono = working.mix_to_mono();
        debug!(stage = %Stage::Loaded, frames = mono.len(), "working signal ready");

        let converted = self.convert_samples(&mono, target, params, cancel)?;
        debug!(stage = %Stage::Converted, frames = converted.len());
        check_cancel(cancel, Stage::Converted)?;

        let mut out = resample_samples(&converted, WORKING_SAMPLE_RATE, rate)?;
        fit_length(&mut out, frames);
        debug!(stage = %Stage::Resampled, rate, frames = out.len());

        if self.options.normalize {
            normalize_peak(&mut out);
            debug!(stage = %Stage::Normalized);
        }

        Ok(Waveform::duplicate_mono(out, channels, rate)?)
    }

    /// Converts one file into `output_dir`, returning the written path.
    ///
    /// Nothing is written if the conversion fails or is cancelled.
    pub fn convert_file(
        &self,
        input: &Path,
        output_dir: &Path,
        target: &TargetRepresentation,
        params: &ConversionParams,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, ConvertError> {
        check_cancel(cancel, Stage::Loaded)?;
        let wave = read_audio(input)?;
        let out = self.convert_waveform(&wave, target, params, cancel)?;

        check_cancel(cancel, Stage::Written)?;
        let path = output_path(input, output_dir);
        write_wav(&path, &out)?;
        info!(
            input = %input.display(),
            output = %path.display(),
            seconds = out.duration_secs(),
            "file converted"
        );
        Ok(path)
    }
}

/// Output path for `input`: its base name with only the last extension
/// replaced, so `take.01.flac` becomes `take.01.wav`.
pub fn output_path(input: &Path, output_dir: &Path) -> PathBuf {
    let mut name = input
        .file_stem()
        .map(|s| s.to_os_string())
        .unwrap_or_else(|| "output".into());
    name.push(".");
    name.push(OUTPUT_EXTENSION);
    output_dir.join(name)
}

fn check_cancel(cancel: &CancellationToken, stage: Stage) -> Result<(), ConvertError> {
    if cancel.is_cancelled() {
        return Err(ConvertError::Cancelled { stage });
    }
    Ok(())
}
