#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use voxshift_convert::{
    ConversionEngine, ConversionParams, ConvertError, EngineOptions, TargetRepresentation,
    register_engine,
};

pub const STUB_KIND: &str = "stub";

/// Deterministic engine: scales each segment by the target's gain and counts
/// calls.
#[derive(Default)]
pub struct StubEngine {
    pub encode_calls: AtomicUsize,
    pub convert_calls: AtomicUsize,
}

impl StubEngine {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn encodes(&self) -> usize {
        self.encode_calls.load(Ordering::SeqCst)
    }

    pub fn converts(&self) -> usize {
        self.convert_calls.load(Ordering::SeqCst)
    }
}

impl ConversionEngine for StubEngine {
    fn kind(&self) -> &str {
        STUB_KIND
    }

    fn target_dimension(&self) -> usize {
        2
    }

    fn encode_target(&self, reference: &[f32]) -> Result<TargetRepresentation, ConvertError> {
        self.encode_calls.fetch_add(1, Ordering::SeqCst);
        let peak = reference.iter().fold(0.0f32, |m, s| m.max(s.abs()));
        Ok(TargetRepresentation::new(STUB_KIND, vec![0.5, peak]))
    }

    fn convert(
        &self,
        segment: &[f32],
        target: &TargetRepresentation,
        _params: &ConversionParams,
    ) -> Result<Vec<f32>, ConvertError> {
        self.convert_calls.fetch_add(1, Ordering::SeqCst);
        let gain = target.values()[0];
        Ok(segment.iter().map(|s| s * gain).collect())
    }
}

pub fn stub_target() -> TargetRepresentation {
    TargetRepresentation::new(STUB_KIND, vec![0.5, 1.0])
}

/// Registers the stub under its kind so model directories can name it.
pub fn register_stub() {
    register_engine(
        STUB_KIND,
        Arc::new(|_: &Path, _: &serde_json::Value, _: &EngineOptions| {
            Ok::<_, String>(StubEngine::new() as Arc<dyn ConversionEngine>)
        }),
    );
}

pub fn write_model_dir(dir: &Path, kind: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(
        dir.join("engine.json"),
        format!("{{\"engine\": \"{kind}\"}}"),
    )
    .unwrap();
}

pub fn sine(freq: f32, rate: u32, frames: usize, amplitude: f32) -> Vec<f32> {
    (0..frames)
        .map(|i| {
            amplitude * (2.0 * std::f32::consts::PI * freq * i as f32 / rate as f32).sin()
        })
        .collect()
}

/// Writes a 16-bit PCM WAV with the same signal on every channel.
pub fn write_pcm16(path: &Path, samples: &[f32], rate: u32, channels: u16) {
    let spec = hound::WavSpec {
        channels,
        sample_rate: rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut w = hound::WavWriter::create(path, spec).unwrap();
    for s in samples {
        let v = (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        for _ in 0..channels {
            w.write_sample(v).unwrap();
        }
    }
    w.finalize().unwrap();
}

pub struct WavInfo {
    pub rate: u32,
    pub channels: u16,
    pub frames: usize,
    pub samples: Vec<f32>,
}

pub fn read_wav(path: &Path) -> WavInfo {
    let mut r = hound::WavReader::open(path).unwrap();
    let spec = r.spec();
    let samples: Vec<f32> = r.samples::<f32>().map(|s| s.unwrap()).collect();
    WavInfo {
        rate: spec.sample_rate,
        channels: spec.channels,
        frames: samples.len() / spec.channels as usize,
        samples,
    }
}
