//! Engine registry: register engine kinds and load them from model directories.
//!
//! A model directory holds an `engine.json` manifest naming the engine kind
//! plus any files that engine needs:
//!
//! ```json
//! { "engine": "dsp", "fft_size": 1024 }
//! ```
//!
//! The whole manifest object is handed to the engine's loader.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use once_cell::sync::Lazy;
use tracing::info;

use crate::dsp::{self, DspEngine};
use crate::engine::{ConversionEngine, EngineOptions};
use crate::error::ConvertError;

/// Manifest file name inside a model directory.
pub const MANIFEST_FILE: &str = "engine.json";

/// Builds an engine from a model directory, its manifest and load options.
pub type EngineLoader = Arc<
    dyn Fn(&Path, &serde_json::Value, &EngineOptions) -> Result<Arc<dyn ConversionEngine>, String>
        + Send
        + Sync,
>;

static REGISTRY: Lazy<Mutex<HashMap<String, EngineLoader>>> = Lazy::new(|| {
    let mut engines: HashMap<String, EngineLoader> = HashMap::new();
    engines.insert(DspEngine::KIND.to_string(), Arc::new(dsp::load));
    Mutex::new(engines)
});

fn registry() -> MutexGuard<'static, HashMap<String, EngineLoader>> {
    REGISTRY.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registers a loader for an engine kind, replacing any previous one.
pub fn register_engine(kind: &str, loader: EngineLoader) {
    registry().insert(kind.to_string(), loader);
}

/// Returns the registered engine kinds, sorted.
pub fn registered_engines() -> Vec<String> {
    let mut kinds: Vec<String> = registry().keys().cloned().collect();
    kinds.sort();
    kinds
}

/// Loads the engine described by `model_dir/engine.json`.
pub fn load_engine(
    model_dir: &Path,
    opts: &EngineOptions,
) -> Result<Arc<dyn ConversionEngine>, ConvertError> {
    let fail = |reason: String| ConvertError::ModelLoadFailure {
        path: model_dir.to_path_buf(),
        reason,
    };

    if !model_dir.is_dir() {
        return Err(fail("not a directory".into()));
    }
    let manifest_path = model_dir.join(MANIFEST_FILE);
    let raw = std::fs::read_to_string(&manifest_path)
        .map_err(|e| fail(format!("read {MANIFEST_FILE}: {e}")))?;
    let manifest: serde_json::Value =
        serde_json::from_str(&raw).map_err(|e| fail(format!("parse {MANIFEST_FILE}: {e}")))?;

    let kind = manifest
        .get("engine")
        .and_then(|v| v.as_str())
        .ok_or_else(|| fail(format!("{MANIFEST_FILE} has no \"engine\" field")))?;

    // Clone the loader out so the lock is not held while loading weights.
    let loader = registry()
        .get(kind)
        .cloned()
        .ok_or_else(|| fail(format!("unknown engine {kind:?}")))?;

    let mut options = manifest.clone();
    if let Some(obj) = options.as_object_mut() {
        obj.remove("engine");
    }
    let engine = loader(model_dir, &options, opts).map_err(fail)?;
    info!(
        engine = engine.kind(),
        device = %opts.device,
        path = %model_dir.display(),
        "model loaded"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::Device;

    fn model_dir(manifest: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(MANIFEST_FILE), manifest).unwrap();
        dir
    }

    #[test]
    fn dsp_is_builtin() {
        assert!(registered_engines().contains(&"dsp".to_string()));
        let dir = model_dir(r#"{"engine": "dsp"}"#);
        let engine = load_engine(dir.path(), &EngineOptions::default()).unwrap();
        assert_eq!(engine.kind(), "dsp");
        assert_eq!(engine.target_dimension(), 2);
    }

    #[test]
    fn missing_dir_fails() {
        let err = load_engine(Path::new("/nonexistent/voxshift/models"), &EngineOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, ConvertError::ModelLoadFailure { .. }));
    }

    #[test]
    fn missing_manifest_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_engine(dir.path(), &EngineOptions::default()).err().unwrap();
        assert!(err.to_string().contains(MANIFEST_FILE));
    }

    #[test]
    fn bad_manifest_fails() {
        for manifest in ["{not json", r#"{"kind": "dsp"}"#, r#"{"engine": "hifi-gan"}"#] {
            let dir = model_dir(manifest);
            let err = load_engine(dir.path(), &EngineOptions::default()).err().unwrap();
            assert!(matches!(err, ConvertError::ModelLoadFailure { .. }), "{manifest}");
            assert!(err.is_fatal());
        }
    }

    #[test]
    fn unsupported_device_fails() {
        let dir = model_dir(r#"{"engine": "dsp"}"#);
        let opts = EngineOptions {
            device: Device::Metal,
        };
        let err = load_engine(dir.path(), &opts).err().unwrap();
        assert!(err.to_string().contains("cpu only"));
    }

    #[test]
    fn custom_engine_registration() {
        register_engine(
            "registry-test",
            Arc::new(|_: &Path, options: &serde_json::Value, _: &EngineOptions| {
                let fft_size = options.get("fft_size").and_then(|v| v.as_u64()).unwrap_or(0);
                let cfg = dsp::DspConfig {
                    fft_size: fft_size as usize,
                    ..Default::default()
                };
                DspEngine::new(cfg)
                    .map(|e| Arc::new(e) as Arc<dyn ConversionEngine>)
                    .map_err(|e| e.to_string())
            }),
        );
        assert!(registered_engines().contains(&"registry-test".to_string()));

        let dir = model_dir(r#"{"engine": "registry-test", "fft_size": 256}"#);
        assert!(load_engine(dir.path(), &EngineOptions::default()).is_ok());

        let dir = model_dir(r#"{"engine": "registry-test"}"#);
        assert!(load_engine(dir.path(), &EngineOptions::default()).is_err());
    }
}
