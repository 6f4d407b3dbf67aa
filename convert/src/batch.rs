//! Batch conversion of a directory of recordings.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::config::ConvertConfig;
use crate::convertor::StreamingConvertor;
use crate::error::ConvertError;
use crate::params::ConversionParams;
use crate::registry::load_engine;
use crate::target::{TargetEncoder, TargetRepresentation};

/// Outcome of one file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileStatus {
    Converted,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileReport {
    pub input: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub duration_ms: u64,
}

/// Per-file results of a batch run, in input order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub files: Vec<FileReport>,
    pub converted: usize,
    pub failed: usize,
    pub cancelled: usize,
}

impl BatchReport {
    fn push(&mut self, file: FileReport) {
        match file.status {
            FileStatus::Converted => self.converted += 1,
            FileStatus::Failed => self.failed += 1,
            FileStatus::Cancelled => self.cancelled += 1,
        }
        self.files.push(file);
    }

    /// True if any file failed or was cancelled.
    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.cancelled > 0
    }
}

/// A loaded engine plus an acquired target, ready to convert files.
pub struct Session {
    convertor: StreamingConvertor,
    target: TargetRepresentation,
    params: ConversionParams,
}

impl Session {
    pub fn new(
        convertor: StreamingConvertor,
        target: TargetRepresentation,
        params: ConversionParams,
    ) -> Self {
        Self {
            convertor,
            target,
            params,
        }
    }

    /// Loads the engine and acquires the target voice. Every error here is
    /// session-level.
    pub fn open(cfg: &ConvertConfig) -> Result<Self, ConvertError> {
        cfg.validate()?;
        let engine = load_engine(&cfg.models, &cfg.engine_options())?;
        let target = TargetEncoder::new(engine.as_ref()).acquire(&cfg.target_source())?;
        info!(
            engine = engine.kind(),
            dimension = target.dimension(),
            "target ready"
        );
        let convertor = StreamingConvertor::new(engine, cfg.options());
        Ok(Self::new(convertor, target, cfg.params()))
    }

    pub fn target(&self) -> &TargetRepresentation {
        &self.target
    }

    pub fn convertor(&self) -> &StreamingConvertor {
        &self.convertor
    }

    /// Converts every file in `input_dir` into `output_dir`.
    ///
    /// Fails only if the input directory cannot be listed or the output
    /// directory cannot be created; per-file errors land in the report.
    pub fn run(
        &self,
        input_dir: &Path,
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, ConvertError> {
        let inputs = list_inputs(input_dir)?;
        std::fs::create_dir_all(output_dir).map_err(|e| ConvertError::WriteFailure {
            path: output_dir.to_path_buf(),
            reason: e.to_string(),
        })?;
        info!(
            files = inputs.len(),
            input = %input_dir.display(),
            output = %output_dir.display(),
            "starting batch"
        );
        Ok(self.run_files(&inputs, output_dir, cancel))
    }

    /// Converts the given files one at a time, each under a child token.
    pub fn run_files(
        &self,
        inputs: &[PathBuf],
        output_dir: &Path,
        cancel: &CancellationToken,
    ) -> BatchReport {
        let mut report = BatchReport::default();
        for input in inputs {
            let start = Instant::now();
            let token = cancel.child_token();
            let result = self.convertor.convert_file(
                input,
                output_dir,
                &self.target,
                &self.params,
                &token,
            );
            let duration_ms = start.elapsed().as_millis() as u64;

            let file = match result {
                Ok(output) => FileReport {
                    input: input.clone(),
                    output: Some(output),
                    status: FileStatus::Converted,
                    error: None,
                    duration_ms,
                },
                Err(e) => {
                    let status = if matches!(e, ConvertError::Cancelled { .. }) {
                        FileStatus::Cancelled
                    } else {
                        warn!(input = %input.display(), error = %e, "file failed");
                        FileStatus::Failed
                    };
                    FileReport {
                        input: input.clone(),
                        output: None,
                        status,
                        error: Some(e.to_string()),
                        duration_ms,
                    }
                }
            };
            report.push(file);
        }
        info!(
            converted = report.converted,
            failed = report.failed,
            cancelled = report.cancelled,
            "batch finished"
        );
        report
    }
}

/// Lists regular, non-hidden files in `dir`, sorted by name.
pub fn list_inputs(dir: &Path) -> Result<Vec<PathBuf>, ConvertError> {
    let unreadable = |e: std::io::Error| ConvertError::UnreadableInput {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    };
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(unreadable)? {
        let entry = entry.map_err(unreadable)?;
        let path = entry.path();
        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !path.is_file() {
            continue;
        }
        files.push(path);
    }
    files.sort();
    Ok(files)
}
