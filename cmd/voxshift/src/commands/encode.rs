//! The `encode` command.

use std::path::PathBuf;

use clap::Args;
use serde::Serialize;
use voxshift_convert::{Device, TargetEncoder, index, load_engine};

use super::{get_convert_config, output, print_success};
use crate::Cli;

/// Encode a reference recording into a target index.
///
/// The index can be passed to `convert --index` to skip encoding the
/// reference on every run. It is only valid for the engine that wrote it.
#[derive(Args)]
pub struct EncodeCommand {
    /// Target voice reference recording
    #[arg(short = 't', long)]
    target: Option<PathBuf>,
    /// Model directory containing engine.json
    #[arg(short = 'm', long)]
    models: Option<PathBuf>,
    /// Compute device: cpu, cuda[:N] or metal
    #[arg(short = 'd', long)]
    device: Option<Device>,
    /// Index file to write
    #[arg(long)]
    out: PathBuf,
}

#[derive(Serialize)]
struct EncodeResult {
    engine: String,
    dimension: usize,
    index: PathBuf,
}

impl EncodeCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_convert_config(cli)?;
        if let Some(target) = &self.target {
            cfg.target = target.clone();
        }
        if let Some(models) = &self.models {
            cfg.models = models.clone();
        }
        if let Some(device) = self.device {
            cfg.device = device;
        }

        let out = self.out.clone();
        let target = tokio::task::spawn_blocking(move || {
            let engine = load_engine(&cfg.models, &cfg.engine_options())?;
            let target = TargetEncoder::new(engine.as_ref()).encode_file(&cfg.target)?;
            index::save_file(&target, &out)?;
            Ok::<_, voxshift_convert::ConvertError>(target)
        })
        .await??;

        output(cli).write(&EncodeResult {
            engine: target.engine().to_string(),
            dimension: target.dimension(),
            index: self.out.clone(),
        })?;
        print_success(&format!("Index written to {}", self.out.display()));
        Ok(())
    }
}
