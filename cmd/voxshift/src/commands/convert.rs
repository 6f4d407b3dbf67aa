//! The `convert` command.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use voxshift_cli::Profile;
use voxshift_convert::{Device, PitchAlgorithm, Session};

use super::{get_convert_config, output, print_error, print_success, print_warning};
use crate::Cli;

/// Conversion options. Every flag is optional and overrides the profile.
#[derive(Args, Debug, Clone, Default)]
pub struct ConvertArgs {
    /// Input directory
    #[arg(short = 'i', long)]
    pub inputs: Option<PathBuf>,
    /// Output directory (created if absent)
    #[arg(short = 'o', long)]
    pub outputs: Option<PathBuf>,
    /// Model directory containing engine.json
    #[arg(short = 'm', long)]
    pub models: Option<PathBuf>,
    /// Pitch shift in semitones
    #[arg(short = 'p', long, allow_hyphen_values = true)]
    pub pitch_shift: Option<f32>,
    /// Target voice reference recording
    #[arg(short = 't', long)]
    pub target: Option<PathBuf>,
    /// Target index file ("none" encodes the reference instead)
    #[arg(short = 'x', long)]
    pub index: Option<String>,
    /// Compute device: cpu, cuda[:N] or metal
    #[arg(short = 'd', long)]
    pub device: Option<Device>,
    /// Blend between source (0) and target (1) voice
    #[arg(short = 'a', long, allow_hyphen_values = true)]
    pub alpha: Option<f32>,
    /// Peak-normalize every output (`--normalize false` overrides a profile)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub normalize: Option<bool>,
    /// Chunk size in 16kHz samples (0 converts whole files)
    #[arg(short = 'c', long)]
    pub chunk: Option<usize>,
    /// Re-normalize segment statistics to the target's (`--adain false` overrides a profile)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub adain: Option<bool>,
    /// Pitch estimation algorithm: default, dio or harvest
    #[arg(short = 'e', long)]
    pub pitch_estimation: Option<PitchAlgorithm>,
    /// Chunks converted in parallel
    #[arg(long)]
    pub chunk_workers: Option<usize>,
    /// Write as many channels as the input has (`--preserve-channels false` overrides a profile)
    #[arg(long, value_name = "BOOL", num_args = 0..=1, default_missing_value = "true")]
    pub preserve_channels: Option<bool>,
}

impl ConvertArgs {
    /// Flags given on the command line, as a profile.
    pub fn to_profile(&self) -> Profile {
        Profile {
            inputs: self.inputs.clone(),
            outputs: self.outputs.clone(),
            models: self.models.clone(),
            pitch_shift: self.pitch_shift,
            target: self.target.clone(),
            index: self.index.clone(),
            device: self.device,
            alpha: self.alpha,
            normalize: self.normalize,
            chunk: self.chunk,
            adain: self.adain,
            pitch_estimation: self.pitch_estimation,
            chunk_workers: self.chunk_workers,
            preserve_channels: self.preserve_channels,
        }
    }
}

/// Convert every recording in the input directory toward the target voice.
///
/// Files are converted one at a time; a file that cannot be read or
/// converted is reported and the batch continues. Ctrl-C abandons the
/// current file and skips the rest.
#[derive(Args)]
pub struct ConvertCommand {
    #[command(flatten)]
    args: ConvertArgs,
}

impl ConvertCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let mut cfg = get_convert_config(cli)?;
        self.args.to_profile().apply(&mut cfg);

        let opened = cfg.clone();
        let session = match tokio::task::spawn_blocking(move || Session::open(&opened)).await? {
            Ok(session) => session,
            Err(e) => {
                print_error(&e.to_string());
                return Err(e.into());
            }
        };

        let cancel = CancellationToken::new();
        let on_signal = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("interrupted, cancelling");
                on_signal.cancel();
            }
        });

        let (inputs, outputs) = (cfg.inputs.clone(), cfg.outputs.clone());
        let token = cancel.clone();
        let report =
            tokio::task::spawn_blocking(move || session.run(&inputs, &outputs, &token)).await??;

        output(cli).write(&report)?;

        if report.has_failures() {
            anyhow::bail!(
                "{} failed, {} cancelled of {} files",
                report.failed,
                report.cancelled,
                report.files.len()
            );
        }
        if report.files.is_empty() {
            print_warning(&format!("no input files in {}", cfg.inputs.display()));
        } else {
            info!(converted = report.converted, "done");
            print_success(&format!(
                "Converted {} files into {}",
                report.converted,
                cfg.outputs.display()
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct TestCli {
        #[command(flatten)]
        args: ConvertArgs,
    }

    #[test]
    fn flags_become_profile() {
        let cli = TestCli::parse_from([
            "voxshift", "-i", "in", "-p", "-3.5", "-x", "voice.idx", "-d", "cuda:1", "-c",
            "8000", "-e", "HARVEST", "--adain",
        ]);
        let p = cli.args.to_profile();
        assert_eq!(p.inputs, Some(PathBuf::from("in")));
        assert_eq!(p.pitch_shift, Some(-3.5));
        assert_eq!(p.index.as_deref(), Some("voice.idx"));
        assert_eq!(p.device, Some(Device::Cuda(1)));
        assert_eq!(p.chunk, Some(8000));
        assert_eq!(p.pitch_estimation, Some(PitchAlgorithm::Harvest));
        assert_eq!(p.adain, Some(true));
        assert_eq!(p.normalize, None);
        assert_eq!(p.outputs, None);
    }

    #[test]
    fn bool_flags_can_switch_profile_off() {
        let cli = TestCli::parse_from([
            "voxshift", "--normalize", "false", "--preserve-channels", "--adain=false",
        ]);
        let p = cli.args.to_profile();
        assert_eq!(p.normalize, Some(false));
        assert_eq!(p.preserve_channels, Some(true));
        assert_eq!(p.adain, Some(false));

        let mut cfg = voxshift_convert::ConvertConfig {
            normalize: true,
            adain: true,
            ..Default::default()
        };
        p.apply(&mut cfg);
        assert!(!cfg.normalize);
        assert!(!cfg.adain);
        assert!(cfg.preserve_channels);
    }

    #[test]
    fn rejects_unknown_algorithm() {
        assert!(TestCli::try_parse_from(["voxshift", "-e", "crepe"]).is_err());
    }
}
