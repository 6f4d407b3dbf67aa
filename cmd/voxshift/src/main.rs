//! voxshift - batch voice conversion from the command line.

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

use commands::{ConfigCommand, ConvertCommand, EncodeCommand};

/// voxshift - convert directories of recordings toward a target voice.
///
/// A model directory holds an engine.json manifest naming the conversion
/// engine; the built-in "dsp" engine needs no weights. The target voice comes
/// from a reference recording or from an index written by `voxshift encode`.
///
/// Option profiles are stored in ~/.voxshift/voxshift/ and selected like
/// kubectl contexts.
#[derive(Parser)]
#[command(name = "voxshift")]
#[command(about = "Streaming voice conversion tool")]
#[command(version)]
pub struct Cli {
    /// Config file (default is ~/.voxshift/voxshift/config.yaml)
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Profile name to use
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Output as JSON (for piping)
    #[arg(long, global = true)]
    pub json: bool,

    /// Verbose output
    #[arg(short = 'v', long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Convert every file in the input directory
    Convert(ConvertCommand),
    /// Write a target index from a reference recording
    Encode(EncodeCommand),
    /// Manage CLI configuration
    Config(ConfigCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over -v.
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match &cli.command {
        Commands::Convert(cmd) => cmd.run(&cli).await,
        Commands::Encode(cmd) => cmd.run(&cli).await,
        Commands::Config(cmd) => cmd.run(&cli).await,
    }
}
