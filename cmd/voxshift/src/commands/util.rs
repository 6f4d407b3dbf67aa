//! Utility functions for CLI commands.

use voxshift_cli::{Config, Output, OutputFormat, load_config};
use voxshift_convert::ConvertConfig;

use crate::Cli;

const APP_NAME: &str = "voxshift";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Resolves defaults plus the selected profile (`--profile` or the current one).
pub fn get_convert_config(cli: &Cli) -> anyhow::Result<ConvertConfig> {
    get_config(cli)?.convert_config(cli.profile.as_deref())
}

/// Output for command results, honouring `--json`.
pub fn output(cli: &Cli) -> Output {
    Output::new(OutputFormat::from_json_flag(cli.json), None)
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}

/// Prints error message.
pub fn print_error(msg: &str) {
    eprintln!("\x1b[31m✗\x1b[0m {}", msg);
}

/// Prints warning message.
pub fn print_warning(msg: &str) {
    eprintln!("\x1b[33m⚠\x1b[0m {}", msg);
}
