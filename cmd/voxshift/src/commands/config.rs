//! Configuration management commands.

use clap::{Args, Subcommand};

use super::convert::ConvertArgs;
use super::{get_config, output, print_success};
use crate::Cli;

/// Manage CLI configuration.
///
/// Profiles save conversion options under a name, similar to kubectl's
/// context management. Flags given to `convert` override the profile.
///
/// Configuration is stored in ~/.voxshift/voxshift/config.yaml
#[derive(Args)]
pub struct ConfigCommand {
    #[command(subcommand)]
    command: ConfigSubcommand,
}

#[derive(Subcommand)]
enum ConfigSubcommand {
    /// Add a profile, or update the options of an existing one
    #[command(name = "add-profile")]
    AddProfile {
        /// Profile name
        name: String,
        #[command(flatten)]
        options: ConvertArgs,
    },
    /// Delete a profile
    #[command(name = "delete-profile")]
    DeleteProfile {
        /// Profile name
        name: String,
    },
    /// Set the current profile
    #[command(name = "use-profile")]
    UseProfile {
        /// Profile name
        name: String,
    },
    /// Display the current profile
    #[command(name = "get-profile")]
    GetProfile,
    /// List all profiles
    #[command(name = "list-profiles", alias = "get-profiles")]
    ListProfiles,
    /// View the resolved conversion options
    View,
}

impl ConfigCommand {
    pub async fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        match &self.command {
            ConfigSubcommand::AddProfile { name, options } => {
                let mut cfg = get_config(cli)?;
                let mut profile = cfg.get_profile(name).cloned().unwrap_or_default();
                profile.merge(options.to_profile());
                cfg.add_profile(name, profile)?;
                print_success(&format!("Profile \"{}\" saved", name));
                Ok(())
            }

            ConfigSubcommand::DeleteProfile { name } => {
                let mut cfg = get_config(cli)?;
                cfg.delete_profile(name)?;
                print_success(&format!("Profile \"{}\" deleted", name));
                Ok(())
            }

            ConfigSubcommand::UseProfile { name } => {
                let mut cfg = get_config(cli)?;
                cfg.use_profile(name)?;
                print_success(&format!("Switched to profile \"{}\"", name));
                Ok(())
            }

            ConfigSubcommand::GetProfile => {
                let cfg = get_config(cli)?;
                if cfg.current_profile.is_empty() {
                    println!("No current profile set");
                } else {
                    println!("{}", cfg.current_profile);
                }
                Ok(())
            }

            ConfigSubcommand::ListProfiles => {
                let cfg = get_config(cli)?;

                if cfg.list_profiles().is_empty() {
                    println!("No profiles configured");
                    return Ok(());
                }

                println!("{:<8} {:<20} {:<24} {}", "CURRENT", "NAME", "MODELS", "CHUNK");
                for name in cfg.list_profiles() {
                    let Some(profile) = cfg.get_profile(name) else {
                        continue;
                    };
                    let current = if name == cfg.current_profile { "*" } else { "" };
                    let models = profile
                        .models
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "(default)".to_string());
                    let chunk = profile
                        .chunk
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "(default)".to_string());
                    println!("{:<8} {:<20} {:<24} {}", current, name, models, chunk);
                }
                Ok(())
            }

            ConfigSubcommand::View => {
                let cfg = get_config(cli)?;
                eprintln!("Config file: {}", cfg.path().display());
                let profile = cli.profile.as_deref().unwrap_or(&cfg.current_profile);
                if !profile.is_empty() {
                    eprintln!("Profile: {}", profile);
                }
                let resolved = cfg.convert_config(cli.profile.as_deref())?;
                output(cli).write(&resolved)
            }
        }
    }
}
