//! Configuration management for CLI tools.
//!
//! Configuration is stored in ~/.voxshift/{app_name}/config.yaml and holds
//! named profiles, managed like kubectl contexts. A profile only records the
//! options it sets; everything else falls back to the built-in defaults.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use voxshift_convert::{ConvertConfig, Device, PitchAlgorithm};

/// Default base configuration directory name.
pub const DEFAULT_BASE_DIR: &str = ".voxshift";
/// Default configuration filename.
pub const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Application name (not serialized).
    #[serde(skip)]
    pub app_name: String,

    /// Name of the currently active profile.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub current_profile: String,

    /// Map of profile name to profile overrides.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub profiles: BTreeMap<String, Profile>,

    /// Path to the config file (not serialized).
    #[serde(skip)]
    config_path: PathBuf,
}

/// Conversion options saved under a name. Unset fields keep their defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub models: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_shift: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub index: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<Device>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub normalize: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adain: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pitch_estimation: Option<PitchAlgorithm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_workers: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preserve_channels: Option<bool>,
}

impl Profile {
    /// Overwrites the fields of `cfg` this profile sets.
    pub fn apply(&self, cfg: &mut ConvertConfig) {
        fn set<T: Clone>(dst: &mut T, src: &Option<T>) {
            if let Some(v) = src {
                *dst = v.clone();
            }
        }
        set(&mut cfg.inputs, &self.inputs);
        set(&mut cfg.outputs, &self.outputs);
        set(&mut cfg.models, &self.models);
        set(&mut cfg.pitch_shift, &self.pitch_shift);
        set(&mut cfg.target, &self.target);
        set(&mut cfg.index, &self.index);
        set(&mut cfg.device, &self.device);
        set(&mut cfg.alpha, &self.alpha);
        set(&mut cfg.normalize, &self.normalize);
        set(&mut cfg.chunk, &self.chunk);
        set(&mut cfg.adain, &self.adain);
        set(&mut cfg.pitch_estimation, &self.pitch_estimation);
        set(&mut cfg.chunk_workers, &self.chunk_workers);
        set(&mut cfg.preserve_channels, &self.preserve_channels);
    }

    /// Merges `other` into this profile; fields set in `other` win.
    pub fn merge(&mut self, other: Profile) {
        fn take<T>(dst: &mut Option<T>, src: Option<T>) {
            if src.is_some() {
                *dst = src;
            }
        }
        take(&mut self.inputs, other.inputs);
        take(&mut self.outputs, other.outputs);
        take(&mut self.models, other.models);
        take(&mut self.pitch_shift, other.pitch_shift);
        take(&mut self.target, other.target);
        take(&mut self.index, other.index);
        take(&mut self.device, other.device);
        take(&mut self.alpha, other.alpha);
        take(&mut self.normalize, other.normalize);
        take(&mut self.chunk, other.chunk);
        take(&mut self.adain, other.adain);
        take(&mut self.pitch_estimation, other.pitch_estimation);
        take(&mut self.chunk_workers, other.chunk_workers);
        take(&mut self.preserve_channels, other.preserve_channels);
    }
}

impl Config {
    /// Gets the default config directory.
    pub fn default_config_dir(app_name: &str) -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(DEFAULT_BASE_DIR).join(app_name))
    }

    /// Gets the default config file path.
    pub fn default_config_path(app_name: &str) -> Option<PathBuf> {
        Self::default_config_dir(app_name).map(|dir| dir.join(DEFAULT_CONFIG_FILE))
    }

    /// Returns the config file path.
    pub fn path(&self) -> &Path {
        &self.config_path
    }

    /// Saves the configuration to disk.
    pub fn save(&self) -> anyhow::Result<()> {
        let content = serde_yaml::to_string(self)?;
        std::fs::write(&self.config_path, content)?;
        Ok(())
    }

    /// Adds or replaces a profile.
    pub fn add_profile(&mut self, name: &str, profile: Profile) -> anyhow::Result<()> {
        if name.trim().is_empty() {
            anyhow::bail!("profile name must not be empty");
        }
        self.profiles.insert(name.to_string(), profile);
        self.save()
    }

    /// Deletes a profile.
    pub fn delete_profile(&mut self, name: &str) -> anyhow::Result<()> {
        if self.profiles.remove(name).is_none() {
            anyhow::bail!("profile '{}' not found", name);
        }
        if self.current_profile == name {
            self.current_profile.clear();
        }
        self.save()
    }

    /// Sets the current profile.
    pub fn use_profile(&mut self, name: &str) -> anyhow::Result<()> {
        if !self.profiles.contains_key(name) {
            anyhow::bail!("profile '{}' not found", name);
        }
        self.current_profile = name.to_string();
        self.save()
    }

    /// Gets a specific profile.
    pub fn get_profile(&self, name: &str) -> Option<&Profile> {
        self.profiles.get(name)
    }

    /// Gets the current profile.
    pub fn get_current_profile(&self) -> Option<&Profile> {
        if self.current_profile.is_empty() {
            return None;
        }
        self.profiles.get(&self.current_profile)
    }

    /// Resolves the profile by name, or the current profile if no name is given.
    ///
    /// Naming a profile that does not exist is an error.
    pub fn resolve_profile(&self, name: Option<&str>) -> anyhow::Result<Option<&Profile>> {
        match name {
            Some(n) if !n.is_empty() => self
                .get_profile(n)
                .map(Some)
                .ok_or_else(|| anyhow::anyhow!("profile '{}' not found", n)),
            _ => Ok(self.get_current_profile()),
        }
    }

    /// Lists all profile names, sorted.
    pub fn list_profiles(&self) -> Vec<&str> {
        self.profiles.keys().map(|s| s.as_str()).collect()
    }

    /// Builds a session config: defaults overlaid with the resolved profile.
    pub fn convert_config(&self, profile: Option<&str>) -> anyhow::Result<ConvertConfig> {
        let mut cfg = ConvertConfig::default();
        if let Some(p) = self.resolve_profile(profile)? {
            p.apply(&mut cfg);
        }
        Ok(cfg)
    }
}

/// Loads configuration for the specified app, creating an empty file if
/// none exists.
pub fn load_config(app_name: &str, custom_path: Option<&str>) -> anyhow::Result<Config> {
    let config_path = match custom_path {
        Some(p) => PathBuf::from(p),
        None => Config::default_config_path(app_name)
            .ok_or_else(|| anyhow::anyhow!("cannot determine config path"))?,
    };

    if let Some(parent) = config_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let mut cfg = if config_path.exists() {
        let content = std::fs::read_to_string(&config_path)?;
        if content.trim().is_empty() {
            Config::default()
        } else {
            serde_yaml::from_str(&content)?
        }
    } else {
        let cfg = Config::default();
        std::fs::write(&config_path, serde_yaml::to_string(&cfg)?)?;
        cfg
    };

    cfg.app_name = app_name.to_string();
    cfg.config_path = config_path;

    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config() -> (tempfile::TempDir, Config) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("voxshift/config.yaml");
        let cfg = load_config("voxshift", Some(path.to_str().unwrap())).unwrap();
        (dir, cfg)
    }

    #[test]
    fn test_default_paths() {
        if let Some(path) = Config::default_config_path("voxshift") {
            assert!(path.ends_with(".voxshift/voxshift/config.yaml"));
        }
    }

    #[test]
    fn test_load_creates_file() {
        let (_dir, cfg) = temp_config();
        assert!(cfg.path().exists());
        assert!(cfg.profiles.is_empty());
        assert_eq!(cfg.app_name, "voxshift");
    }

    #[test]
    fn test_profile_lifecycle() {
        let (_dir, mut cfg) = temp_config();
        let profile = Profile {
            chunk: Some(8000),
            pitch_estimation: Some(PitchAlgorithm::Harvest),
            ..Default::default()
        };
        cfg.add_profile("studio", profile.clone()).unwrap();
        cfg.add_profile("field", Profile::default()).unwrap();
        cfg.use_profile("studio").unwrap();
        assert_eq!(cfg.list_profiles(), ["field", "studio"]);

        let reloaded = load_config("voxshift", cfg.path().to_str()).unwrap();
        assert_eq!(reloaded.current_profile, "studio");
        assert_eq!(reloaded.get_profile("studio"), Some(&profile));

        cfg.delete_profile("studio").unwrap();
        assert!(cfg.current_profile.is_empty());
        assert_eq!(cfg.list_profiles(), ["field"]);
        assert!(cfg.delete_profile("studio").is_err());
        assert!(cfg.use_profile("studio").is_err());
    }

    #[test]
    fn test_convert_config_precedence() {
        let (_dir, mut cfg) = temp_config();
        cfg.add_profile(
            "gpu",
            Profile {
                device: Some(Device::Cuda(1)),
                alpha: Some(0.7),
                ..Default::default()
            },
        )
        .unwrap();

        let plain = cfg.convert_config(None).unwrap();
        assert_eq!(plain, ConvertConfig::default());

        let gpu = cfg.convert_config(Some("gpu")).unwrap();
        assert_eq!(gpu.device, Device::Cuda(1));
        assert_eq!(gpu.alpha, 0.7);
        assert_eq!(gpu.index, "NONE");

        cfg.use_profile("gpu").unwrap();
        assert_eq!(cfg.convert_config(None).unwrap().device, Device::Cuda(1));
        assert!(cfg.convert_config(Some("missing")).is_err());
    }

    #[test]
    fn test_profile_merge() {
        let mut base = Profile {
            chunk: Some(4000),
            normalize: Some(true),
            ..Default::default()
        };
        base.merge(Profile {
            chunk: Some(16000),
            ..Default::default()
        });
        assert_eq!(base.chunk, Some(16000));
        assert_eq!(base.normalize, Some(true));
    }

    #[test]
    fn test_profile_yaml_is_sparse() {
        let p = Profile {
            pitch_shift: Some(-2.0),
            ..Default::default()
        };
        let yaml = serde_yaml::to_string(&p).unwrap();
        assert_eq!(yaml.trim(), "pitch_shift: -2.0");
    }
}
