//! Configuration handling for tiersplit
//!
//! Configuration is stored in `config.toml` inside the platform config
//! directory (for example `~/.config/tiersplit/`), or inside the directory
//! named by `TIERSPLIT_CONFIG_DIR` when that variable is set.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Variant;

/// Environment variable overriding the config directory
pub const CONFIG_DIR_ENV: &str = "TIERSPLIT_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not determine the config directory")]
    NoConfigDir,

    #[error("Failed to parse configuration: {0}")]
    Parse(String),
}

/// Persisted user settings
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default)]
pub struct GlobalConfig {
    /// Convention used when `split` or `preview` get no `--convention`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_convention: Option<PathBuf>,

    /// Layout written when `split` gets no `--variant`; the source layout otherwise
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_variant: Option<Variant>,
}

/// Loaded configuration and where it lives
#[derive(Debug, Clone)]
pub struct Config {
    pub global: GlobalConfig,
    pub config_dir: PathBuf,
}

impl Config {
    /// Loads configuration from the default location
    pub fn load() -> Result<Self> {
        let config_dir = Self::config_dir().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&config_dir)
    }

    /// Loads configuration from a specific directory
    ///
    /// A missing file yields the default configuration.
    pub fn load_from(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(CONFIG_FILE);

        let global = if config_path.exists() {
            let content = fs::read_to_string(&config_path).with_context(|| {
                format!("Failed to read config: {}", config_path.display())
            })?;
            toml::from_str(&content)
                .map_err(|e| ConfigError::Parse(e.to_string()))
                .with_context(|| format!("Failed to parse config: {}", config_path.display()))?
        } else {
            GlobalConfig::default()
        };

        Ok(Self {
            global,
            config_dir: config_dir.to_path_buf(),
        })
    }

    /// Returns the config directory, honouring `TIERSPLIT_CONFIG_DIR`
    pub fn config_dir() -> Option<PathBuf> {
        if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
            return Some(PathBuf::from(dir));
        }

        ProjectDirs::from("org", "tiersplit", "tiersplit")
            .map(|dirs| dirs.config_dir().to_path_buf())
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join(CONFIG_FILE)
    }

    /// Saves the configuration, creating the directory if needed
    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.config_dir).with_context(|| {
            format!(
                "Failed to create config directory: {}",
                self.config_dir.display()
            )
        })?;

        let config_path = self.config_path();
        let content =
            toml::to_string_pretty(&self.global).context("Failed to serialize config")?;

        fs::write(&config_path, content)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))
    }

    /// Restores the defaults by removing the config file
    ///
    /// Returns false when there was nothing to remove.
    pub fn reset(&mut self) -> Result<bool> {
        self.global = GlobalConfig::default();

        let config_path = self.config_path();
        if !config_path.exists() {
            return Ok(false);
        }

        fs::remove_file(&config_path)
            .with_context(|| format!("Failed to remove config: {}", config_path.display()))?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config() {
        let config = GlobalConfig::default();

        assert_eq!(config.default_convention, None);
        assert_eq!(config.default_variant, None);
    }

    #[test]
    fn parse_config() {
        let toml = r#"
default_convention = "/data/conventions/bangor.json"
default_variant = "short"
"#;

        let config: GlobalConfig = toml::from_str(toml).unwrap();
        assert_eq!(
            config.default_convention,
            Some(PathBuf::from("/data/conventions/bangor.json"))
        );
        assert_eq!(config.default_variant, Some(Variant::Short));
    }

    #[test]
    fn unknown_variant_rejected() {
        let toml = r#"default_variant = "binary""#;
        assert!(toml::from_str::<GlobalConfig>(toml).is_err());
    }

    #[test]
    fn missing_file_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(dir.path()).unwrap();

        assert_eq!(config.global, GlobalConfig::default());
        assert_eq!(config.config_path(), dir.path().join("config.toml"));
    }

    #[test]
    fn save_and_reload() {
        let dir = TempDir::new().unwrap();
        let config_dir = dir.path().join("nested");

        let mut config = Config::load_from(&config_dir).unwrap();
        config.global.default_convention = Some(PathBuf::from("conv.json"));
        config.save().unwrap();

        let reloaded = Config::load_from(&config_dir).unwrap();
        assert_eq!(reloaded.global, config.global);
    }

    #[test]
    fn reset_removes_file() {
        let dir = TempDir::new().unwrap();
        let mut config = Config::load_from(dir.path()).unwrap();
        config.global.default_variant = Some(Variant::Long);
        config.save().unwrap();

        assert!(config.reset().unwrap());
        assert!(!config.config_path().exists());
        assert_eq!(config.global, GlobalConfig::default());

        assert!(!config.reset().unwrap());
    }

    #[test]
    fn malformed_file_reported() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("config.toml"), "default_variant = [").unwrap();

        let err = Config::load_from(dir.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse config"));
    }
}
