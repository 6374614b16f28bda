//! Configuration management.

use anyhow::Result;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::output::OutputFormat;

/// Overrides the config file location.
pub const CONFIG_ENV: &str = "CERTKEYS_CONFIG";

/// CLI configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Store base directory; `~` is expanded.
    pub home: Option<String>,

    /// Default output format.
    pub output_format: Option<OutputFormat>,

    /// Flag passed to mkcert builds that accept a leaf validity.
    pub validity_flag: Option<String>,

    /// Leaf validity for identities without their own.
    pub default_validity_days: Option<u32>,
}

impl Config {
    fn dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("dev", "certkeys", "certkeys")
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))
    }

    /// Get the config file path.
    pub fn path() -> Result<PathBuf> {
        if let Some(path) = std::env::var_os(CONFIG_ENV) {
            return Ok(PathBuf::from(path));
        }
        Ok(Self::dirs()?.config_dir().join("config.toml"))
    }

    /// Load configuration from file.
    pub fn load() -> Result<Self> {
        let path = Self::path()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)?;

        Ok(config)
    }

    /// Save configuration to file.
    pub fn save(&self) -> Result<()> {
        let path = Self::path()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;

        Ok(())
    }

    /// Store base directory: `override_home`, then `home`, then the
    /// platform data directory.
    pub fn resolve_home(&self, override_home: Option<&str>) -> Result<PathBuf> {
        match override_home.or(self.home.as_deref()) {
            Some(home) => Ok(PathBuf::from(shellexpand::tilde(home).into_owned())),
            None => Ok(Self::dirs()?.data_dir().join("store")),
        }
    }

    /// Minting tool settings.
    pub fn mint_config(&self) -> certkeys::MintConfig {
        let mut config = certkeys::MintConfig::new();
        if let Some(flag) = &self.validity_flag {
            config = config.validity_flag(flag.clone());
        }
        if let Some(days) = self.default_validity_days {
            config = config.default_validity_days(days);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_home_wins() {
        let config = Config {
            home: Some("/srv/certs".into()),
            ..Config::default()
        };
        assert_eq!(
            config.resolve_home(Some("/tmp/other")).unwrap(),
            PathBuf::from("/tmp/other")
        );
        assert_eq!(config.resolve_home(None).unwrap(), PathBuf::from("/srv/certs"));
    }

    #[test]
    fn parses_partial_file() {
        let config: Config = toml::from_str("output_format = \"json\"\n").unwrap();
        assert_eq!(config.output_format, Some(OutputFormat::Json));
        assert!(config.home.is_none());
        assert!(config.mint_config().validity_flag.is_none());
    }
}
