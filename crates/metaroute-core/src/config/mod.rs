//! Configuration management with file persistence

mod catalog;

pub use catalog::AgentCatalog;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::analytics::AnalyticsConfig;
use crate::error::Error;
use crate::routing::{DEFAULT_MAX_DEPTH, LogOutput, LoggerConfig};

/// Metaroute configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggerConfig,
    pub analytics: AnalyticsConfig,
    pub routing: RoutingConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RoutingConfig {
    pub max_delegation_depth: usize,
    pub catalog_file: PathBuf,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            max_delegation_depth: DEFAULT_MAX_DEPTH,
            catalog_file: PathBuf::from("agents.toml"),
        }
    }
}

/// Keys accepted by [`Config::get`] and [`Config::set`]
pub const CONFIG_KEYS: &[&str] = &[
    "logging.enabled",
    "logging.output",
    "logging.log_file",
    "logging.debug_mode",
    "logging.colored",
    "analytics.enabled",
    "analytics.storage_file",
    "analytics.max_events",
    "analytics.retention_days",
    "analytics.auto_prune",
    "routing.max_delegation_depth",
    "routing.catalog_file",
];

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> anyhow::Result<PathBuf> {
        let dir = if let Ok(custom_dir) = env::var("METAROUTE_CONFIG_DIR") {
            PathBuf::from(custom_dir)
        } else {
            dirs::config_dir()
                .ok_or_else(|| anyhow!("Could not determine config directory"))?
                .join("metaroute")
        };
        Ok(dir)
    }

    /// Get the config file path
    pub fn config_path() -> anyhow::Result<PathBuf> {
        Ok(Self::config_dir()?.join("config.toml"))
    }

    /// Load configuration from file, or defaults if it doesn't exist
    pub fn load() -> anyhow::Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            config.validate()?;
            Ok(config)
        } else {
            // Return default config without creating file
            Ok(Config::default())
        }
    }

    /// Save configuration to file
    pub fn save(&self) -> anyhow::Result<()> {
        self.validate()?;

        let dir = Self::config_dir()?;
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create config directory: {}", dir.display()))?;

        let path = Self::config_path()?;
        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(&path, contents)
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.analytics.max_events == 0 {
            return Err(config_error("analytics.max_events must be at least 1"));
        }
        if self.analytics.retention_days == 0 {
            return Err(config_error("analytics.retention_days must be at least 1"));
        }
        if self.routing.max_delegation_depth == 0 {
            return Err(config_error("routing.max_delegation_depth must be at least 1"));
        }
        Ok(())
    }

    /// Resolve a configured path against the config directory when relative
    pub fn resolve_path(&self, path: &Path) -> anyhow::Result<PathBuf> {
        if path.is_absolute() {
            Ok(path.to_path_buf())
        } else {
            Ok(Self::config_dir()?.join(path))
        }
    }

    /// Get a configuration value by key
    pub fn get(&self, key: &str) -> anyhow::Result<String> {
        match key {
            // Logging settings
            "logging.enabled" => Ok(self.logging.enabled.to_string()),
            "logging.output" => Ok(self.logging.output.to_string()),
            "logging.log_file" => Ok(self.logging.log_file.display().to_string()),
            "logging.debug_mode" => Ok(self.logging.debug_mode.to_string()),
            "logging.colored" => Ok(self.logging.colored.to_string()),

            // Analytics settings
            "analytics.enabled" => Ok(self.analytics.enabled.to_string()),
            "analytics.storage_file" => Ok(self.analytics.storage_file.display().to_string()),
            "analytics.max_events" => Ok(self.analytics.max_events.to_string()),
            "analytics.retention_days" => Ok(self.analytics.retention_days.to_string()),
            "analytics.auto_prune" => Ok(self.analytics.auto_prune.to_string()),

            // Routing settings
            "routing.max_delegation_depth" => Ok(self.routing.max_delegation_depth.to_string()),
            "routing.catalog_file" => Ok(self.routing.catalog_file.display().to_string()),

            _ => Err(config_error(format!("Unknown configuration key: {}", key))),
        }
    }

    /// Set a configuration value by key
    pub fn set(&mut self, key: &str, value: &str) -> anyhow::Result<()> {
        match key {
            // Logging settings
            "logging.enabled" => self.logging.enabled = parse_bool(key, value)?,
            "logging.output" => {
                self.logging.output = value.parse::<LogOutput>().map_err(config_error)?;
            }
            "logging.log_file" => self.logging.log_file = parse_path(key, value)?,
            "logging.debug_mode" => self.logging.debug_mode = parse_bool(key, value)?,
            "logging.colored" => self.logging.colored = parse_bool(key, value)?,

            // Analytics settings
            "analytics.enabled" => self.analytics.enabled = parse_bool(key, value)?,
            "analytics.storage_file" => self.analytics.storage_file = parse_path(key, value)?,
            "analytics.max_events" => {
                let max: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_events value: {}", value))?;
                if max == 0 {
                    return Err(config_error("max_events must be at least 1"));
                }
                self.analytics.max_events = max;
            }
            "analytics.retention_days" => {
                let days: u32 = value
                    .parse()
                    .with_context(|| format!("Invalid retention_days value: {}", value))?;
                if days == 0 {
                    return Err(config_error("retention_days must be at least 1"));
                }
                self.analytics.retention_days = days;
            }
            "analytics.auto_prune" => self.analytics.auto_prune = parse_bool(key, value)?,

            // Routing settings
            "routing.max_delegation_depth" => {
                let depth: usize = value
                    .parse()
                    .with_context(|| format!("Invalid max_delegation_depth value: {}", value))?;
                if depth == 0 {
                    return Err(config_error("max_delegation_depth must be at least 1"));
                }
                self.routing.max_delegation_depth = depth;
            }
            "routing.catalog_file" => self.routing.catalog_file = parse_path(key, value)?,

            _ => {
                return Err(config_error(format!("Unknown configuration key: {}", key)));
            }
        }
        Ok(())
    }

    /// List all configuration keys and their values
    pub fn list(&self) -> anyhow::Result<Vec<(String, String)>> {
        CONFIG_KEYS
            .iter()
            .map(|key| {
                let value = self.get(key)?;
                Ok((key.to_string(), value))
            })
            .collect()
    }

    /// Reset configuration to defaults
    pub fn reset() -> anyhow::Result<()> {
        let path = Self::config_path()?;
        if path.exists() {
            fs::remove_file(&path)
                .with_context(|| format!("Failed to remove config file: {}", path.display()))?;
        }
        Ok(())
    }
}

fn config_error(message: impl Into<String>) -> anyhow::Error {
    Error::ConfigError(message.into()).into()
}

fn parse_bool(key: &str, value: &str) -> anyhow::Result<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(config_error(format!("Invalid boolean for {}: {}", key, value))),
    }
}

fn parse_path(key: &str, value: &str) -> anyhow::Result<PathBuf> {
    if value.trim().is_empty() {
        return Err(config_error(format!("{} must not be empty", key)));
    }
    Ok(PathBuf::from(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();

        assert!(config.logging.enabled);
        assert_eq!(config.logging.output, LogOutput::Console);
        assert_eq!(config.logging.log_file, PathBuf::from("routing.log"));
        assert!(!config.logging.debug_mode);
        assert!(!config.logging.colored);

        assert!(config.analytics.enabled);
        assert_eq!(config.analytics.storage_file, PathBuf::from("analytics.json"));
        assert_eq!(config.analytics.max_events, 10_000);
        assert_eq!(config.analytics.retention_days, 90);
        assert!(config.analytics.auto_prune);

        assert_eq!(config.routing.max_delegation_depth, 3);
        assert_eq!(config.routing.catalog_file, PathBuf::from("agents.toml"));
    }

    #[test]
    fn test_partial_file_falls_back_to_defaults() {
        let config: Config = toml::from_str(
            r#"
            [logging]
            output = "file"
            debug_mode = true

            [analytics]
            max_events = 50
            "#,
        )
        .unwrap();

        assert_eq!(config.logging.output, LogOutput::File);
        assert!(config.logging.debug_mode);
        assert_eq!(config.logging.log_file, PathBuf::from("routing.log"));
        assert_eq!(config.analytics.max_events, 50);
        assert_eq!(config.analytics.retention_days, 90);
        assert_eq!(config.routing.max_delegation_depth, 3);
    }

    #[test]
    fn test_load_from_missing_file_is_default() {
        let dir = TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("config.toml")).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_from_rejects_invalid_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(&path, "[routing]\nmax_delegation_depth = 0\n").unwrap();
        assert!(Config::load_from(&path).is_err());

        fs::write(&path, "[logging]\noutput = \"syslog\"\n").unwrap();
        assert!(Config::load_from(&path).is_err());
    }

    #[test]
    fn test_roundtrip_through_toml() {
        let mut config = Config::default();
        config.set("logging.output", "disabled").unwrap();
        config.set("analytics.retention_days", "30").unwrap();

        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_get_set() {
        let mut config = Config::default();

        config.set("logging.output", "FILE").unwrap();
        assert_eq!(config.get("logging.output").unwrap(), "file");

        config.set("logging.colored", "yes").unwrap();
        assert_eq!(config.get("logging.colored").unwrap(), "true");

        config.set("analytics.max_events", "250").unwrap();
        assert_eq!(config.get("analytics.max_events").unwrap(), "250");

        config.set("routing.max_delegation_depth", "5").unwrap();
        assert_eq!(config.routing.max_delegation_depth, 5);
    }

    #[test]
    fn test_set_rejects_bad_values() {
        let mut config = Config::default();
        assert!(config.set("logging.output", "syslog").is_err());
        assert!(config.set("logging.enabled", "maybe").is_err());
        assert!(config.set("analytics.max_events", "0").is_err());
        assert!(config.set("analytics.retention_days", "-1").is_err());
        assert!(config.set("routing.max_delegation_depth", "0").is_err());
        assert!(config.set("routing.catalog_file", " ").is_err());
        assert!(config.set("nope", "1").is_err());
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        let mut config = Config::default();
        let err = config.set("analytics.max_events", "0").unwrap_err();
        let core = err.downcast_ref::<Error>().unwrap();
        assert_eq!(core.code(), "E600");

        let err = config.get("nope").unwrap_err();
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ConfigError(_))));

        config.routing.max_delegation_depth = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_delegation_depth"));
        assert!(matches!(err.downcast_ref::<Error>(), Some(Error::ConfigError(_))));
    }

    #[test]
    fn test_list_covers_every_key() {
        let listed = Config::default().list().unwrap();
        assert_eq!(listed.len(), CONFIG_KEYS.len());
        assert!(listed.iter().any(|(k, v)| k == "analytics.max_events" && v == "10000"));
    }
}
