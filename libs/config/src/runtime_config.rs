//! Runtime Configuration Module
//!
//! Loads actor runtime settings from TOML files with environment-specific
//! overrides and `ACTORS_`-prefixed environment variables.

use crate::defaults;
use actor_runtime::{ShutdownPolicy, SystemSettings};
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Main runtime configuration structure
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Default)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Admission limits
    pub system: SystemConfig,

    /// Shutdown protocol timing
    pub shutdown: ShutdownConfig,

    /// Log output
    pub logging: LoggingConfig,
}

/// Admission limits
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SystemConfig {
    pub max_actors: usize,
    pub default_mailbox_capacity: usize,
}

/// Shutdown protocol timing
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    pub drain_poll_interval_ms: u64,
    pub drain_max_attempts: u32,
    pub termination_timeout_ms: u64,
}

/// Log output
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace, debug, info, warn or error; also accepts an `EnvFilter`
    /// directive such as `actor_runtime=debug`
    pub level: String,
    pub json: bool,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            max_actors: defaults::system::MAX_ACTORS,
            default_mailbox_capacity: defaults::system::DEFAULT_MAILBOX_CAPACITY,
        }
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            drain_poll_interval_ms: defaults::shutdown::DRAIN_POLL_INTERVAL_MS,
            drain_max_attempts: defaults::shutdown::DRAIN_MAX_ATTEMPTS,
            termination_timeout_ms: defaults::shutdown::TERMINATION_TIMEOUT_MS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from files with environment overrides
    ///
    /// An explicit `base_path` must exist; the default path is optional so a
    /// bare checkout runs on defaults.
    pub fn load(base_path: Option<&Path>, environment: Option<&str>) -> Result<Self> {
        let mut builder = Config::builder();

        builder = match base_path {
            Some(path) => {
                info!("Loading runtime config: {:?}", path);
                builder.add_source(File::from(path).required(true))
            }
            None => builder.add_source(
                File::from(Path::new(defaults::sources::CONFIG_PATH)).required(false),
            ),
        };

        // Add environment-specific overrides if specified
        if let Some(env) = environment {
            let env_file = PathBuf::from(defaults::sources::ENVIRONMENTS_DIR)
                .join(format!("{}.toml", env));

            if env_file.exists() {
                info!("Loading environment config: {:?}", env_file);
                builder = builder.add_source(File::from(env_file));
            } else {
                warn!("Environment config not found: {:?}", env_file);
            }
        }

        // Override with environment variables (ACTORS_SECTION__FIELD)
        builder = builder.add_source(
            Environment::with_prefix(defaults::sources::ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: RuntimeConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(?config, "Runtime configuration loaded");
        Ok(config)
    }

    /// Reject settings the runtime cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.system.max_actors == 0 {
            bail!("system.max_actors must be at least 1");
        }
        if self.shutdown.drain_poll_interval_ms == 0 {
            bail!("shutdown.drain_poll_interval_ms must be greater than 0");
        }
        if self.shutdown.drain_max_attempts == 0 {
            bail!("shutdown.drain_max_attempts must be at least 1");
        }
        if self.system.default_mailbox_capacity == 0 {
            warn!("system.default_mailbox_capacity is 0: builder-registered actors will reject every message");
        }
        Ok(())
    }

    /// Settings for [`actor_runtime::ActorSystem::with_settings`]
    pub fn system_settings(&self) -> SystemSettings {
        SystemSettings {
            max_actors: self.system.max_actors,
            default_mailbox_capacity: self.system.default_mailbox_capacity,
            shutdown: ShutdownPolicy {
                drain_poll_interval: Duration::from_millis(self.shutdown.drain_poll_interval_ms),
                drain_max_attempts: self.shutdown.drain_max_attempts,
                termination_timeout: Duration::from_millis(self.shutdown.termination_timeout_ms),
            },
        }
    }

    /// Render as TOML, e.g. to seed a config file
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Convenience function to load configuration with defaults
pub fn load_config(environment: Option<&str>) -> Result<RuntimeConfig> {
    RuntimeConfig::load(None, environment)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_load_base_config() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("actors.toml");

        let config_content = r#"
[system]
max_actors = 32
default_mailbox_capacity = 8

[shutdown]
drain_poll_interval_ms = 10
drain_max_attempts = 50
termination_timeout_ms = 2000

[logging]
level = "debug"
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = RuntimeConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.system.max_actors, 32);
        assert_eq!(config.system.default_mailbox_capacity, 8);
        assert_eq!(config.logging.level, "debug");
        assert!(!config.logging.json);

        let settings = config.system_settings();
        assert_eq!(settings.max_actors, 32);
        assert_eq!(settings.shutdown.drain_poll_interval, Duration::from_millis(10));
        assert_eq!(settings.shutdown.drain_max_attempts, 50);
        assert_eq!(settings.shutdown.termination_timeout, Duration::from_secs(2));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("actors.toml");
        fs::write(&config_path, "[system]\nmax_actors = 3\n").unwrap();

        let config = RuntimeConfig::load(Some(&config_path), None).unwrap();

        assert_eq!(config.system.max_actors, 3);
        assert_eq!(config.shutdown, ShutdownConfig::default());
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(RuntimeConfig::load(Some(&missing), None).is_err());
    }

    #[test]
    fn test_validation() {
        let mut config = RuntimeConfig::default();
        assert!(config.validate().is_ok());

        config.system.max_actors = 0;
        assert!(config.validate().is_err());

        config.system.max_actors = 1;
        config.shutdown.drain_max_attempts = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_defaults_match_runtime() {
        let settings = RuntimeConfig::default().system_settings();
        assert_eq!(settings, SystemSettings::default());
    }

    #[test]
    fn test_toml_round_trip() {
        let config = RuntimeConfig::default();
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("max_actors"));

        let parsed: RuntimeConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
