//! Bootstrap configuration file resolution and loading
//!
//! Config file priority order:
//! 1. Command-line argument (highest priority)
//! 2. `WOF_CONFIG` environment variable
//! 3. Per-user config file (`<config_dir>/wof/config.toml`)
//! 4. Built-in defaults (no file)
//!
//! A missing file from sources 2-4 is not an error: the loader warns and
//! falls back to defaults. A file named explicitly on the command line must
//! exist.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an alternate config file
pub const CONFIG_ENV_VAR: &str = "WOF_CONFIG";

/// Where a config path came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine,
    Environment,
    UserConfigDir,
}

/// Config file path plus the source that supplied it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedConfigPath {
    pub path: PathBuf,
    pub source: ConfigSource,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level or full `EnvFilter` directive (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Resolves which config file (if any) should be loaded
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    app_name: String,
}

impl ConfigResolver {
    pub fn new(app_name: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
        }
    }

    /// Resolve the config path following the priority order above
    pub fn resolve(&self, cli_arg: Option<&Path>) -> Option<ResolvedConfigPath> {
        if let Some(path) = cli_arg {
            return Some(ResolvedConfigPath {
                path: path.to_path_buf(),
                source: ConfigSource::CommandLine,
            });
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(ResolvedConfigPath {
                    path: PathBuf::from(path),
                    source: ConfigSource::Environment,
                });
            }
        }

        self.user_config_path().map(|path| ResolvedConfigPath {
            path,
            source: ConfigSource::UserConfigDir,
        })
    }

    /// `<config_dir>/<app_name>/config.toml`, e.g. `~/.config/wof/config.toml`
    pub fn user_config_path(&self) -> Option<PathBuf> {
        dirs::config_dir()
            .map(|d| d.join(&self.app_name).join("config.toml"))
    }
}

/// Parse a TOML document into `T`
pub fn parse_toml<T: DeserializeOwned>(content: &str) -> Result<T> {
    Ok(toml::from_str(content)?)
}

/// Load `T` from the resolved config file, or return `T::default()`
///
/// # Errors
/// - The file was named on the command line but does not exist
/// - The file exists but cannot be read (`Error::Io`) or parsed
pub fn load_or_default<T>(resolved: Option<&ResolvedConfigPath>) -> Result<T>
where
    T: DeserializeOwned + Default,
{
    let Some(resolved) = resolved else {
        warn!("No config file location available, using built-in defaults");
        return Ok(T::default());
    };

    if !resolved.path.exists() {
        if resolved.source == ConfigSource::CommandLine {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                resolved.path.display()
            )));
        }
        warn!(
            "Config file {} not found ({:?}), using built-in defaults",
            resolved.path.display(),
            resolved.source
        );
        return Ok(T::default());
    }

    let content = std::fs::read_to_string(&resolved.path)?;

    let config = parse_toml(&content)?;
    info!("Loaded configuration from {}", resolved.path.display());
    Ok(config)
}
