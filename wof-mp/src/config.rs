//! Configuration management for wof-mp
//!
//! Bootstrap configuration comes from a TOML file (see
//! `wof_common::config` for file resolution). Settings priority:
//!
//! 1. Command-line arguments (--capacity, --max-idle-secs, ...)
//! 2. TOML configuration file
//! 3. Built-in defaults (code constants)

use crate::error::{Error, Result};
use crate::media::PlaybackPolicy;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use wof_common::config::{load_or_default, ConfigResolver, LoggingConfig, ResolvedConfigPath};

/// Default number of simultaneously live players
///
/// Feeds only ever autoplay one card; the second slot keeps the card being
/// scrolled away from warm for a quick scroll-back.
pub const DEFAULT_CAPACITY: usize = 2;

/// Directory name used under the OS temp dir when `temp_dir` is unset
const DEFAULT_TEMP_SUBDIR: &str = "wof-media";

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Media player pool configuration (`[pool]`)
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Soft upper bound on live handles
    #[serde(default = "default_capacity")]
    pub capacity: usize,

    /// Hidden handles unused for longer than this are swept
    #[serde(default = "default_max_idle_secs")]
    pub max_idle_secs: u64,

    /// Period of the background sweep
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Directory for temp media artifacts (default: `<tmp>/wof-media`)
    #[serde(default)]
    pub temp_dir: Option<PathBuf>,

    /// Pool event channel capacity
    #[serde(default = "default_event_capacity")]
    pub event_capacity: usize,

    #[serde(default)]
    pub playback: PlaybackPolicy,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

fn default_max_idle_secs() -> u64 {
    30
}

fn default_sweep_interval_secs() -> u64 {
    10
}

fn default_event_capacity() -> usize {
    100
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            max_idle_secs: default_max_idle_secs(),
            sweep_interval_secs: default_sweep_interval_secs(),
            temp_dir: None,
            event_capacity: default_event_capacity(),
            playback: PlaybackPolicy::default(),
        }
    }
}

impl PoolConfig {
    pub fn max_idle(&self) -> Duration {
        Duration::from_secs(self.max_idle_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Resolved temp artifact directory
    pub fn temp_dir(&self) -> PathBuf {
        self.temp_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_TEMP_SUBDIR))
    }

    /// Reject settings the pool cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::Config("pool.capacity must be at least 1".into()));
        }
        if self.max_idle_secs == 0 {
            return Err(Error::Config(
                "pool.max_idle_secs must be at least 1".to_string(),
            ));
        }
        if self.sweep_interval_secs == 0 {
            return Err(Error::Config(
                "pool.sweep_interval_secs must be at least 1".to_string(),
            ));
        }
        if self.event_capacity == 0 {
            return Err(Error::Config(
                "pool.event_capacity must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Feed replay configuration (`[feed]`)
#[derive(Debug, Clone, Deserialize)]
pub struct FeedConfig {
    /// Cards further than this many positions behind the visible card are
    /// released as permanently gone
    #[serde(default = "default_release_window")]
    pub release_window: usize,
}

fn default_release_window() -> usize {
    3
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            release_window: default_release_window(),
        }
    }
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub config_path: Option<PathBuf>,
    pub capacity: Option<usize>,
    pub max_idle_secs: Option<u64>,
    pub sweep_interval_secs: Option<u64>,
}

/// Complete wof-mp configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub pool: PoolConfig,
    pub feed: FeedConfig,
    pub logging: LoggingConfig,
    /// Config file that was consulted, if any
    pub source: Option<ResolvedConfigPath>,
}

impl Config {
    /// Load configuration from TOML (if present) and apply CLI overrides
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - A config file named on the command line does not exist
    /// - The config file cannot be read or parsed
    /// - The merged settings fail validation
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let resolved = ConfigResolver::new("wof")
            .resolve(overrides.config_path.as_deref());
        let toml_config: TomlConfig = load_or_default(resolved.as_ref())?;

        let config = Self::from_toml(toml_config, resolved, &overrides)?;
        info!(
            "Pool configuration: capacity={}, max_idle={}s, sweep_interval={}s, temp_dir={}",
            config.pool.capacity,
            config.pool.max_idle_secs,
            config.pool.sweep_interval_secs,
            config.pool.temp_dir().display()
        );
        Ok(config)
    }

    /// Merge a parsed TOML config with CLI overrides and validate
    pub fn from_toml(
        toml_config: TomlConfig,
        source: Option<ResolvedConfigPath>,
        overrides: &ConfigOverrides,
    ) -> Result<Self> {
        let mut pool = toml_config.pool;
        if let Some(capacity) = overrides.capacity {
            pool.capacity = capacity;
        }
        if let Some(max_idle_secs) = overrides.max_idle_secs {
            pool.max_idle_secs = max_idle_secs;
        }
        if let Some(sweep_interval_secs) = overrides.sweep_interval_secs {
            pool.sweep_interval_secs = sweep_interval_secs;
        }
        pool.validate()?;

        Ok(Self {
            pool,
            feed: toml_config.feed,
            logging: toml_config.logging,
            source,
        })
    }
}
