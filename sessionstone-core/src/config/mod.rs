//! Configuration system for SessionStone
//!
//! # Configuration Hierarchy
//!
//! Configuration values are resolved in the following order (highest priority wins):
//!
//! 1. **Code** (Builder pattern on `SessionConfig`) - Highest priority
//! 2. **Environment Variables** (`RS_SESSION_*`, `RS_STORE_*`, `RS_LOG_LEVEL`)
//! 3. **Config File** (sessionstone.toml)
//! 4. **Defaults** - Lowest priority
//!
//! # Example
//!
//! ```no_run
//! use sessionstone_core::config::SessionStoneConfig;
//!
//! let config = SessionStoneConfig::load()?;
//! config.validate()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod logging;
pub mod sessions;
pub mod store;

pub use logging::LoggingConfig;
pub use sessions::SessionsConfig;
pub use store::StoreConfig;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "sessionstone.toml";

/// Complete SessionStone configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionStoneConfig {
    pub sessions: SessionsConfig,
    pub store: StoreConfig,
    pub logging: LoggingConfig,
}

impl SessionStoneConfig {
    /// Load configuration from `sessionstone.toml` and the environment
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_FILE)
    }

    /// Load configuration from a specific file; a missing file means defaults
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let mut config = Self::default();

        if path.exists() {
            let file_config = Self::from_file(path)
                .with_context(|| format!("Failed to load config from {}", path.display()))?;
            config.merge(file_config);
        }

        config.apply_env_vars();

        Ok(config)
    }

    /// Load configuration from TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config: {}", path.as_ref().display()))
    }

    /// Merge another config into this one (other takes priority)
    pub fn merge(&mut self, other: Self) {
        self.sessions.merge(other.sessions);
        self.store.merge(other.store);
        self.logging.merge(other.logging);
    }

    pub fn apply_env_vars(&mut self) {
        self.sessions.apply_env_vars();
        self.store.apply_env_vars();
        self.logging.apply_env_vars();
    }

    pub fn validate(&self) -> Result<()> {
        self.sessions.validate().context("Invalid [sessions] section")?;
        self.store.validate().context("Invalid [store] section")?;
        self.logging.validate().context("Invalid [logging] section")?;
        Ok(())
    }
}
