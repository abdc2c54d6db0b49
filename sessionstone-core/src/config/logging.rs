//! Logging configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Env: RS_LOG_LEVEL
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string() }
    }
}

impl LoggingConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(level) = env::var("RS_LOG_LEVEL") {
            self.level = level.to_lowercase();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.level.parse::<log::LevelFilter>().is_err() {
            bail!("Invalid log level '{}'", self.level);
        }
        Ok(())
    }

    pub fn level_filter(&self) -> log::LevelFilter {
        self.level.parse().unwrap_or(log::LevelFilter::Info)
    }
}
