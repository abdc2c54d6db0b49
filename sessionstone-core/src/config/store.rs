//! Session store configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Backing store selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend: "memory" or "sqlite"
    /// Env: RS_STORE_KIND
    /// Default: "memory"
    pub kind: String,

    /// SQLite database file
    /// Env: RS_STORE_SQLITE_PATH
    /// Default: "./data/sessions.db"
    pub sqlite_path: String,

    /// SQLite table name
    /// Env: RS_STORE_TABLE
    /// Default: "sessions"
    pub table: String,

    /// Pooled SQLite connections
    /// Env: RS_STORE_POOL_SIZE
    /// Default: 8
    pub pool_size: u32,

    /// Seconds between GC sweeps
    /// Env: RS_STORE_GC_INTERVAL
    /// Default: 300 (5 minutes)
    pub gc_interval: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: "memory".to_string(),
            sqlite_path: "./data/sessions.db".to_string(),
            table: "sessions".to_string(),
            pool_size: 8,
            gc_interval: 300,
        }
    }
}

impl StoreConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(kind) = env::var("RS_STORE_KIND") {
            self.kind = kind.to_lowercase();
        }

        if let Ok(path) = env::var("RS_STORE_SQLITE_PATH") {
            self.sqlite_path = path;
        }

        if let Ok(table) = env::var("RS_STORE_TABLE") {
            self.table = table;
        }

        if let Ok(size) = env::var("RS_STORE_POOL_SIZE") {
            if let Ok(s) = size.parse() {
                self.pool_size = s;
            }
        }

        if let Ok(interval) = env::var("RS_STORE_GC_INTERVAL") {
            if let Ok(i) = interval.parse() {
                self.gc_interval = i;
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        match self.kind.as_str() {
            "memory" => {}
            "sqlite" => {
                if self.sqlite_path.is_empty() {
                    bail!("Invalid sqlite_path: required for the sqlite store");
                }
                if self.table.is_empty() {
                    bail!("Invalid table: required for the sqlite store");
                }
                if self.pool_size == 0 {
                    bail!("Invalid pool_size: must be greater than 0");
                }
            }
            other => bail!("Invalid store kind '{}': must be memory or sqlite", other),
        }

        if self.gc_interval == 0 {
            bail!("Invalid gc_interval: must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_validation() {
        assert!(StoreConfig::default().validate().is_ok());

        let sqlite = StoreConfig { kind: "sqlite".into(), ..Default::default() };
        assert!(sqlite.validate().is_ok());

        let unknown = StoreConfig { kind: "redis".into(), ..Default::default() };
        assert!(unknown.validate().is_err());

        let no_pool = StoreConfig { kind: "sqlite".into(), pool_size: 0, ..Default::default() };
        assert!(no_pool.validate().is_err());

        let no_gc = StoreConfig { gc_interval: 0, ..Default::default() };
        assert!(no_gc.validate().is_err());
    }
}
