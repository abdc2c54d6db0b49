//! Sessions configuration

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::env;

/// Sessions configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionsConfig {
    /// Secret mixed into storage keys
    /// Env: RS_SESSION_SECRET
    /// Default: "" (the server generates one per process)
    pub secret: String,

    /// Random bytes per session id
    /// Env: RS_SESSION_ENTROPY
    /// Default: 32
    pub entropy: usize,

    /// Session maximum age in seconds, 0 for browser-session cookies
    /// Env: RS_SESSION_MAX_AGE
    /// Default: 86400 (24 hours)
    pub max_age: u64,

    /// Cookie name
    /// Env: RS_SESSION_COOKIE_NAME
    /// Default: "sess"
    pub cookie_name: String,

    /// Cookie domain
    /// Env: RS_SESSION_COOKIE_DOMAIN
    /// Default: None
    pub cookie_domain: Option<String>,

    /// Cookie path
    /// Env: RS_SESSION_COOKIE_PATH
    /// Default: "/"
    pub cookie_path: String,

    /// Secure flag: "always", "never" or "prefer" (only over HTTPS)
    /// Env: RS_SESSION_COOKIE_SECURE
    /// Default: "prefer"
    pub cookie_secure: String,

    /// Set HttpOnly flag on cookies (XSS protection)
    /// Env: RS_SESSION_COOKIE_HTTPONLY
    /// Default: true
    pub cookie_httponly: bool,

    /// SameSite policy: "Strict", "Lax", "None", or "Off" to omit it
    /// Env: RS_SESSION_COOKIE_SAMESITE
    /// Default: "Lax"
    pub cookie_samesite: String,

    /// Never rotate ids automatically
    /// Env: RS_SESSION_DISABLE_RENEW
    /// Default: false
    pub disable_renew: bool,

    /// Store sessions under the raw cookie value (debugging only)
    /// Env: RS_SESSION_DISABLE_HASH_ID
    /// Default: false
    pub disable_hash_id: bool,

    /// Extend record expiry on every read (rotated-out ids excepted)
    /// Env: RS_SESSION_ROLLING
    /// Default: false
    pub rolling: bool,

    /// Seconds a rotated-out id stays readable; 0 deletes it on rotation
    /// Env: RS_SESSION_GRACE_PERIOD
    /// Default: 5
    pub grace_period: u64,

    /// Bound for each store call in milliseconds
    /// Env: RS_SESSION_STORE_TIMEOUT_MS
    /// Default: None
    pub store_timeout_ms: Option<u64>,
}

impl Default for SessionsConfig {
    fn default() -> Self {
        Self {
            secret: String::new(),
            entropy: 32,
            max_age: 86400,
            cookie_name: "sess".to_string(),
            cookie_domain: None,
            cookie_path: "/".to_string(),
            cookie_secure: "prefer".to_string(),
            cookie_httponly: true,
            cookie_samesite: "Lax".to_string(),
            disable_renew: false,
            disable_hash_id: false,
            rolling: false,
            grace_period: 5,
            store_timeout_ms: None,
        }
    }
}

impl SessionsConfig {
    pub fn merge(&mut self, other: Self) {
        *self = other;
    }

    pub fn apply_env_vars(&mut self) {
        if let Ok(secret) = env::var("RS_SESSION_SECRET") {
            self.secret = secret;
        }

        if let Ok(entropy) = env::var("RS_SESSION_ENTROPY") {
            if let Ok(e) = entropy.parse() {
                self.entropy = e;
            }
        }

        if let Ok(max_age) = env::var("RS_SESSION_MAX_AGE") {
            if let Ok(m) = max_age.parse() {
                self.max_age = m;
            }
        }

        if let Ok(name) = env::var("RS_SESSION_COOKIE_NAME") {
            self.cookie_name = name;
        }

        if let Ok(domain) = env::var("RS_SESSION_COOKIE_DOMAIN") {
            self.cookie_domain = (!domain.is_empty()).then_some(domain);
        }

        if let Ok(path) = env::var("RS_SESSION_COOKIE_PATH") {
            self.cookie_path = path;
        }

        if let Ok(secure) = env::var("RS_SESSION_COOKIE_SECURE") {
            self.cookie_secure = secure.to_lowercase();
        }

        if let Ok(httponly) = env::var("RS_SESSION_COOKIE_HTTPONLY") {
            self.cookie_httponly = httponly.parse().unwrap_or(true);
        }

        if let Ok(samesite) = env::var("RS_SESSION_COOKIE_SAMESITE") {
            self.cookie_samesite = samesite;
        }

        if let Ok(disable) = env::var("RS_SESSION_DISABLE_RENEW") {
            self.disable_renew = disable.parse().unwrap_or(false);
        }

        if let Ok(disable) = env::var("RS_SESSION_DISABLE_HASH_ID") {
            self.disable_hash_id = disable.parse().unwrap_or(false);
        }

        if let Ok(rolling) = env::var("RS_SESSION_ROLLING") {
            self.rolling = rolling.parse().unwrap_or(false);
        }

        if let Ok(grace) = env::var("RS_SESSION_GRACE_PERIOD") {
            if let Ok(g) = grace.parse() {
                self.grace_period = g;
            }
        }

        if let Ok(timeout) = env::var("RS_SESSION_STORE_TIMEOUT_MS") {
            self.store_timeout_ms = timeout.parse().ok();
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.cookie_name.is_empty()
            || !self.cookie_name.chars().all(|c| c.is_ascii_alphanumeric() || "-_.".contains(c))
        {
            bail!("Invalid cookie_name: must be a non-empty token");
        }

        if !["Strict", "Lax", "None", "Off"].contains(&self.cookie_samesite.as_str()) {
            bail!("Invalid cookie_samesite: must be Strict, Lax, None, or Off");
        }

        if !["always", "never", "prefer"].contains(&self.cookie_secure.as_str()) {
            bail!("Invalid cookie_secure: must be always, never, or prefer");
        }

        if self.cookie_samesite == "None" && self.cookie_secure == "never" {
            bail!("cookie_samesite None requires a Secure cookie");
        }

        if self.store_timeout_ms == Some(0) {
            bail!("Invalid store_timeout_ms: must be greater than 0");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_validate() {
        let config = SessionsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.max_age, 86400);
        assert_eq!(config.grace_period, 5);
    }

    #[test]
    fn test_validation_failures() {
        let bad_name = SessionsConfig { cookie_name: "a b".into(), ..Default::default() };
        assert!(bad_name.validate().is_err());

        let bad_samesite = SessionsConfig { cookie_samesite: "Loose".into(), ..Default::default() };
        assert!(bad_samesite.validate().is_err());

        let insecure_none = SessionsConfig {
            cookie_samesite: "None".into(),
            cookie_secure: "never".into(),
            ..Default::default()
        };
        assert!(insecure_none.validate().is_err());

        let zero_timeout = SessionsConfig { store_timeout_ms: Some(0), ..Default::default() };
        assert!(zero_timeout.validate().is_err());
    }

    #[test]
    fn test_env_vars_override() {
        env::set_var("RS_SESSION_GRACE_PERIOD", "30");
        env::set_var("RS_SESSION_COOKIE_DOMAIN", "example.com");
        let mut config = SessionsConfig::default();
        config.apply_env_vars();
        env::remove_var("RS_SESSION_GRACE_PERIOD");
        env::remove_var("RS_SESSION_COOKIE_DOMAIN");

        assert_eq!(config.grace_period, 30);
        assert_eq!(config.cookie_domain.as_deref(), Some("example.com"));
    }
}
