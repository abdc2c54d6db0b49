//! Session management for SessionStone
//!
//! This module provides server-side sessions for HTTP applications:
//! - Trait-based session storage (memory, SQLite, or your own backend)
//! - Random client identifiers stored under a keyed hash (anti-fixation)
//! - Automatic save, rotation, renewal and destruction at the end of a request
//! - Read-once flash values
//!
//! # Example
//!
//! ```no_run
//! use sessionstone_core::session::{MemoryStore, SessionConfig, SessionHandle, SessionMiddleware};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let sessions = SessionMiddleware::new(
//!     SessionConfig::new()
//!         .with_store(MemoryStore::new())
//!         .with_secret("change-me")
//!         .with_cookie_name("app_session")
//!         .with_max_age(std::time::Duration::from_secs(3600 * 24)),
//! )?;
//!
//! let req = http::Request::builder().uri("/").body(())?;
//! let resp = sessions
//!     .handle(req, |req| async move {
//!         if let Some(session) = SessionHandle::from_request(&req) {
//!             session.with(|s| s.set("visited", true));
//!         }
//!         http::Response::new(())
//!     })
//!     .await;
//! # Ok(())
//! # }
//! ```

mod cookie;
mod data;
mod entity;
mod error;
mod flash;
mod id;
mod janitor;
mod memory;
mod middleware;
mod sql_store;
mod store;
mod value;

#[cfg(test)]
pub(crate) mod testing;

pub use cookie::{CookieConfig, SessionCookie};
pub use data::{BincodeCoder, JsonCoder, SessionData, StoreCoder, NEVER_RENEW};
pub use entity::{Mark, Session, SessionHandle};
pub use error::{Result, SessionError};
pub use flash::Flash;
pub use id::{generate_id, hash_id, IdCodec, DEFAULT_ENTROPY};
pub use janitor::{JanitorConfig, StoreJanitor};
pub use memory::MemoryStore;
pub use middleware::SessionMiddleware;
pub use sql_store::{SqlStore, DEFAULT_POOL_SIZE, DEFAULT_TABLE};
pub use store::{Store, StoreOptions};
pub use value::Value;

use crate::config::SessionsConfig;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Default lifetime of a retiring identifier after rotation
pub const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(5);

/// SameSite cookie policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSitePolicy {
    /// Strict - cookie only sent to same site
    Strict,

    /// Lax - cookie sent on top-level navigation
    Lax,

    /// None - cookie sent on all requests (requires Secure)
    None,
}

/// Secure cookie flag policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecureMode {
    /// Never set Secure
    Never,

    /// Always set Secure
    Always,

    /// Set Secure when the request arrived over TLS, directly or via a
    /// proxy reporting `X-Forwarded-Proto: https`
    Prefer,
}

/// Session configuration
#[derive(Clone)]
pub struct SessionConfig {
    /// Backing store (required)
    pub store: Option<Arc<dyn Store>>,

    /// Payload encoding
    pub coder: Arc<dyn StoreCoder>,

    /// Server secret mixed into storage keys
    pub secret: Vec<u8>,

    /// Random bytes per identifier
    pub entropy: usize,

    /// Cookie configuration (name, attributes, max age)
    pub cookie_config: CookieConfig,

    /// Never rotate identifiers automatically
    pub disable_renew: bool,

    /// Use the client identifier verbatim as the storage key
    pub disable_hash_id: bool,

    /// Extend record expiry on every read
    pub rolling: bool,

    /// How long a retiring identifier stays readable after rotation
    pub grace_period: Duration,

    /// Upper bound for each store call made by the middleware
    pub store_timeout: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            store: None,
            coder: Arc::new(BincodeCoder),
            secret: Vec::new(),
            entropy: DEFAULT_ENTROPY,
            cookie_config: CookieConfig::default(),
            disable_renew: false,
            disable_hash_id: false,
            rolling: false,
            grace_period: DEFAULT_GRACE_PERIOD,
            store_timeout: None,
        }
    }
}

impl fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionConfig")
            .field("store", &self.store.as_ref().map(|_| "<store>"))
            .field("secret", &"<redacted>")
            .field("entropy", &self.entropy)
            .field("cookie_config", &self.cookie_config)
            .field("disable_renew", &self.disable_renew)
            .field("disable_hash_id", &self.disable_hash_id)
            .field("rolling", &self.rolling)
            .field("grace_period", &self.grace_period)
            .field("store_timeout", &self.store_timeout)
            .finish()
    }
}

impl SessionConfig {
    /// Create a new session configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from file/env settings; the store still has to be supplied
    pub fn from_settings(settings: &SessionsConfig) -> Result<Self> {
        let same_site = match settings.cookie_samesite.as_str() {
            "Strict" => Some(SameSitePolicy::Strict),
            "Lax" => Some(SameSitePolicy::Lax),
            "None" => Some(SameSitePolicy::None),
            "" | "Off" => None,
            other => {
                return Err(SessionError::Config(format!("unknown SameSite policy: {}", other)))
            }
        };
        let secure = match settings.cookie_secure.as_str() {
            "always" => SecureMode::Always,
            "never" => SecureMode::Never,
            "prefer" => SecureMode::Prefer,
            other => {
                return Err(SessionError::Config(format!("unknown secure mode: {}", other)))
            }
        };

        Ok(Self {
            secret: settings.secret.clone().into_bytes(),
            entropy: settings.entropy,
            cookie_config: CookieConfig {
                name: settings.cookie_name.clone(),
                domain: settings.cookie_domain.clone(),
                path: settings.cookie_path.clone(),
                secure,
                http_only: settings.cookie_httponly,
                same_site,
                max_age: Duration::from_secs(settings.max_age),
            },
            disable_renew: settings.disable_renew,
            disable_hash_id: settings.disable_hash_id,
            rolling: settings.rolling,
            grace_period: Duration::from_secs(settings.grace_period),
            store_timeout: settings.store_timeout_ms.map(Duration::from_millis),
            ..Self::default()
        })
    }

    /// Set the backing store
    pub fn with_store(mut self, store: impl Store + 'static) -> Self {
        self.store = Some(Arc::new(store));
        self
    }

    /// Set an already shared backing store
    pub fn with_shared_store(mut self, store: Arc<dyn Store>) -> Self {
        self.store = Some(store);
        self
    }

    /// Set the payload coder
    pub fn with_coder(mut self, coder: impl StoreCoder + 'static) -> Self {
        self.coder = Arc::new(coder);
        self
    }

    /// Set the server secret used to hash identifiers
    pub fn with_secret(mut self, secret: impl Into<Vec<u8>>) -> Self {
        self.secret = secret.into();
        self
    }

    /// Set identifier entropy in bytes
    pub fn with_entropy(mut self, entropy: usize) -> Self {
        self.entropy = entropy;
        self
    }

    /// Set maximum age of the cookie and of stored records
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.cookie_config.max_age = max_age;
        self
    }

    /// Set cookie name
    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_config.name = name.into();
        self
    }

    /// Set secure flag policy
    pub fn with_secure(mut self, secure: SecureMode) -> Self {
        self.cookie_config.secure = secure;
        self
    }

    /// Set HTTP only flag
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.cookie_config.http_only = http_only;
        self
    }

    /// Set SameSite policy, `None` to omit the attribute
    pub fn with_same_site(mut self, same_site: Option<SameSitePolicy>) -> Self {
        self.cookie_config.same_site = same_site;
        self
    }

    /// Set cookie domain
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie_config.domain = Some(domain.into());
        self
    }

    /// Set cookie path
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.cookie_config.path = path.into();
        self
    }

    /// Disable automatic identifier renewal
    pub fn with_disable_renew(mut self, disable: bool) -> Self {
        self.disable_renew = disable;
        self
    }

    /// Store records under the raw client identifier (debugging only)
    pub fn with_disable_hash_id(mut self, disable: bool) -> Self {
        self.disable_hash_id = disable;
        self
    }

    /// Extend record expiry on every read
    ///
    /// Records kept only for a rotation grace window are never extended.
    pub fn with_rolling(mut self, rolling: bool) -> Self {
        self.rolling = rolling;
        self
    }

    /// Set the grace period for retiring identifiers
    ///
    /// Zero deletes the old record as soon as the session rotates.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    /// Bound every store call made by the middleware
    pub fn with_store_timeout(mut self, timeout: Duration) -> Self {
        self.store_timeout = Some(timeout);
        self
    }

    pub fn max_age(&self) -> Duration {
        self.cookie_config.max_age
    }
}
