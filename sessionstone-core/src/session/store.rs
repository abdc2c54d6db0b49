//! Session storage trait and options

use super::error::Result;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Per-call store options
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreOptions {
    /// Record lifetime; zero means the record never expires
    pub ttl: Duration,

    /// Extend the expiry to `now + ttl` on every successful `get`
    pub rolling: bool,
}

impl StoreOptions {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, rolling: false }
    }

    pub fn with_rolling(mut self, rolling: bool) -> Self {
        self.rolling = rolling;
        self
    }

    /// Absolute expiry for a record written at `now`, `None` for no expiry
    pub fn expires_at(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        if self.ttl.is_zero() {
            return None;
        }
        chrono::Duration::from_std(self.ttl).ok().and_then(|ttl| now.checked_add_signed(ttl))
    }
}

/// Session storage trait
///
/// Implement this trait to provide custom backends. Stores only see opaque
/// payloads keyed by storage key; they know nothing about sessions.
///
/// Calls for independent requests arrive concurrently, so implementations
/// must not serialize unrelated keys behind a single lock.
#[async_trait::async_trait]
pub trait Store: Send + Sync {
    /// Fetch a payload; [`SessionError::NotFound`](super::SessionError::NotFound)
    /// when absent or expired
    async fn get(&self, key: &str, opts: &StoreOptions) -> Result<Vec<u8>>;

    /// Insert or replace a payload
    async fn set(&self, key: &str, value: Vec<u8>, opts: &StoreOptions) -> Result<()>;

    /// Reset the expiry of a live record to `now + opts.ttl`
    ///
    /// Missing or expired keys are left alone, as is any record when the TTL
    /// is zero.
    async fn touch(&self, key: &str, opts: &StoreOptions) -> Result<()>;

    /// Delete a payload; deleting a missing key is not an error
    async fn del(&self, key: &str) -> Result<()>;

    /// Remove expired records, returning how many were removed
    async fn gc(&self) -> Result<usize>;

    /// Number of live records
    async fn count(&self) -> Result<usize>;
}

#[async_trait::async_trait]
impl<S: Store + ?Sized> Store for std::sync::Arc<S> {
    async fn get(&self, key: &str, opts: &StoreOptions) -> Result<Vec<u8>> {
        (**self).get(key, opts).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, opts: &StoreOptions) -> Result<()> {
        (**self).set(key, value, opts).await
    }

    async fn touch(&self, key: &str, opts: &StoreOptions) -> Result<()> {
        (**self).touch(key, opts).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        (**self).del(key).await
    }

    async fn gc(&self) -> Result<usize> {
        (**self).gc().await
    }

    async fn count(&self) -> Result<usize> {
        (**self).count().await
    }
}
