//! In-memory session storage
//!
//! Backed by an `scc` concurrent hash map: operations on different keys only
//! contend when they land in the same bucket, and the GC sweep walks the map
//! bucket by bucket instead of freezing it.
//! Suitable for development and single-server deployments.

use super::error::{Result, SessionError};
use super::store::{Store, StoreOptions};
use chrono::{DateTime, Utc};
use scc::hash_map::Entry;
use scc::HashMap as SccHashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Record {
    value: Vec<u8>,
    expires_at: Option<DateTime<Utc>>,
}

impl Record {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-memory session store
///
/// Records are lost on restart. Expiry is checked on every read, so an
/// expired record is never returned even if GC has not run yet.
///
/// # Example
///
/// ```
/// use sessionstone_core::session::MemoryStore;
///
/// let store = MemoryStore::new();
/// ```
#[derive(Clone)]
pub struct MemoryStore {
    records: Arc<SccHashMap<String, Record>>,
}

impl MemoryStore {
    /// Create a new in-memory session store
    pub fn new() -> Self {
        Self { records: Arc::new(SccHashMap::new()) }
    }

    /// Number of records held, expired ones included
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str, opts: &StoreOptions) -> Result<Vec<u8>> {
        let now = Utc::now();
        match self.records.entry_async(key.to_string()).await {
            Entry::Occupied(mut o) => {
                if o.get().is_expired(now) {
                    let _ = o.remove();
                    return Err(SessionError::NotFound);
                }
                if opts.rolling && !opts.ttl.is_zero() {
                    o.get_mut().expires_at = opts.expires_at(now);
                }
                Ok(o.get().value.clone())
            }
            Entry::Vacant(_) => Err(SessionError::NotFound),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>, opts: &StoreOptions) -> Result<()> {
        let record = Record { value, expires_at: opts.expires_at(Utc::now()) };
        match self.records.entry_async(key.to_string()).await {
            Entry::Occupied(mut o) => {
                *o.get_mut() = record;
            }
            Entry::Vacant(v) => {
                v.insert_entry(record);
            }
        }
        Ok(())
    }

    async fn touch(&self, key: &str, opts: &StoreOptions) -> Result<()> {
        if opts.ttl.is_zero() {
            return Ok(());
        }
        let now = Utc::now();
        if let Entry::Occupied(mut o) = self.records.entry_async(key.to_string()).await {
            if o.get().is_expired(now) {
                let _ = o.remove();
            } else {
                o.get_mut().expires_at = opts.expires_at(now);
            }
        }
        Ok(())
    }

    async fn del(&self, key: &str) -> Result<()> {
        let _ = self.records.remove_async(key).await;
        Ok(())
    }

    async fn gc(&self) -> Result<usize> {
        let now = Utc::now();
        let mut removed = 0;
        self.records
            .retain_async(|_, record| {
                let keep = !record.is_expired(now);
                if !keep {
                    removed += 1;
                }
                keep
            })
            .await;
        Ok(removed)
    }

    async fn count(&self) -> Result<usize> {
        let now = Utc::now();
        let mut live = 0;
        self.records
            .retain_async(|_, record| {
                if !record.is_expired(now) {
                    live += 1;
                }
                true
            })
            .await;
        Ok(live)
    }
}
