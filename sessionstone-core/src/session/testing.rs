//! Recording store for middleware tests

use super::error::{Result, SessionError};
use super::memory::MemoryStore;
use super::store::{Store, StoreOptions};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Get { key: String },
    Set { key: String, value: Vec<u8>, ttl: Duration },
    Touch { key: String, ttl: Duration },
    Del { key: String },
}

/// Memory store that remembers every call and can be told to fail
#[derive(Clone, Default)]
pub(crate) struct RecordingStore {
    inner: MemoryStore,
    calls: Arc<Mutex<Vec<Call>>>,
    fail_get: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sets(&self) -> Vec<(String, Vec<u8>, Duration)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Set { key, value, ttl } => Some((key, value, ttl)),
                _ => None,
            })
            .collect()
    }

    pub fn dels(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Del { key } => Some(key),
                _ => None,
            })
            .collect()
    }

    pub fn touches(&self) -> Vec<(String, Duration)> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::Touch { key, ttl } => Some((key, ttl)),
                _ => None,
            })
            .collect()
    }

    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn fail_get(&self, fail: bool) {
        self.fail_get.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    pub fn inner(&self) -> &MemoryStore {
        &self.inner
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait::async_trait]
impl Store for RecordingStore {
    async fn get(&self, key: &str, opts: &StoreOptions) -> Result<Vec<u8>> {
        self.record(Call::Get { key: key.to_string() });
        if self.fail_get.load(Ordering::SeqCst) {
            return Err(SessionError::Store("backend unavailable".into()));
        }
        self.inner.get(key, opts).await
    }

    async fn set(&self, key: &str, value: Vec<u8>, opts: &StoreOptions) -> Result<()> {
        self.record(Call::Set { key: key.to_string(), value: value.clone(), ttl: opts.ttl });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SessionError::Store("backend unavailable".into()));
        }
        self.inner.set(key, value, opts).await
    }

    async fn touch(&self, key: &str, opts: &StoreOptions) -> Result<()> {
        self.record(Call::Touch { key: key.to_string(), ttl: opts.ttl });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SessionError::Store("backend unavailable".into()));
        }
        self.inner.touch(key, opts).await
    }

    async fn del(&self, key: &str) -> Result<()> {
        self.record(Call::Del { key: key.to_string() });
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(SessionError::Store("backend unavailable".into()));
        }
        self.inner.del(key).await
    }

    async fn gc(&self) -> Result<usize> {
        self.inner.gc().await
    }

    async fn count(&self) -> Result<usize> {
        self.inner.count().await
    }
}

/// Store whose calls never finish
#[derive(Clone, Default)]
pub(crate) struct StalledStore;

#[async_trait::async_trait]
impl Store for StalledStore {
    async fn get(&self, _key: &str, _opts: &StoreOptions) -> Result<Vec<u8>> {
        std::future::pending().await
    }

    async fn set(&self, _key: &str, _value: Vec<u8>, _opts: &StoreOptions) -> Result<()> {
        std::future::pending().await
    }

    async fn touch(&self, _key: &str, _opts: &StoreOptions) -> Result<()> {
        std::future::pending().await
    }

    async fn del(&self, _key: &str) -> Result<()> {
        std::future::pending().await
    }

    async fn gc(&self) -> Result<usize> {
        Ok(0)
    }

    async fn count(&self) -> Result<usize> {
        Ok(0)
    }
}
