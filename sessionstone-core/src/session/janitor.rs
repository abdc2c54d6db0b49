//! Periodic garbage collection of expired session records
//!
//! The StoreJanitor wraps a Store and sweeps expired records on a tokio
//! interval, outside the request path.

use super::error::Result;
use super::store::Store;
use std::sync::Arc;
use std::time::Duration;

/// Janitor configuration
#[derive(Debug, Clone)]
pub struct JanitorConfig {
    /// Run sweeps in the background
    pub auto_gc: bool,

    /// Interval between sweeps
    pub interval: Duration,

    /// Log sweeps that removed records
    pub log_sweeps: bool,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            auto_gc: true,
            interval: Duration::from_secs(300), // 5 minutes
            log_sweeps: true,
        }
    }
}

impl JanitorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auto_gc(mut self, enabled: bool) -> Self {
        self.auto_gc = enabled;
        self
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_log_sweeps(mut self, enabled: bool) -> Self {
        self.log_sweeps = enabled;
        self
    }
}

/// Background GC for a session store
///
/// The sweep task is aborted when the janitor is dropped. Must be created
/// inside a tokio runtime when `auto_gc` is on.
///
/// # Example
///
/// ```no_run
/// use sessionstone_core::session::{MemoryStore, StoreJanitor};
///
/// # async fn example() {
/// let janitor = StoreJanitor::new(MemoryStore::new());
/// let store = janitor.store();
/// // Expired records are swept in the background
/// # }
/// ```
pub struct StoreJanitor<S: Store + ?Sized> {
    store: Arc<S>,
    sweep_task: Option<tokio::task::JoinHandle<()>>,
    config: JanitorConfig,
}

impl<S: Store + 'static> StoreJanitor<S> {
    pub fn new(store: S) -> Self {
        Self::with_config(Arc::new(store), JanitorConfig::default())
    }
}

impl<S: Store + ?Sized + 'static> StoreJanitor<S> {
    /// Start a janitor over a store that is already shared
    pub fn with_config(store: Arc<S>, config: JanitorConfig) -> Self {
        let sweep_task = if config.auto_gc && !config.interval.is_zero() {
            let sweep_store = Arc::clone(&store);
            let interval = config.interval;
            let log_sweeps = config.log_sweeps;

            Some(tokio::spawn(async move {
                let mut timer = tokio::time::interval(interval);
                timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
                loop {
                    timer.tick().await;

                    match sweep_store.gc().await {
                        Ok(count) if count > 0 => {
                            if log_sweeps {
                                log::info!("Swept {} expired sessions", count);
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            log::error!("Session GC failed: {}", e);
                        }
                    }
                }
            }))
        } else {
            None
        };

        Self { store, sweep_task, config }
    }

    pub fn store(&self) -> Arc<S> {
        Arc::clone(&self.store)
    }

    pub fn config(&self) -> &JanitorConfig {
        &self.config
    }

    /// Sweep now, in addition to the background schedule
    pub async fn sweep_now(&self) -> Result<usize> {
        self.store.gc().await
    }

    pub fn is_running(&self) -> bool {
        self.sweep_task.as_ref().is_some_and(|task| !task.is_finished())
    }
}

impl<S: Store + ?Sized> Drop for StoreJanitor<S> {
    fn drop(&mut self) {
        if let Some(task) = self.sweep_task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MemoryStore, StoreOptions};

    fn short() -> StoreOptions {
        StoreOptions::new(Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_janitor_defaults() {
        let janitor = StoreJanitor::new(MemoryStore::new());
        assert!(janitor.config().auto_gc);
        assert_eq!(janitor.config().interval, Duration::from_secs(300));
        assert!(janitor.is_running());
    }

    #[tokio::test]
    async fn test_manual_sweep() {
        let config = JanitorConfig::new().with_auto_gc(false);
        let janitor = StoreJanitor::with_config(Arc::new(MemoryStore::new()), config);
        assert!(!janitor.is_running());

        let store = janitor.store();
        store.set("expired", b"x".to_vec(), &short()).await.unwrap();
        store.set("valid", b"y".to_vec(), &StoreOptions::new(Duration::from_secs(3600))).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        // Nothing sweeps in the background
        assert_eq!(store.len(), 2);

        assert_eq!(janitor.sweep_now().await.unwrap(), 1);
        assert_eq!(store.len(), 1);
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_background_sweep() {
        let config = JanitorConfig::new().with_interval(Duration::from_millis(20));
        let janitor = StoreJanitor::with_config(Arc::new(MemoryStore::new()), config);
        let store = janitor.store();

        store.set("expired", b"x".to_vec(), &short()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_shared_dyn_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let janitor =
            StoreJanitor::with_config(Arc::clone(&store), JanitorConfig::new().with_auto_gc(false));
        store.set("a", b"x".to_vec(), &short()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(janitor.sweep_now().await.unwrap(), 1);
    }
}
