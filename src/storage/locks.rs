use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Per-source mutual exclusion for the load, reconcile and save sequence
///
/// Two crawls of the same source (for example two search URLs of one source running
/// concurrently) must not interleave their read-modify-write of the seen state.
#[derive(Debug, Default, Clone)]
pub struct SourceLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SourceLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `source`; released when the guard is dropped
    pub async fn lock(&self, source: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());
            locks
                .entry(source.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_source_is_exclusive() {
        let locks = SourceLocks::new();
        let guard = locks.lock("ebay").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _guard = other.lock("ebay").await;
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_sources_do_not_block() {
        let locks = SourceLocks::new();
        let _ebay = locks.lock("ebay").await;
        let immowelt = tokio::time::timeout(Duration::from_millis(200), locks.lock("immowelt")).await;
        assert!(immowelt.is_ok());
    }
}
