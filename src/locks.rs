//! Per-key async locks. Cart mutations lock on the session id and order
//! transitions on the order number, so read-modify-write cycles on one
//! document never interleave.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

const PRUNE_THRESHOLD: usize = 4096;

#[derive(Debug, Default)]
pub struct KeyedLocks {
    inner: DashMap<String, Arc<Mutex<()>>>,
}

impl KeyedLocks {
    pub async fn lock(&self, key: &str) -> OwnedMutexGuard<()> {
        if self.inner.len() > PRUNE_THRESHOLD {
            // only the map holds idle entries
            self.inner.retain(|_, m| Arc::strong_count(m) > 1);
        }
        let mutex = self.inner.entry(key.to_string()).or_default().clone();
        mutex.lock_owned().await
    }
}
