//! Per-key async locks
//!
//! Every attach/detach against a parent is a read-modify-write of the whole
//! object, so two mutations of the same parent must never interleave. Locks
//! are keyed by parent ID; unrelated parents never contend.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of lazily created per-key locks. Entries are never removed.
///
/// Create one per provider and share it through an `Arc`.
#[derive(Default)]
pub struct KeyedMutex {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Holds the lock for one key until dropped
#[derive(Debug)]
pub struct KeyedGuard {
    key: String,
    _guard: OwnedMutexGuard<()>,
}

impl KeyedGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyedGuard {
    fn drop(&mut self) {
        tracing::trace!("Unlocked {}", self.key);
    }
}

impl KeyedMutex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other task holds `key`, then take it.
    ///
    /// Not reentrant: locking a key the current task already holds deadlocks.
    pub async fn lock(&self, key: &str) -> KeyedGuard {
        let entry = self.entry(key);
        tracing::trace!("Locking {}", key);
        let guard = entry.lock_owned().await;
        KeyedGuard {
            key: key.to_string(),
            _guard: guard,
        }
    }

    /// Number of keys that have ever been locked
    pub fn len(&self) -> usize {
        self.table().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        self.table()
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    fn table(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<AsyncMutex<()>>>> {
        self.locks.lock().unwrap_or_else(|e| e.into_inner())
    }
}
