use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// One async mutex per key, created on demand and dropped once nobody holds
/// or waits for it.
///
/// Folds of the same product are not commutative, so every load-fold-save
/// cycle of a product runs under its key.
#[derive(Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held for the duration of one product update.
pub struct KeyGuard<'a> {
    owner: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        // Built before waiting so a cancelled wait still cleans up its slot.
        let mut entry = KeyGuard {
            owner: self,
            key: key.to_owned(),
            guard: None,
        };

        // Clone under the map lock so `Drop` can tell whether anyone waits.
        let slot = Arc::clone(self.slots.lock().entry(key.to_owned()).or_default());
        entry.guard = Some(slot.lock_owned().await);

        entry
    }

    /// Number of keys currently held or awaited.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().len()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());

        let mut slots = self.owner.slots.lock();
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
