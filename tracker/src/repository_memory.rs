use std::collections::HashMap;

use anyhow::Context;
use async_trait::async_trait;
use parking_lot::Mutex;

use crate::model::TrackedUpdate;
use crate::repository::{HistoryRepository, StoredHistory};

/// Process-local repository. Histories are lost on exit.
#[derive(Default)]
pub struct InMemoryHistoryRepository {
    rows: Mutex<HashMap<String, StoredHistory>>,
}

impl InMemoryHistoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `blob` verbatim, bypassing serialization.
    pub fn insert_raw(&self, product_id: &str, blob: impl Into<String>) {
        self.rows.lock().insert(
            product_id.to_owned(),
            StoredHistory {
                history_json: blob.into(),
                inactive_streak: 0,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.lock().is_empty()
    }
}

#[async_trait]
impl HistoryRepository for InMemoryHistoryRepository {
    async fn load(&self, product_id: &str) -> anyhow::Result<Option<StoredHistory>> {
        Ok(self.rows.lock().get(product_id).cloned())
    }

    async fn save(&self, update: &TrackedUpdate) -> anyhow::Result<()> {
        let history_json = serde_json::to_string(&update.price_history)
            .context("failed to encode price history")?;
        self.rows.lock().insert(
            update.product_id.clone(),
            StoredHistory {
                history_json,
                inactive_streak: update.inactive_streak,
            },
        );
        Ok(())
    }

    async fn remove(&self, product_id: &str) -> anyhow::Result<bool> {
        Ok(self.rows.lock().remove(product_id).is_some())
    }
}
