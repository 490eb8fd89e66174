use anyhow::Result;
use async_trait::async_trait;

use crate::model::TrackedUpdate;

/// One stored row: the raw JSON history plus the product's inactivity streak.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoredHistory {
    pub history_json: String,
    pub inactive_streak: u32,
}

/// Storage seam for per-product histories.
///
/// Implementations persist opaque blobs; decoding and validation stay with
/// the caller so that a malformed row can be re-initialized instead of
/// failing the load.
#[async_trait]
pub trait HistoryRepository: Send + Sync {
    /// Stored row of `product_id`, if one was ever saved.
    async fn load(&self, product_id: &str) -> Result<Option<StoredHistory>>;

    /// Insert or replace the row of `update.product_id`.
    async fn save(&self, update: &TrackedUpdate) -> Result<()>;

    /// Returns whether a row existed.
    async fn remove(&self, product_id: &str) -> Result<bool>;
}
