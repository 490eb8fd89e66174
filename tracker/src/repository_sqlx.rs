use anyhow::Context;
use async_trait::async_trait;
use sqlx::{AnyPool, Row};

use crate::model::TrackedUpdate;
use crate::repository::{HistoryRepository, StoredHistory};

/// SQLx-backed implementation of HistoryRepository.
/// Responsible only for persistence; the blob is decoded by the caller.
pub struct SqlxHistoryRepository {
    pool: AnyPool,
}

impl SqlxHistoryRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HistoryRepository for SqlxHistoryRepository {
    async fn load(&self, product_id: &str) -> anyhow::Result<Option<StoredHistory>> {
        let row = sqlx::query(
            r#"
SELECT history_json, inactive_streak
FROM price_histories
WHERE product_id = ?;
"#,
        )
        .bind(product_id.to_owned())
        .fetch_optional(&self.pool)
        .await?;

        let Some(r) = row else {
            return Ok(None);
        };

        let history_json = r
            .try_get::<String, _>("history_json")
            .context("history_json column unreadable")?;
        let streak = r
            .try_get::<i64, _>("inactive_streak")
            .context("inactive_streak column unreadable")?;

        Ok(Some(StoredHistory {
            history_json,
            inactive_streak: u32::try_from(streak)
                .with_context(|| format!("inactive_streak out of range: {streak}"))?,
        }))
    }

    async fn save(&self, update: &TrackedUpdate) -> anyhow::Result<()> {
        let history_json = serde_json::to_string(&update.price_history)
            .context("failed to encode price history")?;

        sqlx::query(
            r#"
INSERT INTO price_histories
  (product_id, history_json, rrp_price, selling_price, discount_percent, changed, inactive_streak, updated_on)
VALUES (?, ?, ?, ?, ?, ?, ?, ?)
ON CONFLICT (product_id) DO UPDATE SET
  history_json = excluded.history_json,
  rrp_price = excluded.rrp_price,
  selling_price = excluded.selling_price,
  discount_percent = excluded.discount_percent,
  changed = excluded.changed,
  inactive_streak = excluded.inactive_streak,
  updated_on = excluded.updated_on;
"#,
        )
        .bind(update.product_id.clone())
        .bind(history_json)
        .bind(update.rrp_price)
        .bind(update.selling_price)
        .bind(update.discount_percent)
        .bind(i64::from(update.changed))
        .bind(i64::from(update.inactive_streak))
        .bind(history::wire::format_date(update.observed_on))
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to upsert history of {}", update.product_id))?;

        Ok(())
    }

    async fn remove(&self, product_id: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(r#"DELETE FROM price_histories WHERE product_id = ?;"#)
            .bind(product_id.to_owned())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
