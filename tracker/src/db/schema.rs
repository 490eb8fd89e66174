use sqlx::AnyPool;

pub async fn migrate(pool: &AnyPool) -> anyhow::Result<()> {
    // One row per product; the compacted history travels as a JSON blob next
    // to the finalized price fields of the latest observation.
    sqlx::query(
        r#"
CREATE TABLE IF NOT EXISTS price_histories (
  product_id TEXT PRIMARY KEY,
  history_json TEXT NOT NULL,
  rrp_price REAL NOT NULL,
  selling_price REAL NOT NULL,
  discount_percent REAL NOT NULL,
  changed INTEGER NOT NULL CHECK (changed IN (0,1)),
  inactive_streak INTEGER NOT NULL DEFAULT 0 CHECK (inactive_streak >= 0),
  updated_on TEXT NOT NULL
);
"#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"CREATE INDEX IF NOT EXISTS idx_price_histories_updated ON price_histories(updated_on);"#,
    )
    .execute(pool)
    .await?;

    Ok(())
}
