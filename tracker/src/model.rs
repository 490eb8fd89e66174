use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use history::{FoldOutcome, PriceHistoryWire};

/// Finalized price fields for one observation, plus the updated history to
/// persist. This is what the tracker emits downstream.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackedUpdate {
    pub product_id: String,
    pub observed_on: NaiveDate,
    pub rrp_price: f64,
    pub selling_price: f64,
    pub discount_percent: f64,
    pub changed: bool,
    pub mean_selling_price: f64,
    /// Set when the observation was derived from vendor offers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
    /// Consecutive offer observations with nothing in stock. Reset by any
    /// in-stock observation; price-only observations leave it as is.
    #[serde(default)]
    pub inactive_streak: u32,
    pub price_history: PriceHistoryWire,
}

impl TrackedUpdate {
    pub fn from_outcome(product_id: &str, observed_on: NaiveDate, outcome: &FoldOutcome) -> Self {
        let latest = outcome.history.end_point();
        Self {
            product_id: product_id.to_owned(),
            observed_on,
            rrp_price: latest.rrp_price,
            selling_price: latest.selling_price,
            discount_percent: latest.discount_percent,
            changed: outcome.changed,
            mean_selling_price: outcome.history.mean_selling_price(),
            in_stock: None,
            inactive_streak: 0,
            price_history: outcome.history.to_wire(),
        }
    }
}
