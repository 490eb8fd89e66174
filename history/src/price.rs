use serde::{Deserialize, Serialize};

use crate::error::HistoryError;

/// Cheapest-available-vendor price facts captured for one observation.
///
/// `discount_percent` is informational: it travels with the point but plays
/// no part in change detection.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub rrp_price: f64,
    pub selling_price: f64,
    pub discount_percent: f64,
}

impl PricePoint {
    pub fn new(rrp_price: f64, selling_price: f64, discount_percent: f64) -> Self {
        Self {
            rrp_price,
            selling_price,
            discount_percent,
        }
    }

    /// Rejects negative or non-finite fields.
    pub fn validate(&self) -> Result<(), HistoryError> {
        for (field, value) in [
            ("rrp_price", self.rrp_price),
            ("selling_price", self.selling_price),
            ("discount_percent", self.discount_percent),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(HistoryError::InvalidObservation { field, value });
            }
        }
        Ok(())
    }
}
