use chrono::NaiveDate;
use serde::Deserialize;

use history::{PricePoint, VendorOffer};

/// One line of the observation feed.
///
/// Either carries the already-reduced price triple or the raw vendor offers
/// of the product. `date` defaults to the run date when absent.
#[derive(Clone, Debug, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ObservationLine {
    Offers {
        product_id: String,
        offers: Vec<VendorOffer>,
        #[serde(default)]
        date: Option<NaiveDate>,
    },
    Price {
        product_id: String,
        rrp_price: f64,
        selling_price: f64,
        #[serde(default)]
        discount_percent: f64,
        #[serde(default)]
        date: Option<NaiveDate>,
    },
}

impl ObservationLine {
    pub fn parse(raw: &str) -> serde_json::Result<Self> {
        serde_json::from_str(raw)
    }

    pub fn product_id(&self) -> &str {
        match self {
            Self::Offers { product_id, .. } | Self::Price { product_id, .. } => product_id,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Self::Offers { date, .. } | Self::Price { date, .. } => *date,
        }
    }

    /// The price triple for `Price` lines.
    pub fn price_point(&self) -> Option<PricePoint> {
        match self {
            Self::Price {
                rrp_price,
                selling_price,
                discount_percent,
                ..
            } => Some(PricePoint::new(*rrp_price, *selling_price, *discount_percent)),
            Self::Offers { .. } => None,
        }
    }
}
