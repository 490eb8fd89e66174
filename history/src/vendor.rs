use serde::{Deserialize, Serialize};

use crate::price::PricePoint;

/// One vendor's listing of a product, as reported by the catalog.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VendorOffer {
    pub price: f64,
    #[serde(default)]
    pub special_price: Option<f64>,
    #[serde(default)]
    pub special_price_percent_discount: f64,
    #[serde(default)]
    pub stock: i64,
    #[serde(default, rename = "is_available_in_vendor_inventory")]
    pub available_in_inventory: bool,
}

impl VendorOffer {
    pub fn is_available(&self) -> bool {
        self.stock > 0 && self.available_in_inventory
    }

    /// Special price when one is set, list price otherwise. A zero special
    /// price means "none".
    pub fn effective_price(&self) -> f64 {
        match self.special_price {
            Some(special) if special != 0.0 => special,
            _ => self.price,
        }
    }

    fn to_point(&self) -> PricePoint {
        PricePoint::new(
            self.price,
            self.effective_price(),
            self.special_price_percent_discount,
        )
    }
}

/// Whether any vendor can actually ship the product.
pub fn is_available(offers: &[VendorOffer]) -> bool {
    offers.iter().any(VendorOffer::is_available)
}

/// Reduces a product's offers to the price it is observed at.
///
/// Picks the cheapest available offer (first one on ties). When nothing is
/// in stock the first listed offer stands in. `None` when there are no
/// offers at all.
pub fn cheapest_offer(offers: &[VendorOffer]) -> Option<PricePoint> {
    let cheapest = offers
        .iter()
        .filter(|o| o.is_available())
        .fold(None::<&VendorOffer>, |best, o| match best {
            Some(b) if b.effective_price() <= o.effective_price() => Some(b),
            _ => Some(o),
        });

    cheapest.or_else(|| offers.first()).map(VendorOffer::to_point)
}
