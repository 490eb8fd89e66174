use crate::price::PricePoint;

/// True iff the recommended or the selling price moved.
pub fn has_changed(latest: &PricePoint, observed: &PricePoint) -> bool {
    latest.rrp_price != observed.rrp_price || latest.selling_price != observed.selling_price
}
