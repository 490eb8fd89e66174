use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::error::HistoryError;
use crate::price::PricePoint;

/// Compacted price record of one product.
///
/// Guarantees:
/// - exactly one start anchor and one end anchor (held as tuples, so the
///   cardinality cannot drift inside the process)
/// - `start_date <= end_date`
/// - breakpoints are kept ordered by date
///
/// Memory grows with the number of price *changes*, not observations.
#[derive(Clone, Debug, PartialEq)]
pub struct PriceHistory {
    pub(crate) start: (NaiveDate, PricePoint),
    pub(crate) middle: BTreeMap<NaiveDate, PricePoint>,
    pub(crate) end: (NaiveDate, PricePoint),
}

impl PriceHistory {
    /// History created by the very first observation of a product.
    pub fn new(date: NaiveDate, point: PricePoint) -> Self {
        Self {
            start: (date, point),
            middle: BTreeMap::new(),
            end: (date, point),
        }
    }

    /// Rebuilds a history from stored buckets, checking what the buckets
    /// cannot express on their own.
    pub fn from_parts(
        start: (NaiveDate, PricePoint),
        middle: BTreeMap<NaiveDate, PricePoint>,
        end: (NaiveDate, PricePoint),
    ) -> Result<Self, HistoryError> {
        if start.0 > end.0 {
            return Err(HistoryError::malformed(format!(
                "start_price date {} is after end_price date {}",
                start.0, end.0
            )));
        }

        let stored = std::iter::once(&start)
            .chain(std::iter::once(&end))
            .map(|(date, point)| (*date, point))
            .chain(middle.iter().map(|(date, point)| (*date, point)));

        for (date, point) in stored {
            point.validate().map_err(|e| {
                HistoryError::malformed(format!("stored price at {date} is invalid: {e}"))
            })?;
        }

        Ok(Self { start, middle, end })
    }

    pub fn start_date(&self) -> NaiveDate {
        self.start.0
    }

    pub fn start_point(&self) -> &PricePoint {
        &self.start.1
    }

    pub fn end_date(&self) -> NaiveDate {
        self.end.0
    }

    pub fn end_point(&self) -> &PricePoint {
        &self.end.1
    }

    pub fn middle_prices(&self) -> &BTreeMap<NaiveDate, PricePoint> {
        &self.middle
    }

    /// Recorded change points, oldest first.
    pub fn breakpoints(&self) -> impl Iterator<Item = (NaiveDate, &PricePoint)> + '_ {
        self.middle.iter().map(|(date, point)| (*date, point))
    }

    /// Whole days between the start anchor and `today`.
    pub fn span_days(&self, today: NaiveDate) -> i64 {
        today.signed_duration_since(self.start.0).num_days()
    }

    /// Price in effect on `date`, read as a step function over the stored
    /// entries. `None` before the start anchor; the end point for any date
    /// after the end anchor.
    pub fn price_at(&self, date: NaiveDate) -> Option<&PricePoint> {
        if date < self.start.0 {
            return None;
        }
        if date >= self.end.0 {
            return Some(&self.end.1);
        }

        match self.middle.range(..=date).next_back() {
            Some((middle_date, point)) if *middle_date >= self.start.0 => Some(point),
            _ => Some(&self.start.1),
        }
    }

    /// Mean selling price over every stored entry (start, breakpoints, end).
    pub fn mean_selling_price(&self) -> f64 {
        let total: f64 = self.start.1.selling_price
            + self.end.1.selling_price
            + self.middle.values().map(|p| p.selling_price).sum::<f64>();
        total / (self.middle.len() + 2) as f64
    }
}
