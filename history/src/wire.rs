use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::HistoryError;
use crate::model::PriceHistory;
use crate::price::PricePoint;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Persisted shape of a [`PriceHistory`]: three buckets of
/// `YYYY-MM-DD -> PricePoint`.
///
/// Missing buckets deserialize as empty so that the cardinality check, not
/// serde, reports them. A key repeated inside one bucket is a decode error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryWire {
    #[serde(default, deserialize_with = "unique_keys")]
    pub start_price: BTreeMap<String, PricePoint>,
    #[serde(default, deserialize_with = "unique_keys")]
    pub middle_prices: BTreeMap<String, PricePoint>,
    #[serde(default, deserialize_with = "unique_keys")]
    pub end_price: BTreeMap<String, PricePoint>,
}

fn unique_keys<'de, D>(deserializer: D) -> Result<BTreeMap<String, PricePoint>, D::Error>
where
    D: Deserializer<'de>,
{
    struct UniqueKeys;

    impl<'de> Visitor<'de> for UniqueKeys {
        type Value = BTreeMap<String, PricePoint>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a map of dates to price points")
        }

        fn visit_map<A>(self, mut access: A) -> Result<Self::Value, A::Error>
        where
            A: MapAccess<'de>,
        {
            let mut bucket = BTreeMap::new();
            while let Some((key, point)) = access.next_entry::<String, PricePoint>()? {
                if bucket.contains_key(&key) {
                    return Err(serde::de::Error::custom(format!("duplicate date key {key:?}")));
                }
                bucket.insert(key, point);
            }
            Ok(bucket)
        }
    }

    deserializer.deserialize_map(UniqueKeys)
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` key. Unpadded or otherwise non-canonical spellings
/// are rejected so that every day has exactly one key.
pub fn parse_date(raw: &str) -> Result<NaiveDate, HistoryError> {
    let date = NaiveDate::parse_from_str(raw, DATE_FORMAT)
        .map_err(|e| HistoryError::malformed(format!("invalid date {raw:?}: {e}")))?;

    if format_date(date) != raw {
        return Err(HistoryError::malformed(format!(
            "date {raw:?} is not in YYYY-MM-DD form"
        )));
    }
    Ok(date)
}

fn single_entry(
    bucket: &'static str,
    entries: BTreeMap<String, PricePoint>,
) -> Result<(NaiveDate, PricePoint), HistoryError> {
    if entries.len() != 1 {
        return Err(HistoryError::malformed(format!(
            "{bucket} must hold exactly one entry, found {}",
            entries.len()
        )));
    }

    let (raw, point) = entries
        .into_iter()
        .next()
        .ok_or_else(|| HistoryError::malformed(format!("{bucket} is empty")))?;

    Ok((parse_date(&raw)?, point))
}

impl From<&PriceHistory> for PriceHistoryWire {
    fn from(h: &PriceHistory) -> Self {
        let bucket = |date: NaiveDate, point: &PricePoint| {
            BTreeMap::from([(format_date(date), *point)])
        };

        Self {
            start_price: bucket(h.start_date(), h.start_point()),
            middle_prices: h
                .breakpoints()
                .map(|(date, point)| (format_date(date), *point))
                .collect(),
            end_price: bucket(h.end_date(), h.end_point()),
        }
    }
}

impl TryFrom<PriceHistoryWire> for PriceHistory {
    type Error = HistoryError;

    fn try_from(wire: PriceHistoryWire) -> Result<Self, Self::Error> {
        let start = single_entry("start_price", wire.start_price)?;
        let end = single_entry("end_price", wire.end_price)?;

        let mut middle = BTreeMap::new();
        for (raw, point) in wire.middle_prices {
            let date = parse_date(&raw)?;
            if middle.insert(date, point).is_some() {
                return Err(HistoryError::malformed(format!(
                    "middle_prices holds {date} more than once"
                )));
            }
        }

        PriceHistory::from_parts(start, middle, end)
    }
}

impl PriceHistory {
    pub fn to_wire(&self) -> PriceHistoryWire {
        PriceHistoryWire::from(self)
    }
}

/// Parses a stored JSON blob. Any decoding failure is reported as
/// [`HistoryError::MalformedHistory`].
pub fn from_json(raw: &str) -> Result<PriceHistory, HistoryError> {
    let wire: PriceHistoryWire = serde_json::from_str(raw)
        .map_err(|e| HistoryError::malformed(format!("undecodable history: {e}")))?;
    PriceHistory::try_from(wire)
}

pub fn to_json(history: &PriceHistory) -> serde_json::Result<String> {
    serde_json::to_string(&history.to_wire())
}
