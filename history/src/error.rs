use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HistoryError {
    /// Stored history cannot be trusted; callers re-initialize the product.
    #[error("malformed price history: {reason}")]
    MalformedHistory { reason: String },

    #[error("invalid observation: {field} = {value}")]
    InvalidObservation { field: &'static str, value: f64 },

    /// `today` is earlier than a date already anchored in the history.
    #[error("clock skew: today {today} precedes history anchor {anchor}")]
    ClockSkew { today: NaiveDate, anchor: NaiveDate },
}

impl HistoryError {
    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedHistory {
            reason: reason.into(),
        }
    }

    /// Clock skew is an environment fault; every other error has a defined
    /// fallback for the caller (skip the observation or start over).
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::ClockSkew { .. })
    }
}
