use chrono::NaiveDate;
use tracing::{debug, instrument};

use crate::change::has_changed;
use crate::error::HistoryError;
use crate::model::PriceHistory;
use crate::price::PricePoint;
use crate::retention::{PruneAction, RetentionPolicy, enforce_window_traced};

/// Result of folding one observation into a product's history.
#[derive(Clone, Debug, PartialEq)]
pub struct FoldOutcome {
    pub history: PriceHistory,
    /// Price differs from the previous end anchor. Always false for the
    /// first observation of a product.
    pub changed: bool,
    pub pruning: PruneAction,
}

/// Folds `observed` into `history` without touching the start anchor.
///
/// - no history: start and end both become `(today, observed)`
/// - price changed: the previous end and the new observation are both
///   recorded as breakpoints, then the end moves to today
/// - price unchanged: only the end moves to today; the previous end date is
///   dropped
pub fn fold(history: Option<PriceHistory>, observed: PricePoint, today: NaiveDate) -> PriceHistory {
    let Some(mut history) = history else {
        return PriceHistory::new(today, observed);
    };

    let (last_date, last_point) = history.end;
    if has_changed(&last_point, &observed) {
        history.middle.insert(last_date, last_point);
        history.middle.insert(today, observed);
    }
    history.end = (today, observed);

    history
}

/// Validates, folds and prunes as one step.
///
/// Errors:
/// - [`HistoryError::InvalidObservation`] when `observed` has a negative or
///   non-finite field
/// - [`HistoryError::ClockSkew`] when `today` precedes an anchor of `history`
#[instrument(
    target = "history",
    level = "debug",
    skip(history, observed, policy),
    fields(first = history.is_none(), changed = tracing::field::Empty)
)]
pub fn apply_observation(
    history: Option<PriceHistory>,
    observed: PricePoint,
    today: NaiveDate,
    policy: &RetentionPolicy,
) -> Result<FoldOutcome, HistoryError> {
    observed.validate()?;

    if let Some(h) = &history {
        for anchor in [h.start_date(), h.end_date()] {
            if today < anchor {
                return Err(HistoryError::ClockSkew { today, anchor });
            }
        }
    }

    let changed = history
        .as_ref()
        .is_some_and(|h| has_changed(h.end_point(), &observed));
    tracing::Span::current().record("changed", changed);

    let folded = fold(history, observed, today);
    let (history, pruning) = enforce_window_traced(folded, today, policy);

    debug!(
        breakpoints = history.middle.len(),
        start = %history.start_date(),
        ?pruning,
        "observation folded"
    );

    Ok(FoldOutcome {
        history,
        changed,
        pruning,
    })
}
