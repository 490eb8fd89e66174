use chrono::{NaiveDate, TimeDelta};
use tracing::{debug, instrument};

use crate::model::PriceHistory;

/// Maximum span, in days, between the start anchor and today.
pub const RETENTION_WINDOW_DAYS: i64 = 180;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub window_days: i64,
}

impl RetentionPolicy {
    /// `None` for windows shorter than one day.
    pub fn new(window_days: i64) -> Option<Self> {
        (window_days >= 1).then_some(Self { window_days })
    }
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            window_days: RETENTION_WINDOW_DAYS,
        }
    }
}

/// What the pruner did to the start anchor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PruneAction {
    /// Window still respected.
    Untouched,
    /// A breakpoint exactly `window_days` old became the new start anchor.
    Promoted { anchor: NaiveDate, dropped: usize },
    /// No breakpoint sat on the boundary; the old start value was relabelled
    /// at `today - window_days`.
    Synthesized { anchor: NaiveDate, dropped: usize },
}

/// Re-anchors `history` so that it spans at most `policy.window_days`.
///
/// Expects `history` as produced by [`crate::fold`], i.e. with the end anchor
/// at `today`.
pub fn enforce_window(
    history: PriceHistory,
    today: NaiveDate,
    policy: &RetentionPolicy,
) -> PriceHistory {
    enforce_window_traced(history, today, policy).0
}

#[instrument(
    target = "history",
    level = "debug",
    skip(history, policy),
    fields(window_days = policy.window_days, start = %history.start.0)
)]
pub fn enforce_window_traced(
    mut history: PriceHistory,
    today: NaiveDate,
    policy: &RetentionPolicy,
) -> (PriceHistory, PruneAction) {
    let window = policy.window_days;
    let (start_date, start_point) = history.start;

    if today.signed_duration_since(start_date).num_days() <= window {
        return (history, PruneAction::Untouched);
    }

    // Walk a snapshot of the keys; the live map is edited along the way.
    let snapshot: Vec<NaiveDate> = history.middle.keys().copied().collect();
    let mut suitable_date = None;
    let mut dropped = 0;

    for date in snapshot {
        let gap = today.signed_duration_since(date).num_days();
        if gap > window {
            history.middle.remove(&date);
            dropped += 1;
        }
        if gap == window {
            suitable_date = Some(date);
            break;
        }
    }

    let promoted = suitable_date.and_then(|date| history.middle.remove(&date).map(|p| (date, p)));

    let action = match promoted {
        Some((anchor, point)) => {
            history.start = (anchor, point);
            PruneAction::Promoted { anchor, dropped }
        }
        None => {
            let anchor = today - TimeDelta::days(window);
            history.start = (anchor, start_point);
            PruneAction::Synthesized { anchor, dropped }
        }
    };

    debug!(?action, remaining = history.middle.len(), "retention window re-anchored");

    (history, action)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::price::PricePoint;

    fn day(n: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap() + TimeDelta::days(n)
    }

    fn pt(selling: f64) -> PricePoint {
        PricePoint::new(100.0, selling, 0.0)
    }

    fn history(start: i64, middles: &[(i64, f64)], end: i64) -> PriceHistory {
        let middle: BTreeMap<_, _> = middles.iter().map(|(d, s)| (day(*d), pt(*s))).collect();
        PriceHistory::from_parts((day(start), pt(100.0)), middle, (day(end), pt(50.0))).unwrap()
    }

    #[test]
    fn policy_rejects_empty_window() {
        assert!(RetentionPolicy::new(0).is_none());
        assert!(RetentionPolicy::new(-5).is_none());
        assert_eq!(RetentionPolicy::new(30).unwrap().window_days, 30);
        assert_eq!(RetentionPolicy::default().window_days, 180);
    }

    #[test]
    fn span_at_exactly_the_window_is_untouched() {
        let h = history(0, &[(10, 90.0)], 180);
        let (out, action) = enforce_window_traced(h.clone(), day(180), &RetentionPolicy::default());

        assert_eq!(action, PruneAction::Untouched);
        assert_eq!(out, h);
    }

    #[test]
    fn exact_boundary_breakpoint_is_promoted() {
        let h = history(0, &[(5, 95.0), (20, 90.0), (30, 80.0)], 200);
        let (out, action) = enforce_window_traced(h, day(200), &RetentionPolicy::default());

        assert_eq!(
            action,
            PruneAction::Promoted {
                anchor: day(20),
                dropped: 1
            }
        );
        assert_eq!(out.start_date(), day(20));
        assert_eq!(out.start_point(), &pt(90.0));
        assert_eq!(out.middle_prices().keys().copied().collect::<Vec<_>>(), vec![day(30)]);
    }

    #[test]
    fn scan_stops_at_first_exact_match() {
        // Entries after the match are left alone.
        let h = history(0, &[(20, 90.0), (21, 85.0)], 200);
        let (out, _) = enforce_window_traced(h, day(200), &RetentionPolicy::default());

        assert_eq!(out.start_date(), day(20));
        assert!(out.middle_prices().contains_key(&day(21)));
    }

    #[test]
    fn missing_boundary_synthesizes_anchor_with_old_value() {
        let h = history(0, &[(5, 95.0), (19, 92.0), (25, 80.0)], 200);
        let (out, action) = enforce_window_traced(h, day(200), &RetentionPolicy::default());

        assert_eq!(
            action,
            PruneAction::Synthesized {
                anchor: day(20),
                dropped: 2
            }
        );
        assert_eq!(out.start_date(), day(20));
        assert_eq!(out.start_point(), &pt(100.0));
        assert_eq!(out.middle_prices().keys().copied().collect::<Vec<_>>(), vec![day(25)]);
    }

    #[test]
    fn custom_window_is_honoured() {
        let h = history(0, &[(10, 90.0)], 40);
        let policy = RetentionPolicy::new(30).unwrap();
        let (out, action) = enforce_window_traced(h, day(40), &policy);

        assert_eq!(
            action,
            PruneAction::Promoted {
                anchor: day(10),
                dropped: 0
            }
        );
        assert_eq!(out.span_days(day(40)), 30);
    }
}
