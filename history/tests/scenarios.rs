use std::collections::BTreeMap;

use chrono::{NaiveDate, TimeDelta};

use history::retention::enforce_window_traced;
use history::wire::{from_json, to_json};
use history::{
    PriceHistory, PricePoint, PruneAction, RetentionPolicy, apply_observation, enforce_window,
    fold,
};

fn day(n: i64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 1).unwrap() + TimeDelta::days(n)
}

fn point(rrp: f64, selling: f64, discount: f64) -> PricePoint {
    PricePoint::new(rrp, selling, discount)
}

#[test]
fn scenario_a_first_observation_seeds_both_anchors() {
    let p = point(100.0, 100.0, 0.0);
    let h = fold(None, p, day(0));

    assert_eq!((h.start_date(), *h.start_point()), (day(0), p));
    assert_eq!((h.end_date(), *h.end_point()), (day(0), p));
    assert!(h.middle_prices().is_empty());
}

#[test]
fn scenario_b_price_change_records_two_breakpoints() {
    let policy = RetentionPolicy::default();
    let a = apply_observation(None, point(100.0, 100.0, 0.0), day(0), &policy).unwrap();
    let b = apply_observation(Some(a.history), point(90.0, 80.0, 11.0), day(5), &policy).unwrap();

    assert!(b.changed);
    assert_eq!(b.pruning, PruneAction::Untouched);

    let h = b.history;
    let expected: BTreeMap<_, _> = [
        (day(0), point(100.0, 100.0, 0.0)),
        (day(5), point(90.0, 80.0, 11.0)),
    ]
    .into_iter()
    .collect();

    assert_eq!(h.middle_prices(), &expected);
    assert_eq!((h.end_date(), *h.end_point()), (day(5), point(90.0, 80.0, 11.0)));
    assert_eq!((h.start_date(), *h.start_point()), (day(0), point(100.0, 100.0, 0.0)));
}

#[test]
fn scenario_c_sparse_history_synthesizes_start_anchor() {
    let policy = RetentionPolicy::default();
    let original = point(100.0, 100.0, 0.0);
    let seeded = PriceHistory::new(day(0), original);

    let out = apply_observation(Some(seeded), original, day(200), &policy).unwrap();

    assert!(!out.changed);
    assert_eq!(
        out.pruning,
        PruneAction::Synthesized {
            anchor: day(20),
            dropped: 0
        }
    );
    assert_eq!(out.history.start_date(), day(20));
    assert_eq!(out.history.start_point(), &original);
    assert_eq!(out.history.span_days(day(200)), 180);
}

#[test]
fn scenario_d_boundary_breakpoint_becomes_start_anchor() {
    let policy = RetentionPolicy::default();
    let middle: BTreeMap<_, _> = [
        (day(10), point(100.0, 95.0, 5.0)),
        (day(20), point(100.0, 90.0, 10.0)),
        (day(150), point(100.0, 85.0, 15.0)),
    ]
    .into_iter()
    .collect();
    let h = PriceHistory::from_parts(
        (day(0), point(100.0, 100.0, 0.0)),
        middle,
        (day(190), point(100.0, 85.0, 15.0)),
    )
    .unwrap();

    let out = apply_observation(Some(h), point(100.0, 85.0, 15.0), day(200), &policy).unwrap();

    assert_eq!(out.history.start_date(), day(20));
    assert_eq!(out.history.start_point(), &point(100.0, 90.0, 10.0));
    assert!(!out.history.middle_prices().contains_key(&day(20)));
    assert!(!out.history.middle_prices().contains_key(&day(10)));
    assert!(out.history.middle_prices().contains_key(&day(150)));
}

#[test]
fn pruning_compliant_history_is_noop() {
    let policy = RetentionPolicy::default();
    let h = fold(None, point(1.0, 1.0, 0.0), day(0));
    let h = fold(Some(h), point(2.0, 2.0, 0.0), day(100));

    let (once, action) = enforce_window_traced(h.clone(), day(100), &policy);
    assert_eq!(action, PruneAction::Untouched);
    assert_eq!(once, h);
    assert_eq!(enforce_window(once.clone(), day(100), &policy), once);
}

#[test]
fn daily_observations_for_a_year_stay_bounded() {
    let policy = RetentionPolicy::default();
    let mut h = None;

    // Price alternates weekly; observed every day.
    for n in 0..365 {
        let selling = if (n / 7) % 2 == 0 { 100.0 } else { 90.0 };
        let out = apply_observation(h.take(), point(100.0, selling, 0.0), day(n), &policy).unwrap();
        assert!(out.history.span_days(day(n)) <= 180);
        h = Some(out.history);
    }

    let h = h.unwrap();
    assert_eq!(h.span_days(day(364)), 180);
    // Two breakpoints per weekly change, all inside the window.
    assert!(h.middle_prices().len() <= 2 * (180 / 7 + 3));
    assert!(h.price_at(day(364 - 180)).is_some());
    assert!(h.price_at(day(364 - 181)).is_none());
}

#[test]
fn stored_blob_survives_round_trip_through_an_update() {
    let policy = RetentionPolicy::default();
    let h = fold(None, point(50.0, 45.0, 10.0), day(0));
    let stored = to_json(&h).unwrap();

    let reloaded = from_json(&stored).unwrap();
    let out = apply_observation(Some(reloaded), point(50.0, 40.0, 20.0), day(1), &policy).unwrap();
    let again = from_json(&to_json(&out.history).unwrap()).unwrap();

    assert_eq!(again, out.history);
}
