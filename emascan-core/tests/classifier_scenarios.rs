//! Scenario tests: price paths through the calculator and classifier.
//!
//! The short/long pair here is 3/7 so that both smoothing constants (0.5 and
//! 0.25) are exact in binary floating point and every EMA value below can be
//! checked by hand.

use chrono::NaiveDate;
use emascan_core::domain::{PricePoint, PriceSeries, Verdict};
use emascan_core::{classify, compute_ema, CrossoverParams};

const SHORT: usize = 3;
const LONG: usize = 7;

fn day(i: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() + chrono::Duration::days(i as i64)
}

/// Ten flat days at 100 (both EMAs exactly 100), then `tail`.
fn flat_then(tail: &[f64]) -> PriceSeries {
    let closes: Vec<f64> = std::iter::repeat(100.0).take(10).chain(tail.iter().copied()).collect();
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &c)| PricePoint::new(day(i), c))
        .collect();
    PriceSeries::new("NIFTYBEES", points).unwrap()
}

fn scan(series: &PriceSeries, lookback: usize) -> Verdict {
    let short = compute_ema(series, SHORT).unwrap();
    let long = compute_ema(series, LONG).unwrap();
    let params = CrossoverParams {
        lookback,
        approach_threshold: 0.005,
    };
    classify(&short, &long, &params)
}

#[test]
fn scenario_dip_then_rally_is_golden_cross() {
    // GIVEN a flat history, a dip to 96 (short 98 < long 99)
    // AND a rally to 104 (short 101 > long 100.25)
    let series = flat_then(&[96.0, 104.0]);

    // WHEN the last five index pairs are scanned
    let verdict = scan(&series, 5);

    // THEN the cross is reported on the rally day
    assert_eq!(verdict, Verdict::JustCrossedBullish { date: day(11) });
}

#[test]
fn scenario_spike_then_drop_is_death_cross() {
    // GIVEN a spike to 104 (short 102 > long 101)
    // AND a drop to 96 (short 99 < long 99.75)
    let series = flat_then(&[104.0, 96.0]);

    // WHEN scanned
    let verdict = scan(&series, 5);

    // THEN a bearish cross is reported on the drop day
    assert_eq!(verdict, Verdict::JustCrossedBearish { date: day(11) });
}

#[test]
fn scenario_recovery_toward_long_is_approaching_bullish() {
    // GIVEN a dip to 96 then a recovery to 100
    // (short 98 -> 99, long 99 -> 99.25: below, rising, gap 0.25%)
    let series = flat_then(&[96.0, 100.0]);

    // WHEN scanned
    let verdict = scan(&series, 5);

    // THEN the symbol is approaching from below
    match verdict {
        Verdict::ApproachingBullish { date, gap } => {
            assert_eq!(date, day(11));
            assert!((gap - 0.25 / 99.25).abs() < 1e-12);
        }
        other => panic!("expected ApproachingBullish, got {other:?}"),
    }
}

#[test]
fn scenario_pullback_toward_long_is_approaching_bearish() {
    // GIVEN a spike to 104 then a pullback to 100
    // (short 102 -> 101, long 101 -> 100.75: above, falling, gap ~0.25%)
    let series = flat_then(&[104.0, 100.0]);

    // WHEN scanned
    let verdict = scan(&series, 5);

    // THEN the symbol is approaching from above
    assert!(matches!(
        verdict,
        Verdict::ApproachingBearish { date, .. } if date == day(11)
    ));
}

#[test]
fn scenario_approach_before_cross_reports_only_the_approach() {
    // GIVEN an approach on day 11 followed by a cross on day 12
    // (day 12: close 104, short 101.5 > long 100.4375)
    let series = flat_then(&[96.0, 100.0, 104.0]);

    // WHEN the window covers both days
    let wide = scan(&series, 5);

    // THEN the earlier approach wins and the scan stops there
    assert!(matches!(wide, Verdict::ApproachingBullish { date, .. } if date == day(11)));

    // WHEN the window covers only the last pair
    let narrow = scan(&series, 1);

    // THEN the cross is visible
    assert_eq!(narrow, Verdict::JustCrossedBullish { date: day(12) });
}

#[test]
fn scenario_flat_market_has_no_signal() {
    // GIVEN a perfectly flat history (both EMAs identical)
    let series = flat_then(&[100.0, 100.0]);

    // WHEN scanned
    // THEN equal EMAs are neither a cross nor an approach
    assert_eq!(scan(&series, 5), Verdict::None);
}

#[test]
fn scenario_young_listing_is_skipped_not_failed() {
    // GIVEN 150 daily closes and the production 50/200 pair
    let points = (0..150)
        .map(|i| PricePoint::new(day(i), 100.0 + i as f64))
        .collect();
    let series = PriceSeries::new("NEWIPO", points).unwrap();
    let short = compute_ema(&series, 50).unwrap();
    let long = compute_ema(&series, 200).unwrap();

    // WHEN classified
    let verdict = classify(&short, &long, &CrossoverParams::default());

    // THEN it is skipped for insufficient history
    assert_eq!(verdict, Verdict::insufficient_history(150, 200));
    assert_eq!(verdict.reason().unwrap(), "insufficient-history (150 observations, 200 required)");
}
