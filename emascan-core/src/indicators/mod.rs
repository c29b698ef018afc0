//! Moving-average indicators.
//!
//! Only the exponential moving average is needed by the crossover scan. The
//! recurrence is exposed three ways: a streaming `EmaState`, `ema_values` over a
//! raw slice, and `compute_ema` over a validated `PriceSeries`.

pub mod ema;

pub use ema::{compute_ema, ema_values, EmaError, EmaSeries, EmaState};

/// Build a daily `PriceSeries` from closes for testing.
///
/// Dates start at 2024-01-01 and advance one calendar day per close.
#[cfg(test)]
pub fn make_series(symbol: &str, closes: &[f64]) -> crate::domain::PriceSeries {
    use crate::domain::{PricePoint, PriceSeries};
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let points = closes
        .iter()
        .enumerate()
        .map(|(i, &close)| PricePoint::new(base_date + chrono::Duration::days(i as i64), close))
        .collect();
    PriceSeries::new(symbol, points).unwrap()
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for indicator tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
