//! EMA crossover classifier: golden cross / death cross and near-cross detection.
//!
//! Scans the last `lookback` index pairs `(i-1, i)` of two aligned EMA series,
//! oldest first, and returns the verdict of the first index that produces one:
//! - exact cross: short moves from strictly below long to strictly above (bullish),
//!   or the mirror (bearish)
//! - approach: `|short - long| / long < approach_threshold` while the short EMA
//!   moves toward the long one (up when below, down when above)
//!
//! An exact cross outranks an approach at the same index. Later indices are not
//! examined once a verdict is found, so only the earliest event in the window is
//! reported.

use serde::{Deserialize, Serialize};

use crate::domain::Verdict;
use crate::indicators::EmaSeries;

/// Classifier parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrossoverParams {
    /// Number of most recent index pairs examined.
    pub lookback: usize,
    /// Relative distance below which the EMAs count as approaching. Strict `<`.
    pub approach_threshold: f64,
}

impl Default for CrossoverParams {
    fn default() -> Self {
        Self {
            lookback: 5,
            approach_threshold: 0.005,
        }
    }
}

impl CrossoverParams {
    /// Minimum series length for a given long EMA period.
    ///
    /// The long period is a hard floor regardless of the lookback.
    pub fn required_history(&self, long_period: usize) -> usize {
        (self.lookback + 1).max(long_period)
    }
}

/// Classify a pair of aligned EMA series.
///
/// Returns `Skipped(insufficient-history)` when the series are shorter than
/// `params.required_history(long.period())`.
///
/// Series that are not on the same date axis (different lengths or dates)
/// yield `Failed("misaligned ema series ...")` rather than `Skipped`: the
/// alignment precondition is a caller bug, not a history shortfall, and is
/// checked before the history floor. `run_batch` always builds both series
/// from one `PriceSeries`, so it never reaches this branch.
pub fn classify(short: &EmaSeries, long: &EmaSeries, params: &CrossoverParams) -> Verdict {
    if short.len() != long.len() || short.dates() != long.dates() {
        return Verdict::failed(format!(
            "misaligned ema series: short has {} values, long has {}",
            short.len(),
            long.len()
        ));
    }

    let n = short.len();
    let required = params.required_history(long.period());
    if n < required {
        return Verdict::insufficient_history(n, required);
    }

    let s = short.values();
    let l = long.values();
    let dates = short.dates();

    // n >= lookback + 1, so the first pair's left index is >= 0.
    for i in (n - params.lookback)..n {
        let (short_prev, short_cur) = (s[i - 1], s[i]);
        let (long_prev, long_cur) = (l[i - 1], l[i]);
        let date = dates[i];

        if short_prev < long_prev && short_cur > long_cur {
            return Verdict::JustCrossedBullish { date };
        }
        if short_prev > long_prev && short_cur < long_cur {
            return Verdict::JustCrossedBearish { date };
        }

        if long_cur <= 0.0 || !long_cur.is_finite() {
            continue;
        }
        let gap = (short_cur - long_cur).abs() / long_cur;
        if gap >= params.approach_threshold {
            continue;
        }
        if short_cur < long_cur && short_cur > short_prev {
            return Verdict::ApproachingBullish { date, gap };
        }
        if short_cur > long_cur && short_cur < short_prev {
            return Verdict::ApproachingBearish { date, gap };
        }
    }

    Verdict::None
}
