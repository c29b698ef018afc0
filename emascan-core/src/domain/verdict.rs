//! Crossover verdicts: the per-symbol outcome of one scan.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Why a symbol was not classified. Expected conditions, not failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "code", rename_all = "kebab-case")]
pub enum SkipReason {
    /// Fewer observations than the long EMA period (or the lookback window) needs.
    InsufficientHistory { available: usize, required: usize },
}

impl SkipReason {
    /// Stable machine-readable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            SkipReason::InsufficientHistory { .. } => "insufficient-history",
        }
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::InsufficientHistory {
                available,
                required,
            } => write!(
                f,
                "insufficient-history ({available} observations, {required} required)"
            ),
        }
    }
}

/// Outcome of classifying one symbol.
///
/// `date` is the observation date of the index where the condition was found.
/// `gap` is the relative distance `|short - long| / long` at that index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Verdict {
    None,
    JustCrossedBullish { date: NaiveDate },
    JustCrossedBearish { date: NaiveDate },
    ApproachingBullish { date: NaiveDate, gap: f64 },
    ApproachingBearish { date: NaiveDate, gap: f64 },
    Skipped { reason: SkipReason },
    Failed { reason: String },
}

impl Verdict {
    pub fn insufficient_history(available: usize, required: usize) -> Self {
        Verdict::Skipped {
            reason: SkipReason::InsufficientHistory {
                available,
                required,
            },
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Verdict::Failed {
            reason: reason.into(),
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            Verdict::JustCrossedBullish { date }
            | Verdict::JustCrossedBearish { date }
            | Verdict::ApproachingBullish { date, .. }
            | Verdict::ApproachingBearish { date, .. } => Some(*date),
            _ => None,
        }
    }

    pub fn gap(&self) -> Option<f64> {
        match self {
            Verdict::ApproachingBullish { gap, .. } | Verdict::ApproachingBearish { gap, .. } => {
                Some(*gap)
            }
            _ => None,
        }
    }

    /// True for the four crossover / near-crossover outcomes.
    pub fn is_flagged(&self) -> bool {
        self.date().is_some()
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Verdict::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Verdict::Failed { .. })
    }

    /// Short snake_case tag, used as the CSV `verdict` column.
    pub fn code(&self) -> &'static str {
        match self {
            Verdict::None => "none",
            Verdict::JustCrossedBullish { .. } => "just_crossed_bullish",
            Verdict::JustCrossedBearish { .. } => "just_crossed_bearish",
            Verdict::ApproachingBullish { .. } => "approaching_bullish",
            Verdict::ApproachingBearish { .. } => "approaching_bearish",
            Verdict::Skipped { .. } => "skipped",
            Verdict::Failed { .. } => "failed",
        }
    }

    /// Human-readable label for terminal output.
    pub fn label(&self) -> &'static str {
        match self {
            Verdict::None => "No crossover",
            Verdict::JustCrossedBullish { .. } => "Just crossed above (bullish)",
            Verdict::JustCrossedBearish { .. } => "Just crossed below (bearish)",
            Verdict::ApproachingBullish { .. } => "Approaching from below (bullish)",
            Verdict::ApproachingBearish { .. } => "Approaching from above (bearish)",
            Verdict::Skipped { .. } => "Skipped",
            Verdict::Failed { .. } => "Failed",
        }
    }

    /// Skip/failure detail, if any.
    pub fn reason(&self) -> Option<String> {
        match self {
            Verdict::Skipped { reason } => Some(reason.to_string()),
            Verdict::Failed { reason } => Some(reason.clone()),
            _ => None,
        }
    }
}

/// A verdict tagged with the symbol it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrossoverVerdict {
    pub symbol: String,
    pub verdict: Verdict,
}

impl CrossoverVerdict {
    pub fn new(symbol: impl Into<String>, verdict: Verdict) -> Self {
        Self {
            symbol: symbol.into(),
            verdict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 6).unwrap()
    }

    #[test]
    fn skip_reason_code_is_stable() {
        let v = Verdict::insufficient_history(150, 200);
        match &v {
            Verdict::Skipped { reason } => assert_eq!(reason.code(), "insufficient-history"),
            other => panic!("expected Skipped, got {other:?}"),
        }
        assert!(v.reason().unwrap().starts_with("insufficient-history"));
        assert!(v.is_skipped());
        assert!(!v.is_flagged());
    }

    #[test]
    fn flagged_variants_carry_dates() {
        assert_eq!(Verdict::JustCrossedBullish { date: d() }.date(), Some(d()));
        assert!(Verdict::ApproachingBearish { date: d(), gap: 0.001 }.is_flagged());
        assert!(!Verdict::None.is_flagged());
        assert!(!Verdict::failed("boom").is_flagged());
    }

    #[test]
    fn serde_tags_are_snake_case() {
        let json = serde_json::to_string(&Verdict::JustCrossedBearish { date: d() }).unwrap();
        assert!(json.contains("\"kind\":\"just_crossed_bearish\""));

        let skipped = serde_json::to_string(&Verdict::insufficient_history(1, 200)).unwrap();
        assert!(skipped.contains("\"code\":\"insufficient-history\""));

        let back: Verdict = serde_json::from_str(&skipped).unwrap();
        assert_eq!(back, Verdict::insufficient_history(1, 200));
    }
}
