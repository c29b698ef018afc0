//! Batch orchestration: one verdict per universe symbol.
//!
//! Each symbol runs the same pipeline independently: fetch the window of
//! closes, compute the short and long EMAs, classify. Any per-symbol error is
//! turned into a `Failed` or `Skipped` verdict for that symbol; only an empty
//! universe fails the batch as a whole.

use std::time::Instant;

use chrono::{DateTime, NaiveDate, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use emascan_core::data::{FetchError, PriceSource, SymbolUniverse};
use emascan_core::{classify, compute_ema, CrossoverParams, CrossoverVerdict, EmaError, Verdict};

use crate::config::ConfigError;

/// Current schema version for persisted batches.
pub const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// The only error that fails a whole batch.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    #[error("symbol universe is empty; nothing to scan")]
    EmptyUniverse,
}

/// Why one symbol did not reach the classifier.
#[derive(Debug, Error)]
enum SymbolError {
    #[error("{0}")]
    Fetch(#[from] FetchError),

    #[error("{0}")]
    Ema(#[from] EmaError),
}

/// Parameters of one scan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanParams {
    pub short_period: usize,
    pub long_period: usize,
    pub crossover: CrossoverParams,
    /// Calendar days of history requested per symbol.
    pub history_days: u32,
    /// Fan symbols out over the rayon pool. Results are identical either way.
    pub parallel: bool,
}

impl Default for ScanParams {
    fn default() -> Self {
        Self {
            short_period: 50,
            long_period: 200,
            crossover: CrossoverParams::default(),
            history_days: 400,
            parallel: true,
        }
    }
}

impl ScanParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| -> Result<(), ConfigError> { Err(ConfigError::Invalid(msg)) };
        if self.short_period < 2 {
            return invalid(format!("short_period must be >= 2, got {}", self.short_period));
        }
        if self.long_period <= self.short_period {
            return invalid(format!(
                "long_period ({}) must be greater than short_period ({})",
                self.long_period, self.short_period
            ));
        }
        if self.crossover.lookback < 1 {
            return invalid("lookback must be >= 1".into());
        }
        let t = self.crossover.approach_threshold;
        if !(t > 0.0 && t < 1.0) {
            return invalid(format!("approach_threshold must be in (0, 1), got {t}"));
        }
        let min_days = self.min_history_days();
        if (self.history_days as usize) < min_days {
            return invalid(format!(
                "history_days ({}) must be >= {min_days} to cover {} weekday sessions",
                self.history_days, self.long_period
            ));
        }
        Ok(())
    }

    /// Calendar days holding `long_period` weekday sessions. Exchange
    /// holidays are not counted, so this is a lower bound.
    pub fn min_history_days(&self) -> usize {
        (self.long_period * 7).div_ceil(5)
    }

    /// Minimum observations a symbol needs to be classified.
    pub fn required_history(&self) -> usize {
        self.crossover.required_history(self.long_period)
    }

    /// Inclusive fetch window ending at `as_of`.
    pub fn window(&self, as_of: NaiveDate) -> (NaiveDate, NaiveDate) {
        (
            as_of - chrono::Duration::days(i64::from(self.history_days)),
            as_of,
        )
    }
}

/// Counts per verdict category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub total: usize,
    pub none: usize,
    pub crossed_bullish: usize,
    pub crossed_bearish: usize,
    pub approaching_bullish: usize,
    pub approaching_bearish: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl BatchSummary {
    pub fn flagged(&self) -> usize {
        self.crossed_bullish
            + self.crossed_bearish
            + self.approaching_bullish
            + self.approaching_bearish
    }
}

/// Result of one orchestrator run. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchResult {
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub generated_at: DateTime<Utc>,
    pub as_of: NaiveDate,
    pub source: String,
    pub params: ScanParams,
    /// Sorted by symbol, exactly one entry per universe symbol.
    pub entries: Vec<CrossoverVerdict>,
}

impl BatchResult {
    pub fn get(&self, symbol: &str) -> Option<&Verdict> {
        self.entries
            .binary_search_by(|e| e.symbol.as_str().cmp(symbol))
            .ok()
            .map(|i| &self.entries[i].verdict)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries with a crossover or near-crossover verdict, in symbol order.
    pub fn flagged(&self) -> impl Iterator<Item = &CrossoverVerdict> {
        self.entries.iter().filter(|e| e.verdict.is_flagged())
    }

    pub fn summary(&self) -> BatchSummary {
        let mut s = BatchSummary {
            total: self.entries.len(),
            ..Default::default()
        };
        for e in &self.entries {
            match e.verdict {
                Verdict::None => s.none += 1,
                Verdict::JustCrossedBullish { .. } => s.crossed_bullish += 1,
                Verdict::JustCrossedBearish { .. } => s.crossed_bearish += 1,
                Verdict::ApproachingBullish { .. } => s.approaching_bullish += 1,
                Verdict::ApproachingBearish { .. } => s.approaching_bearish += 1,
                Verdict::Skipped { .. } => s.skipped += 1,
                Verdict::Failed { .. } => s.failed += 1,
            }
        }
        s
    }

    /// Content hash over `as_of`, the classification parameters and every entry.
    ///
    /// `generated_at`, the source name and the `parallel` switch do not affect
    /// verdicts and are left out, so reruns on identical input hash equal.
    pub fn digest(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        hasher.update(self.as_of.to_string().as_bytes());

        let p = &self.params;
        hasher.update(&(p.short_period as u64).to_le_bytes());
        hasher.update(&(p.long_period as u64).to_le_bytes());
        hasher.update(&(p.crossover.lookback as u64).to_le_bytes());
        hasher.update(&p.crossover.approach_threshold.to_le_bytes());
        hasher.update(&p.history_days.to_le_bytes());

        for e in &self.entries {
            hasher.update(e.symbol.as_bytes());
            hasher.update(e.verdict.code().as_bytes());
            if let Some(date) = e.verdict.date() {
                hasher.update(date.to_string().as_bytes());
            }
            if let Some(gap) = e.verdict.gap() {
                hasher.update(&gap.to_le_bytes());
            }
            if let Some(reason) = e.verdict.reason() {
                hasher.update(reason.as_bytes());
            }
            hasher.update(&[0u8]);
        }

        hasher.finalize().to_hex().to_string()
    }
}

/// Run one batch over `universe` with closes from `source`, as of `as_of`.
pub fn run_batch(
    universe: &SymbolUniverse,
    source: &dyn PriceSource,
    params: &ScanParams,
    as_of: NaiveDate,
) -> Result<BatchResult, BatchError> {
    let symbols: Vec<String> = universe.symbols().into_iter().collect();
    if symbols.is_empty() {
        return Err(BatchError::EmptyUniverse);
    }

    let (start, end) = params.window(as_of);
    tracing::info!(
        symbols = symbols.len(),
        source = source.name(),
        %as_of,
        parallel = params.parallel,
        "batch: starting"
    );
    let started = Instant::now();

    let scan_one = |symbol: &String| {
        let verdict = match scan_symbol(symbol, source, params, start, end) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "batch: symbol failed");
                Verdict::failed(e.to_string())
            }
        };
        tracing::debug!(symbol = %symbol, verdict = verdict.code(), "batch: classified");
        CrossoverVerdict::new(symbol.clone(), verdict)
    };

    // BTreeSet iteration is sorted; both paths keep that order.
    let entries: Vec<CrossoverVerdict> = if params.parallel {
        symbols.par_iter().map(scan_one).collect()
    } else {
        symbols.iter().map(scan_one).collect()
    };

    let result = BatchResult {
        schema_version: SCHEMA_VERSION,
        generated_at: Utc::now(),
        as_of,
        source: source.name().to_string(),
        params: params.clone(),
        entries,
    };

    let summary = result.summary();
    tracing::info!(
        total = summary.total,
        flagged = summary.flagged(),
        skipped = summary.skipped,
        failed = summary.failed,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "batch: finished"
    );

    Ok(result)
}

fn scan_symbol(
    symbol: &str,
    source: &dyn PriceSource,
    params: &ScanParams,
    start: NaiveDate,
    end: NaiveDate,
) -> Result<Verdict, SymbolError> {
    let series = source.fetch(symbol, start, end)?.between(start, end);

    let required = params.required_history();
    if series.len() < required {
        return Ok(Verdict::insufficient_history(series.len(), required));
    }

    let short = compute_ema(&series, params.short_period)?;
    let long = compute_ema(&series, params.long_period)?;
    Ok(classify(&short, &long, &params.crossover))
}

#[cfg(test)]
mod tests {
    use super::*;
    use emascan_core::data::SyntheticSource;

    fn as_of() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 9, 30).unwrap()
    }

    #[test]
    fn default_params_are_valid() {
        let p = ScanParams::default();
        assert!(p.validate().is_ok());
        assert_eq!(p.required_history(), 200);
    }

    #[test]
    fn validate_rejects_bad_periods() {
        let p = ScanParams {
            short_period: 200,
            long_period: 50,
            ..Default::default()
        };
        assert!(matches!(p.validate(), Err(ConfigError::Invalid(_))));

        let p = ScanParams {
            short_period: 1,
            ..Default::default()
        };
        assert!(p.validate().is_err());
    }

    #[test]
    fn validate_rejects_bad_threshold_and_window() {
        let mut p = ScanParams::default();
        p.crossover.approach_threshold = 0.0;
        assert!(p.validate().is_err());

        let p = ScanParams {
            history_days: 100,
            ..Default::default()
        };
        assert!(p.validate().is_err());

        let mut p = ScanParams::default();
        p.crossover.lookback = 0;
        assert!(p.validate().is_err());
    }

    #[test]
    fn history_window_is_measured_in_calendar_days() {
        // 200 calendar days hold only ~142 weekday sessions.
        let short_window = ScanParams {
            history_days: 200,
            ..Default::default()
        };
        assert_eq!(short_window.min_history_days(), 280);
        assert!(matches!(short_window.validate(), Err(ConfigError::Invalid(_))));

        let exact = ScanParams {
            history_days: 280,
            ..Default::default()
        };
        assert!(exact.validate().is_ok());
    }

    #[test]
    fn window_spans_history_days() {
        let p = ScanParams::default();
        let (start, end) = p.window(as_of());
        assert_eq!(end, as_of());
        assert_eq!((end - start).num_days(), 400);
    }

    #[test]
    fn empty_universe_fails_batch() {
        let err = run_batch(
            &SymbolUniverse::default(),
            &SyntheticSource::new(),
            &ScanParams::default(),
            as_of(),
        )
        .unwrap_err();
        assert_eq!(err, BatchError::EmptyUniverse);
    }

    #[test]
    fn entries_sorted_and_lookup_works() {
        let universe = SymbolUniverse::from_symbols(["TCS", "INFY", "SBIN"]);
        let batch = run_batch(
            &universe,
            &SyntheticSource::new(),
            &ScanParams::default(),
            as_of(),
        )
        .unwrap();
        let symbols: Vec<&str> = batch.entries.iter().map(|e| e.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["INFY", "SBIN", "TCS"]);
        assert!(batch.get("TCS").is_some());
        assert!(batch.get("WIPRO").is_none());
        assert_eq!(batch.summary().total, 3);
        assert_eq!(batch.source, "synthetic");
    }

    #[test]
    fn invalid_period_fails_each_symbol_not_batch() {
        // Unvalidated params reach the calculator; it rejects them per symbol.
        let params = ScanParams {
            short_period: 1,
            long_period: 10,
            history_days: 60,
            ..Default::default()
        };
        let universe = SymbolUniverse::from_symbols(["A", "B"]);
        let batch = run_batch(&universe, &SyntheticSource::new(), &params, as_of()).unwrap();
        assert!(batch.entries.iter().all(|e| e.verdict.is_failed()));
    }

    #[test]
    fn digest_ignores_generated_at() {
        let universe = SymbolUniverse::from_symbols(["TCS"]);
        let mut a = run_batch(
            &universe,
            &SyntheticSource::new(),
            &ScanParams::default(),
            as_of(),
        )
        .unwrap();
        let digest = a.digest();
        a.generated_at = a.generated_at + chrono::Duration::hours(3);
        assert_eq!(a.digest(), digest);
    }
}
