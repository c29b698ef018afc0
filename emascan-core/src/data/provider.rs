//! Price source trait and structured fetch errors.
//!
//! The PriceSource trait abstracts over where closes come from (Yahoo Finance,
//! CSV upload, synthetic walk) so the batch orchestrator can swap them and tests
//! can mock them.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{PriceSeries, SeriesError};

use super::csv_source::CsvParseError;

/// Why a symbol's price history could not be obtained.
///
/// Every variant is a per-symbol failure: the orchestrator turns it into a
/// `Failed` verdict and moves on.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("hard stop: data provider has blocked requests (circuit breaker tripped)")]
    CircuitBreakerTripped,

    #[error("malformed series: {0}")]
    MalformedSeries(#[from] SeriesError),

    #[error("parse error: {0}")]
    Parse(#[from] CsvParseError),

    #[error("fetch error: {0}")]
    Other(String),
}

/// A capability that returns the daily close history of a symbol.
///
/// Implementations may block and may return fewer observations than the
/// window would hold (limited history). They must be shareable across the
/// batch worker pool.
pub trait PriceSource: Send + Sync {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch daily closes for `symbol` with `start <= date <= end`.
    fn fetch(&self, symbol: &str, start: NaiveDate, end: NaiveDate)
        -> Result<PriceSeries, FetchError>;

    /// False when the source refuses requests (e.g. circuit breaker open).
    fn is_available(&self) -> bool {
        true
    }
}
