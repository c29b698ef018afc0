//! Yahoo Finance price source.
//!
//! Fetches daily closes from Yahoo's v8 chart API. Handles rate limiting,
//! retries with exponential backoff, response parsing, and the circuit breaker.
//! NSE listings are addressed with a `.NS` suffix on Yahoo; the suffix is
//! configurable so universes can hold bare exchange tickers.
//!
//! Yahoo Finance has no official API and is subject to unannounced format changes.
//! The CSV source is the fallback when Yahoo is unavailable.

use super::circuit_breaker::CircuitBreaker;
use super::provider::{FetchError, PriceSource};
use crate::domain::{PricePoint, PriceSeries};
use chrono::NaiveDate;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Yahoo Finance v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    close: Vec<Option<f64>>,
}

/// Yahoo Finance price source.
pub struct YahooSource {
    client: reqwest::blocking::Client,
    circuit_breaker: Arc<CircuitBreaker>,
    symbol_suffix: String,
    max_retries: u32,
    base_delay: Duration,
}

impl YahooSource {
    pub fn new(
        circuit_breaker: Arc<CircuitBreaker>,
        symbol_suffix: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .user_agent("Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36")
            .build()
            .map_err(|e| FetchError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            circuit_breaker,
            symbol_suffix: symbol_suffix.into(),
            max_retries: 3,
            base_delay: Duration::from_millis(500),
        })
    }

    /// Ticker as Yahoo knows it: `RELIANCE` → `RELIANCE.NS`.
    fn provider_symbol(&self, symbol: &str) -> String {
        if self.symbol_suffix.is_empty() || symbol.ends_with(&self.symbol_suffix) {
            symbol.to_string()
        } else {
            format!("{symbol}{}", self.symbol_suffix)
        }
    }

    /// Build the chart API URL for a symbol and date range.
    fn chart_url(symbol: &str, start: NaiveDate, end: NaiveDate) -> String {
        let start_ts = start.and_time(chrono::NaiveTime::MIN).and_utc().timestamp();
        // period2 is exclusive; the day after `end` keeps `end` itself in range.
        let end_ts = (end + chrono::Duration::days(1))
            .and_time(chrono::NaiveTime::MIN)
            .and_utc()
            .timestamp();
        format!(
            "https://query2.finance.yahoo.com/v8/finance/chart/{symbol}\
             ?period1={start_ts}&period2={end_ts}&interval=1d"
        )
    }

    /// Parse the chart API response into a price series under `symbol`.
    ///
    /// Rows without a close (holidays, halted days) are dropped. Yahoo sometimes
    /// repeats the current session as a second row with the same date; the later
    /// row wins.
    fn parse_response(symbol: &str, resp: ChartResponse) -> Result<PriceSeries, FetchError> {
        let result = resp.chart.result.ok_or_else(|| {
            if let Some(err) = resp.chart.error {
                if err.code == "Not Found" {
                    FetchError::SymbolNotFound {
                        symbol: symbol.to_string(),
                    }
                } else {
                    FetchError::ResponseFormatChanged(format!("{}: {}", err.code, err.description))
                }
            } else {
                FetchError::ResponseFormatChanged("empty result with no error".into())
            }
        })?;

        let data = result
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("result array is empty".into()))?;

        // A listing with no trades in range has no timestamp array at all.
        let Some(timestamps) = data.timestamp else {
            return Ok(PriceSeries::empty(symbol));
        };

        let quote = data
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or_else(|| FetchError::ResponseFormatChanged("no quote data".into()))?;

        let mut by_date: BTreeMap<NaiveDate, f64> = BTreeMap::new();
        for (i, &ts) in timestamps.iter().enumerate() {
            let date = chrono::DateTime::from_timestamp(ts, 0)
                .map(|dt| dt.date_naive())
                .ok_or_else(|| {
                    FetchError::ResponseFormatChanged(format!("invalid timestamp: {ts}"))
                })?;
            if let Some(close) = quote.close.get(i).copied().flatten() {
                by_date.insert(date, close);
            }
        }

        let points = by_date
            .into_iter()
            .map(|(date, close)| PricePoint::new(date, close))
            .collect();
        Ok(PriceSeries::new(symbol, points)?)
    }

    /// Execute the HTTP request with retry and circuit breaker logic.
    fn fetch_with_retry(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        if !self.circuit_breaker.is_allowed() {
            return Err(FetchError::CircuitBreakerTripped);
        }

        let url = Self::chart_url(&self.provider_symbol(symbol), start, end);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.base_delay * 2u32.pow(attempt - 1);
                tracing::debug!(symbol, attempt, ?delay, "yahoo: retrying");
                std::thread::sleep(delay);
            }

            if !self.circuit_breaker.is_allowed() {
                return Err(FetchError::CircuitBreakerTripped);
            }

            match self.client.get(&url).send() {
                Ok(resp) => {
                    let status = resp.status();

                    if status == reqwest::StatusCode::FORBIDDEN {
                        self.circuit_breaker.trip();
                        return Err(FetchError::CircuitBreakerTripped);
                    }

                    if status == reqwest::StatusCode::NOT_FOUND {
                        return Err(FetchError::SymbolNotFound {
                            symbol: symbol.to_string(),
                        });
                    }

                    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                        self.circuit_breaker.record_failure();
                        let retry_after = resp
                            .headers()
                            .get("retry-after")
                            .and_then(|v| v.to_str().ok())
                            .and_then(|v| v.parse::<u64>().ok())
                            .unwrap_or(60);
                        last_error = Some(FetchError::RateLimited {
                            retry_after_secs: retry_after,
                        });
                        continue;
                    }

                    if !status.is_success() {
                        self.circuit_breaker.record_failure();
                        last_error = Some(FetchError::Other(format!("HTTP {status} for {symbol}")));
                        continue;
                    }

                    let chart: ChartResponse = resp.json().map_err(|e| {
                        FetchError::ResponseFormatChanged(format!(
                            "failed to parse response for {symbol}: {e}"
                        ))
                    })?;

                    let series = Self::parse_response(symbol, chart)?;
                    self.circuit_breaker.record_success();
                    return Ok(series.between(start, end));
                }
                Err(e) => {
                    self.circuit_breaker.record_failure();
                    if e.is_timeout() {
                        last_error = Some(FetchError::Timeout(e.to_string()));
                        continue;
                    }
                    if e.is_connect() {
                        last_error = Some(FetchError::NetworkUnreachable(e.to_string()));
                        continue;
                    }
                    return Err(FetchError::NetworkUnreachable(e.to_string()));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::Other("max retries exceeded".into())))
    }
}

impl PriceSource for YahooSource {
    fn name(&self) -> &str {
        "yahoo_finance"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        self.fetch_with_retry(symbol, start, end)
    }

    fn is_available(&self) -> bool {
        self.circuit_breaker.is_allowed()
    }
}
