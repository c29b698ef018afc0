//! Exponential Moving Average (EMA).
//!
//! Recursive: EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1)
//! Seed: EMA[0] = close[0].
//!
//! There is no warmup window: a value exists from the first close onward. Early
//! values are under-converged; callers that need a minimum history enforce it
//! themselves (the crossover classifier floors on the long period).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::PriceSeries;

/// Smallest period accepted by the calculator.
pub const MIN_PERIOD: usize = 2;

/// Invalid input to the EMA calculator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EmaError {
    #[error("cannot compute EMA of an empty series ({symbol})")]
    EmptySeries { symbol: String },

    #[error("EMA period must be >= {MIN_PERIOD}, got {period}")]
    InvalidPeriod { period: usize },

    #[error("EMA series for {symbol}: {dates} dates but {values} values")]
    LengthMismatch {
        symbol: String,
        dates: usize,
        values: usize,
    },
}

/// Streaming EMA state: O(1) memory, one `update` per observation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmaState {
    alpha: f64,
    value: Option<f64>,
}

impl EmaState {
    pub fn new(period: usize) -> Result<Self, EmaError> {
        if period < MIN_PERIOD {
            return Err(EmaError::InvalidPeriod { period });
        }
        Ok(Self {
            alpha: smoothing(period),
            value: None,
        })
    }

    /// Feed the next close and return the updated EMA.
    pub fn update(&mut self, close: f64) -> f64 {
        let next = match self.value {
            None => close,
            Some(prev) => self.alpha * close + (1.0 - self.alpha) * prev,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

/// Smoothing constant for a period.
pub fn smoothing(period: usize) -> f64 {
    2.0 / (period as f64 + 1.0)
}

/// EMA values index-aligned with a price series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmaSeries {
    symbol: String,
    period: usize,
    dates: Vec<NaiveDate>,
    values: Vec<f64>,
}

impl EmaSeries {
    /// Wrap precomputed EMA values. `dates` and `values` must have equal length.
    pub fn from_parts(
        symbol: impl Into<String>,
        period: usize,
        dates: Vec<NaiveDate>,
        values: Vec<f64>,
    ) -> Result<Self, EmaError> {
        let symbol = symbol.into();
        if period < MIN_PERIOD {
            return Err(EmaError::InvalidPeriod { period });
        }
        if dates.len() != values.len() {
            return Err(EmaError::LengthMismatch {
                symbol,
                dates: dates.len(),
                values: values.len(),
            });
        }
        Ok(Self {
            symbol,
            period,
            dates,
            values,
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn period(&self) -> usize {
        self.period
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn last(&self) -> Option<f64> {
        self.values.last().copied()
    }
}

/// Compute the EMA of a price series. Fails only for an empty series or a period < 2.
pub fn compute_ema(series: &PriceSeries, period: usize) -> Result<EmaSeries, EmaError> {
    if series.is_empty() {
        return Err(EmaError::EmptySeries {
            symbol: series.symbol().to_string(),
        });
    }
    let values = ema_values(&series.closes(), period)?;
    Ok(EmaSeries {
        symbol: series.symbol().to_string(),
        period,
        dates: series.dates(),
        values,
    })
}

/// Compute raw EMA values from a pre-extracted f64 slice.
///
/// An empty slice yields an empty vector; only the period is validated.
pub fn ema_values(values: &[f64], period: usize) -> Result<Vec<f64>, EmaError> {
    let mut state = EmaState::new(period)?;
    Ok(values.iter().map(|&v| state.update(v)).collect())
}
