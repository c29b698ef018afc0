//! PriceSeries: the daily close history of one symbol.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One daily close.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub close: f64,
}

impl PricePoint {
    pub fn new(date: NaiveDate, close: f64) -> Self {
        Self { date, close }
    }

    /// A usable close is finite and strictly positive.
    pub fn is_sane(&self) -> bool {
        self.close.is_finite() && self.close > 0.0
    }
}

/// Malformed price history.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SeriesError {
    #[error("{symbol}: duplicate date {date}")]
    DuplicateDate { symbol: String, date: NaiveDate },

    #[error("{symbol}: date {date} is not after previous date {previous}")]
    OutOfOrder {
        symbol: String,
        previous: NaiveDate,
        date: NaiveDate,
    },

    #[error("{symbol}: invalid close {close} on {date}")]
    InvalidClose {
        symbol: String,
        date: NaiveDate,
        close: f64,
    },
}

/// Ordered close history for a single symbol.
///
/// Invariants (checked at construction, never broken afterwards):
/// - dates strictly increasing, so no duplicates
/// - every close finite and > 0
///
/// An empty series is valid; consumers decide whether it is enough history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    symbol: String,
    points: Vec<PricePoint>,
}

impl PriceSeries {
    /// Build a series from points that are already in date order.
    pub fn new(symbol: impl Into<String>, points: Vec<PricePoint>) -> Result<Self, SeriesError> {
        let symbol = symbol.into();
        validate(&symbol, &points)?;
        Ok(Self { symbol, points })
    }

    /// Build a series from points in any order. Duplicated dates are still rejected.
    pub fn from_unsorted(
        symbol: impl Into<String>,
        mut points: Vec<PricePoint>,
    ) -> Result<Self, SeriesError> {
        points.sort_by_key(|p| p.date);
        Self::new(symbol, points)
    }

    pub fn empty(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            points: Vec::new(),
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.close).collect()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Sub-series with `start <= date <= end`. Ordering is inherited, so no re-validation.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Self {
        let points = self
            .points
            .iter()
            .filter(|p| p.date >= start && p.date <= end)
            .copied()
            .collect();
        Self {
            symbol: self.symbol.clone(),
            points,
        }
    }
}

fn validate(symbol: &str, points: &[PricePoint]) -> Result<(), SeriesError> {
    for (i, point) in points.iter().enumerate() {
        if !point.is_sane() {
            return Err(SeriesError::InvalidClose {
                symbol: symbol.to_string(),
                date: point.date,
                close: point.close,
            });
        }
        if i == 0 {
            continue;
        }
        let previous = points[i - 1].date;
        if point.date == previous {
            return Err(SeriesError::DuplicateDate {
                symbol: symbol.to_string(),
                date: point.date,
            });
        }
        if point.date < previous {
            return Err(SeriesError::OutOfOrder {
                symbol: symbol.to_string(),
                previous,
                date: point.date,
            });
        }
    }
    Ok(())
}
