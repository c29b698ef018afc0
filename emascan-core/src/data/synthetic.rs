//! Deterministic synthetic price source for offline runs and tests.
//!
//! Each symbol gets a random walk (±3% daily moves, weekdays only) seeded from
//! a BLAKE3 hash of its name, so the same symbol and window always produce the
//! same closes.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{FetchError, PriceSource};
use crate::domain::{PricePoint, PriceSeries};

/// Random-walk price source.
///
/// `with_failure` and `with_listing_date` let tests and demos reproduce the
/// unhappy paths of a real provider (unreachable symbol, recent listing).
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    start_price: f64,
    failing: BTreeSet<String>,
    listed_on: BTreeMap<String, NaiveDate>,
}

impl Default for SyntheticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SyntheticSource {
    pub fn new() -> Self {
        Self {
            start_price: 100.0,
            failing: BTreeSet::new(),
            listed_on: BTreeMap::new(),
        }
    }

    /// Every fetch for `symbol` fails as if the network were unreachable.
    pub fn with_failure(mut self, symbol: impl Into<String>) -> Self {
        self.failing.insert(symbol.into());
        self
    }

    /// No closes exist for `symbol` before `date`.
    pub fn with_listing_date(mut self, symbol: impl Into<String>, date: NaiveDate) -> Self {
        self.listed_on.insert(symbol.into(), date);
        self
    }

    fn walk(&self, symbol: &str, start: NaiveDate, end: NaiveDate) -> Vec<PricePoint> {
        let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
        let mut rng = StdRng::from_seed(seed);

        let first_day = match self.listed_on.get(symbol) {
            Some(&listed) if listed > start => listed,
            _ => start,
        };

        let mut points = Vec::new();
        let mut price = self.start_price;
        let mut current = first_day;

        while current <= end {
            let weekday = current.weekday();
            if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
                current += chrono::Duration::days(1);
                continue;
            }

            let daily_return: f64 = rng.gen_range(-0.03..0.03);
            price *= 1.0 + daily_return;
            points.push(PricePoint::new(current, price));
            current += chrono::Duration::days(1);
        }

        points
    }
}

impl PriceSource for SyntheticSource {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        if self.failing.contains(symbol) {
            return Err(FetchError::NetworkUnreachable(format!(
                "synthetic outage for {symbol}"
            )));
        }
        Ok(PriceSeries::new(symbol, self.walk(symbol, start, end))?)
    }
}
