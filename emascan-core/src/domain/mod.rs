//! Domain types: price history in, verdicts out.

pub mod price;
pub mod verdict;

pub use price::{PricePoint, PriceSeries, SeriesError};
pub use verdict::{CrossoverVerdict, SkipReason, Verdict};
