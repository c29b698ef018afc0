//! EMAScan Core: price series, EMA calculator, crossover classifier, price sources.
//!
//! This crate holds everything that is pure computation or a data adapter:
//! - Domain types (price series, verdicts)
//! - EMA recurrence over a price history
//! - Crossover classifier turning two aligned EMA series into a verdict
//! - `PriceSource` trait with Yahoo, CSV and synthetic adapters
//! - Symbol universe built from named index constituent lists
//!
//! Batch orchestration, publishing and scheduling live in `emascan-runner`.

pub mod data;
pub mod domain;
pub mod indicators;
pub mod signals;

pub use domain::{CrossoverVerdict, PricePoint, PriceSeries, SeriesError, SkipReason, Verdict};
pub use indicators::ema::{compute_ema, EmaError, EmaSeries};
pub use signals::crossover::{classify, CrossoverParams};

#[cfg(test)]
mod tests {
    use super::*;

    /// Compile-time check: types handed between batch workers and the
    /// scheduler are Send + Sync.
    #[allow(dead_code)]
    fn assert_send_sync() {
        fn require_send<T: Send>() {}
        fn require_sync<T: Sync>() {}

        require_send::<PriceSeries>();
        require_sync::<PriceSeries>();
        require_send::<EmaSeries>();
        require_sync::<EmaSeries>();
        require_send::<CrossoverVerdict>();
        require_sync::<CrossoverVerdict>();
        require_send::<CrossoverParams>();
        require_sync::<CrossoverParams>();
        require_send::<data::SymbolUniverse>();
        require_sync::<data::SymbolUniverse>();
        require_send::<data::CircuitBreaker>();
        require_sync::<data::CircuitBreaker>();
        require_send::<data::CsvSource>();
        require_sync::<data::CsvSource>();
        require_send::<data::SyntheticSource>();
        require_sync::<data::SyntheticSource>();
    }

    /// Architecture contract: the classifier sees only EMA series, never
    /// the price source. If someone threads a source or raw prices into
    /// `classify`, this stops compiling.
    #[allow(dead_code)]
    fn classifier_takes_only_ema_series(
        short: &EmaSeries,
        long: &EmaSeries,
        params: &CrossoverParams,
    ) -> Verdict {
        classify(short, long, params)
    }
}
