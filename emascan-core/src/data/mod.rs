//! Price sources and the symbol universe.

pub mod circuit_breaker;
pub mod csv_source;
pub mod provider;
pub mod synthetic;
pub mod universe;
pub mod yahoo;

pub use circuit_breaker::CircuitBreaker;
pub use csv_source::{CsvParseError, CsvSource};
pub use provider::{FetchError, PriceSource};
pub use synthetic::SyntheticSource;
pub use universe::{SymbolUniverse, UniverseError};
pub use yahoo::YahooSource;
