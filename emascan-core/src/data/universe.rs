//! Symbol universe: named index constituent lists.
//!
//! The universe is stored as a TOML file mapping list names (e.g. "NIFTY 50")
//! to their member symbols. A scan runs over the deduplicated union of the
//! selected lists; symbols that appear in several lists are scanned once.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("failed to read universe file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse universe TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize universe: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("unknown index list '{name}' (known: {known})")]
    UnknownList { name: String, known: String },
}

/// Named lists of symbols.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SymbolUniverse {
    #[serde(default)]
    pub lists: BTreeMap<String, Vec<String>>,
}

impl SymbolUniverse {
    /// Load a universe from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|source| UniverseError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        Ok(toml::from_str(content)?)
    }

    /// A single unnamed list, e.g. symbols discovered in a CSV file.
    pub fn from_symbols<I, S>(symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut lists = BTreeMap::new();
        lists.insert(
            "custom".to_string(),
            symbols.into_iter().map(Into::into).collect(),
        );
        Self { lists }
    }

    pub fn list_names(&self) -> Vec<&str> {
        self.lists.keys().map(|s| s.as_str()).collect()
    }

    pub fn list(&self, name: &str) -> Option<&[String]> {
        self.lists.get(name).map(|v| v.as_slice())
    }

    /// Deduplicated, trimmed, sorted union of every list.
    ///
    /// This is the canonical iteration order of a batch.
    pub fn symbols(&self) -> BTreeSet<String> {
        self.lists
            .values()
            .flatten()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    }

    /// Number of distinct symbols.
    pub fn len(&self) -> usize {
        self.symbols().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Keep only the named lists. An empty selection keeps everything.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<Self, UniverseError> {
        if names.is_empty() {
            return Ok(self.clone());
        }
        let mut lists = BTreeMap::new();
        for name in names {
            let name = name.as_ref();
            let members = self.lists.get(name).ok_or_else(|| UniverseError::UnknownList {
                name: name.to_string(),
                known: self.list_names().join(", "),
            })?;
            lists.insert(name.to_string(), members.clone());
        }
        Ok(Self { lists })
    }

    /// Merge another universe's lists into this one. Same-named lists are unioned.
    pub fn merge(&mut self, other: SymbolUniverse) {
        for (name, members) in other.lists {
            let entry = self.lists.entry(name).or_default();
            for symbol in members {
                if !entry.contains(&symbol) {
                    entry.push(symbol);
                }
            }
        }
    }

    /// Built-in NSE universe: NIFTY 50 and a slice of NIFTY NEXT 50.
    ///
    /// Symbols are bare NSE tickers; the Yahoo source appends `.NS`.
    pub fn default_nse() -> Self {
        let mut lists = BTreeMap::new();

        lists.insert(
            "NIFTY 50".into(),
            vec![
                "ADANIENT", "ADANIPORTS", "APOLLOHOSP", "ASIANPAINT", "AXISBANK", "BAJAJ-AUTO",
                "BAJAJFINSV", "BAJFINANCE", "BHARTIARTL", "BPCL", "BRITANNIA", "CIPLA",
                "COALINDIA", "DIVISLAB", "DRREDDY", "EICHERMOT", "GRASIM", "HCLTECH", "HDFCBANK",
                "HDFCLIFE", "HEROMOTOCO", "HINDALCO", "HINDUNILVR", "ICICIBANK", "INDUSINDBK",
                "INFY", "ITC", "JSWSTEEL", "KOTAKBANK", "LT", "LTIM", "M&M", "MARUTI",
                "NESTLEIND", "NTPC", "ONGC", "POWERGRID", "RELIANCE", "SBILIFE", "SBIN",
                "SUNPHARMA", "TATACONSUM", "TATAMOTORS", "TATASTEEL", "TCS", "TECHM", "TITAN",
                "ULTRACEMCO", "UPL", "WIPRO",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );

        lists.insert(
            "NIFTY NEXT 50".into(),
            vec![
                "ABB", "ADANIGREEN", "AMBUJACEM", "BANKBARODA", "BEL", "BOSCHLTD", "CANBK",
                "CHOLAFIN", "DABUR", "DLF", "GAIL", "GODREJCP", "HAVELLS", "ICICIGI",
                "ICICIPRULI", "INDIGO", "IOC", "IRCTC", "JINDALSTEL", "LICI", "MARICO",
                "PIDILITIND", "PNB", "SIEMENS", "SRF", "TATAPOWER", "TORNTPHARM", "TRENT",
                "VEDL", "ZYDUSLIFE",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        );

        Self { lists }
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, UniverseError> {
        Ok(toml::to_string_pretty(self)?)
    }
}
