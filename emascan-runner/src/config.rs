//! TOML configuration.
//!
//! ```toml
//! [scan]
//! short_period = 50
//! long_period = 200
//! lookback = 5
//! approach_threshold = 0.005
//! history_days = 400
//! parallel = true
//!
//! [universe]
//! file = "universe.toml"          # optional
//! indices = ["NIFTY 50"]          # optional selection
//! [universe.lists]                # optional inline lists
//! watchlist = ["IRFC", "ZOMATO"]
//!
//! [source]
//! kind = "yahoo"                  # yahoo | csv | synthetic
//! symbol_suffix = ".NS"
//! timeout_secs = 30
//! csv_path = "prices.csv"         # required for kind = "csv"
//!
//! [schedule]
//! cron = "0 0 11 * * Mon-Fri"     # UTC
//! run_on_start = true
//! ```
//!
//! Every section is optional. Relative paths resolve against the directory of
//! the config file.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use emascan_core::data::{
    CircuitBreaker, CsvParseError, CsvSource, FetchError, PriceSource, SymbolUniverse,
    SyntheticSource, UniverseError, YahooSource,
};
use emascan_core::CrossoverParams;

use crate::batch::ScanParams;
use crate::scheduler::{parse_cron, ScanJob};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error(transparent)]
    Universe(#[from] UniverseError),

    #[error("failed to load CSV prices: {0}")]
    Csv(#[from] CsvParseError),

    #[error("failed to build price source: {0}")]
    Source(#[from] FetchError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub scan: ScanSection,
    pub universe: UniverseSection,
    pub source: SourceSection,
    pub schedule: ScheduleSection,

    /// Directory relative paths resolve against. Set by `from_file`.
    #[serde(skip)]
    pub base_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSection {
    pub short_period: usize,
    pub long_period: usize,
    pub lookback: usize,
    pub approach_threshold: f64,
    pub history_days: u32,
    pub parallel: bool,
}

impl Default for ScanSection {
    fn default() -> Self {
        let params = ScanParams::default();
        Self {
            short_period: params.short_period,
            long_period: params.long_period,
            lookback: params.crossover.lookback,
            approach_threshold: params.crossover.approach_threshold,
            history_days: params.history_days,
            parallel: params.parallel,
        }
    }
}

impl ScanSection {
    pub fn to_params(&self) -> ScanParams {
        ScanParams {
            short_period: self.short_period,
            long_period: self.long_period,
            crossover: CrossoverParams {
                lookback: self.lookback,
                approach_threshold: self.approach_threshold,
            },
            history_days: self.history_days,
            parallel: self.parallel,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UniverseSection {
    pub file: Option<PathBuf>,
    pub lists: BTreeMap<String, Vec<String>>,
    /// Names of lists to union. Empty means all lists.
    pub indices: Vec<String>,
}

impl UniverseSection {
    /// True when a file or inline lists were given.
    pub fn is_configured(&self) -> bool {
        self.file.is_some() || !self.lists.is_empty()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Yahoo,
    Csv,
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub kind: SourceKind,
    pub symbol_suffix: String,
    pub timeout_secs: u64,
    pub csv_path: Option<PathBuf>,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            kind: SourceKind::Yahoo,
            symbol_suffix: ".NS".into(),
            timeout_secs: 30,
            csv_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleSection {
    pub cron: String,
    pub run_on_start: bool,
}

impl Default for ScheduleSection {
    fn default() -> Self {
        Self {
            // 11:00 UTC, after the NSE close (15:30 IST).
            cron: "0 0 11 * * Mon-Fri".into(),
            run_on_start: true,
        }
    }
}

impl ScanConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        config.base_dir = path.parent().map(Path::to_path_buf);
        Ok(config)
    }

    /// Parse and validate a config string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.scan.to_params().validate()?;
        if self.source.timeout_secs == 0 {
            return Err(ConfigError::Invalid("source.timeout_secs must be > 0".into()));
        }
        parse_cron(&self.schedule.cron).map_err(|e| ConfigError::Invalid(e.to_string()))?;
        Ok(())
    }

    pub fn params(&self) -> ScanParams {
        self.scan.to_params()
    }

    fn resolve_path(&self, path: &Path) -> PathBuf {
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }

    /// Union of the configured lists, narrowed to `indices`.
    ///
    /// With no file and no inline lists the built-in NSE universe is used.
    pub fn resolve_universe(&self) -> Result<SymbolUniverse, ConfigError> {
        let section = &self.universe;
        let mut universe = if section.is_configured() {
            let mut u = SymbolUniverse::default();
            if let Some(file) = &section.file {
                u.merge(SymbolUniverse::from_file(&self.resolve_path(file))?);
            }
            u.merge(SymbolUniverse {
                lists: section.lists.clone(),
            });
            u
        } else {
            SymbolUniverse::default_nse()
        };
        if !section.indices.is_empty() {
            universe = universe.select(&section.indices)?;
        }
        Ok(universe)
    }

    /// Build the price source, universe and evaluation date for a run.
    ///
    /// A CSV source with no configured universe scans every symbol in the
    /// file, as of the file's last date.
    pub fn build_job(&self) -> Result<ScanJob, ConfigError> {
        let params = self.params();
        params.validate()?;

        let job = match self.source.kind {
            SourceKind::Csv => {
                let path = self.source.csv_path.as_deref().ok_or_else(|| {
                    ConfigError::Invalid("source.csv_path is required for kind = \"csv\"".into())
                })?;
                let csv = CsvSource::from_path(self.resolve_path(path))?;
                let universe = if self.universe.is_configured() {
                    self.resolve_universe()?
                } else {
                    SymbolUniverse::from_symbols(csv.symbols())
                };
                let as_of = csv.last_date();
                let mut job = ScanJob::new(universe, Arc::new(csv), params);
                job.as_of = as_of;
                job
            }
            SourceKind::Yahoo => {
                let source = YahooSource::new(
                    Arc::new(CircuitBreaker::default_provider()),
                    self.source.symbol_suffix.clone(),
                    Duration::from_secs(self.source.timeout_secs),
                )?;
                ScanJob::new(self.resolve_universe()?, Arc::new(source), params)
            }
            SourceKind::Synthetic => {
                let source: Arc<dyn PriceSource> = Arc::new(SyntheticSource::new());
                ScanJob::new(self.resolve_universe()?, source, params)
            }
        };

        tracing::debug!(
            source = job.source.name(),
            symbols = job.universe.len(),
            "config: job built"
        );
        Ok(job)
    }
}
