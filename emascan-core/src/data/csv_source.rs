//! CSV price source.
//!
//! Reads a single file with `Symbol, Date, Close` columns (header names are
//! case-insensitive, extra columns are ignored, dates are `YYYY-MM-DD`), groups
//! the rows by symbol and sorts each group by date.
//!
//! A bad row only poisons its own symbol: the error is stored and handed back
//! from `fetch` for that symbol, while every other symbol in the file stays
//! usable. Only file-level problems (unreadable file, missing column) fail
//! construction.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use super::provider::{FetchError, PriceSource};
use crate::domain::{PricePoint, PriceSeries, SeriesError};

/// Malformed externally supplied price data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CsvParseError {
    #[error("failed to read {path}: {message}")]
    Io { path: String, message: String },

    #[error("missing required column '{column}'")]
    MissingColumn { column: &'static str },

    #[error("line {line}: {message}")]
    Malformed { line: u64, message: String },

    #[error("{symbol} line {line}: unparsable date '{value}' (expected YYYY-MM-DD)")]
    InvalidDate {
        symbol: String,
        line: u64,
        value: String,
    },

    #[error("{symbol} line {line}: unparsable close '{value}'")]
    InvalidClose {
        symbol: String,
        line: u64,
        value: String,
    },

    #[error(transparent)]
    Series(#[from] SeriesError),
}

/// Price source backed by an in-memory copy of a CSV file.
#[derive(Debug, Clone, Default)]
pub struct CsvSource {
    series: BTreeMap<String, Result<PriceSeries, CsvParseError>>,
}

struct Columns {
    symbol: usize,
    date: usize,
    close: usize,
}

impl Columns {
    fn locate(headers: &csv::StringRecord) -> Result<Self, CsvParseError> {
        let find = |column: &'static str| {
            headers
                .iter()
                .position(|h| h.trim().eq_ignore_ascii_case(column))
                .ok_or(CsvParseError::MissingColumn { column })
        };
        Ok(Self {
            symbol: find("symbol")?,
            date: find("date")?,
            close: find("close")?,
        })
    }
}

impl CsvSource {
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, CsvParseError> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| CsvParseError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_reader(file)
    }

    pub fn from_csv_str(content: &str) -> Result<Self, CsvParseError> {
        Self::from_reader(content.as_bytes())
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self, CsvParseError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = rdr.headers().map_err(|e| CsvParseError::Malformed {
            line: 1,
            message: e.to_string(),
        })?;
        let cols = Columns::locate(headers)?;

        let mut groups: BTreeMap<String, Result<Vec<PricePoint>, CsvParseError>> =
            BTreeMap::new();

        for record in rdr.byte_records() {
            let record = record.map_err(|e| CsvParseError::Malformed {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                message: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let Ok(symbol) = field(&record, cols.symbol) else {
                tracing::warn!(line, "csv: skipping row with non-UTF-8 symbol");
                continue;
            };
            if symbol.is_empty() {
                tracing::debug!(line, "csv: skipping row without symbol");
                continue;
            }

            let entry = groups
                .entry(symbol.to_string())
                .or_insert_with(|| Ok(Vec::new()));
            // First error for a symbol wins; later rows cannot repair it.
            if entry.is_err() {
                continue;
            }

            match parse_row(symbol, line, &record, &cols) {
                Ok(point) => {
                    if let Ok(points) = entry {
                        points.push(point);
                    }
                }
                Err(e) => *entry = Err(e),
            }
        }

        let series = groups
            .into_iter()
            .map(|(symbol, points)| {
                let series = points.and_then(|p| {
                    PriceSeries::from_unsorted(symbol.clone(), p).map_err(CsvParseError::from)
                });
                if let Err(e) = &series {
                    tracing::warn!(symbol = %symbol, error = %e, "csv: rejected symbol");
                }
                (symbol, series)
            })
            .collect();

        Ok(Self { series })
    }

    /// Every symbol present in the file, including ones that failed to parse.
    pub fn symbols(&self) -> Vec<String> {
        self.series.keys().cloned().collect()
    }

    /// Latest observation date across all well-formed symbols.
    pub fn last_date(&self) -> Option<NaiveDate> {
        self.series
            .values()
            .filter_map(|s| s.as_ref().ok())
            .filter_map(PriceSeries::last_date)
            .max()
    }

    pub fn len(&self) -> usize {
        self.series.len()
    }

    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }
}

/// Field `idx` as trimmed UTF-8. Missing fields read as empty.
fn field(record: &csv::ByteRecord, idx: usize) -> Result<&str, std::str::Utf8Error> {
    std::str::from_utf8(record.get(idx).unwrap_or(b"")).map(str::trim)
}

fn parse_row(
    symbol: &str,
    line: u64,
    record: &csv::ByteRecord,
    cols: &Columns,
) -> Result<PricePoint, CsvParseError> {
    let text = move |idx: usize, column: &str| {
        field(record, idx).map_err(|e| CsvParseError::Malformed {
            line,
            message: format!("{symbol}: invalid UTF-8 in {column} field: {e}"),
        })
    };

    let raw_date = text(cols.date, "date")?;
    let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
        CsvParseError::InvalidDate {
            symbol: symbol.to_string(),
            line,
            value: raw_date.to_string(),
        }
    })?;

    let raw_close = text(cols.close, "close")?;
    let close = raw_close
        .parse::<f64>()
        .map_err(|_| CsvParseError::InvalidClose {
            symbol: symbol.to_string(),
            line,
            value: raw_close.to_string(),
        })?;

    Ok(PricePoint::new(date, close))
}

impl PriceSource for CsvSource {
    fn name(&self) -> &str {
        "csv"
    }

    fn fetch(
        &self,
        symbol: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PriceSeries, FetchError> {
        match self.series.get(symbol) {
            Some(Ok(series)) => Ok(series.between(start, end)),
            Some(Err(e)) => Err(FetchError::Parse(e.clone())),
            None => Err(FetchError::SymbolNotFound {
                symbol: symbol.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn all_time() -> (NaiveDate, NaiveDate) {
        (d(1990, 1, 1), d(2100, 1, 1))
    }

    #[test]
    fn groups_and_sorts_by_symbol() {
        let src = CsvSource::from_csv_str(
            "Symbol,Date,Close\n\
             TCS,2024-01-03,3700\n\
             INFY,2024-01-02,1500.5\n\
             TCS,2024-01-02,3650\n",
        )
        .unwrap();
        assert_eq!(src.symbols(), vec!["INFY".to_string(), "TCS".to_string()]);

        let (start, end) = all_time();
        let tcs = src.fetch("TCS", start, end).unwrap();
        assert_eq!(tcs.closes(), vec![3650.0, 3700.0]);
        assert_eq!(src.last_date(), Some(d(2024, 1, 3)));
    }

    #[test]
    fn headers_are_case_insensitive_and_extra_columns_ignored() {
        let src = CsvSource::from_csv_str(
            "date, CLOSE ,volume,symbol\n2024-02-01,10.0,100,SBIN\n",
        )
        .unwrap();
        let (start, end) = all_time();
        assert_eq!(src.fetch("SBIN", start, end).unwrap().len(), 1);
    }

    #[test]
    fn missing_column_fails_construction() {
        let err = CsvSource::from_csv_str("Symbol,Date\nTCS,2024-01-01\n").unwrap_err();
        assert_eq!(err, CsvParseError::MissingColumn { column: "close" });
    }

    #[test]
    fn bad_date_only_affects_its_symbol() {
        let src = CsvSource::from_csv_str(
            "Symbol,Date,Close\n\
             TCS,2024-01-02,3650\n\
             INFY,02/01/2024,1500\n\
             INFY,2024-01-03,1510\n",
        )
        .unwrap();
        let (start, end) = all_time();
        assert!(src.fetch("TCS", start, end).is_ok());
        match src.fetch("INFY", start, end) {
            Err(FetchError::Parse(CsvParseError::InvalidDate { symbol, value, .. })) => {
                assert_eq!(symbol, "INFY");
                assert_eq!(value, "02/01/2024");
            }
            other => panic!("expected InvalidDate, got {other:?}"),
        }
    }

    #[test]
    fn non_utf8_close_only_affects_its_symbol() {
        let src = CsvSource::from_reader(
            &b"Symbol,Date,Close\nTCS,2024-01-02,3650\nINFY,2024-01-02,\xff\xfe\n"[..],
        )
        .unwrap();
        let (start, end) = all_time();
        assert_eq!(src.fetch("TCS", start, end).unwrap().closes(), vec![3650.0]);
        assert!(matches!(
            src.fetch("INFY", start, end),
            Err(FetchError::Parse(CsvParseError::Malformed { line: 3, .. }))
        ));
    }

    #[test]
    fn non_utf8_symbol_row_is_dropped() {
        let src = CsvSource::from_reader(
            &b"Symbol,Date,Close\n\xff,2024-01-02,1\nSBIN,2024-01-02,600\n"[..],
        )
        .unwrap();
        assert_eq!(src.symbols(), vec!["SBIN".to_string()]);
    }

    #[test]
    fn bad_close_and_duplicate_date_are_parse_errors() {
        let src = CsvSource::from_csv_str(
            "Symbol,Date,Close\n\
             A,2024-01-02,abc\n\
             B,2024-01-02,10\n\
             B,2024-01-02,11\n",
        )
        .unwrap();
        let (start, end) = all_time();
        assert!(matches!(
            src.fetch("A", start, end),
            Err(FetchError::Parse(CsvParseError::InvalidClose { .. }))
        ));
        assert!(matches!(
            src.fetch("B", start, end),
            Err(FetchError::Parse(CsvParseError::Series(
                SeriesError::DuplicateDate { .. }
            )))
        ));
        // Neither symbol contributes to the file's last date.
        assert_eq!(src.last_date(), None);
    }

    #[test]
    fn unknown_symbol_is_not_found() {
        let src = CsvSource::from_csv_str("Symbol,Date,Close\n").unwrap();
        assert!(src.is_empty());
        let (start, end) = all_time();
        assert!(matches!(
            src.fetch("HDFCBANK", start, end),
            Err(FetchError::SymbolNotFound { .. })
        ));
    }

    #[test]
    fn fetch_respects_window() {
        let src = CsvSource::from_csv_str(
            "Symbol,Date,Close\n\
             X,2024-01-01,1\n\
             X,2024-01-02,2\n\
             X,2024-01-03,3\n",
        )
        .unwrap();
        let s = src.fetch("X", d(2024, 1, 2), d(2024, 1, 2)).unwrap();
        assert_eq!(s.closes(), vec![2.0]);
    }

    #[test]
    fn from_path_reports_missing_file() {
        let err = CsvSource::from_path("/nonexistent/prices.csv").unwrap_err();
        assert!(matches!(err, CsvParseError::Io { .. }));
    }
}
