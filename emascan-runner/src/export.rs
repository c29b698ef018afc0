//! Export: JSON, CSV and plain-text renderings of a batch.
//!
//! JSON is the full round-trippable form and carries `schema_version`;
//! unknown (newer) versions are rejected on load. CSV is one row per symbol
//! for spreadsheets. The text table is what the CLI prints.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::batch::{BatchResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BatchResult` to pretty JSON.
pub fn export_json(batch: &BatchResult) -> Result<String> {
    serde_json::to_string_pretty(batch).context("failed to serialize BatchResult to JSON")
}

/// Deserialize a `BatchResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BatchResult> {
    let batch: BatchResult =
        serde_json::from_str(json).context("failed to deserialize BatchResult from JSON")?;
    if batch.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            batch.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(batch)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// One row per symbol.
///
/// Columns: symbol, verdict, date, gap, reason
pub fn export_csv(batch: &BatchResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["symbol", "verdict", "date", "gap", "reason"])?;

    for entry in &batch.entries {
        let v = &entry.verdict;
        let date = v.date().map(|d| d.to_string()).unwrap_or_default();
        let gap = v.gap().map(|g| format!("{g:.6}")).unwrap_or_default();
        let reason = v.reason().unwrap_or_default();
        wtr.write_record([
            entry.symbol.as_str(),
            v.code(),
            date.as_str(),
            gap.as_str(),
            reason.as_str(),
        ])?;
    }

    let bytes = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(bytes).context("CSV output is not valid UTF-8")
}

/// Write an export to disk, creating parent directories as needed.
pub fn write_export(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    std::fs::write(path, content).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Text table ─────────────────────────────────────────────────────

/// Plain-text table for terminals, followed by a one-line summary.
pub fn render_table(batch: &BatchResult, only_flagged: bool) -> String {
    let mut out = String::new();
    let p = &batch.params;
    let _ = writeln!(
        out,
        "EMA {}/{} crossover scan as of {} ({} source, lookback {}, threshold {:.2}%)",
        p.short_period,
        p.long_period,
        batch.as_of,
        batch.source,
        p.crossover.lookback,
        p.crossover.approach_threshold * 100.0
    );
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{:<14} {:<34} {:<12} {:>8}  {}",
        "Symbol", "Signal", "Date", "Gap", "Detail"
    );
    let _ = writeln!(out, "{}", "-".repeat(80));

    let rows = batch
        .entries
        .iter()
        .filter(|e| !only_flagged || e.verdict.is_flagged());
    for entry in rows {
        let v = &entry.verdict;
        let _ = writeln!(
            out,
            "{:<14} {:<34} {:<12} {:>8}  {}",
            entry.symbol,
            v.label(),
            v.date().map(|d| d.to_string()).unwrap_or_else(|| "-".into()),
            v.gap()
                .map(|g| format!("{:.3}%", g * 100.0))
                .unwrap_or_else(|| "-".into()),
            v.reason().unwrap_or_default()
        );
    }

    let s = batch.summary();
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "{} symbols: {} crossed up, {} crossed down, {} approaching up, {} approaching down, \
         {} quiet, {} skipped, {} failed",
        s.total,
        s.crossed_bullish,
        s.crossed_bearish,
        s.approaching_bullish,
        s.approaching_bearish,
        s.none,
        s.skipped,
        s.failed
    );
    out
}
