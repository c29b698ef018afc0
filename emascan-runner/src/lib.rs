//! EMAScan Runner: batch orchestration, publishing, scheduling, config, export.
//!
//! This crate builds on `emascan-core` to provide:
//! - The batch orchestrator: one verdict per universe symbol, per-symbol
//!   failure isolation, optional rayon fan-out
//! - `LatestBatch`, the atomically replaced slot holding the last batch
//! - A cron-driven scheduler that re-runs the batch on tokio's blocking pool
//! - TOML configuration resolving the universe and price source
//! - JSON / CSV / text exports

pub mod batch;
pub mod config;
pub mod export;
pub mod latest;
pub mod scheduler;

pub use batch::{run_batch, BatchError, BatchResult, BatchSummary, ScanParams, SCHEMA_VERSION};
pub use config::{ConfigError, ScanConfig, SourceKind};
pub use export::{export_csv, export_json, import_json, render_table, write_export};
pub use latest::LatestBatch;
pub use scheduler::{
    cron_daily_at, cron_for_interval, parse_cron, ScanJob, ScanScheduler, SchedulerError,
};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn batch_result_is_send_sync() {
        assert_send::<BatchResult>();
        assert_sync::<BatchResult>();
    }

    #[test]
    fn latest_batch_is_send_sync() {
        assert_send::<LatestBatch>();
        assert_sync::<LatestBatch>();
    }

    #[test]
    fn scan_job_is_send_sync() {
        assert_send::<ScanJob>();
        assert_sync::<ScanJob>();
    }

    #[test]
    fn scheduler_is_send_sync() {
        assert_send::<ScanScheduler>();
        assert_sync::<ScanScheduler>();
    }

    #[test]
    fn scan_params_is_send_sync() {
        assert_send::<ScanParams>();
        assert_sync::<ScanParams>();
    }
}
