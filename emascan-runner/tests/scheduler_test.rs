//! Scheduler lifecycle tests: manual trigger, cron ticks, publish semantics.

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use emascan_core::data::{SymbolUniverse, SyntheticSource};
use emascan_runner::{
    cron_for_interval, LatestBatch, ScanJob, ScanParams, ScanScheduler, SchedulerError,
};

fn job(symbols: &[&str]) -> ScanJob {
    ScanJob::new(
        SymbolUniverse::from_symbols(symbols.iter().copied()),
        Arc::new(SyntheticSource::new()),
        ScanParams::default(),
    )
    .with_as_of(NaiveDate::from_ymd_opt(2024, 9, 30).unwrap())
}

#[tokio::test]
async fn run_now_publishes_batch() {
    let latest = Arc::new(LatestBatch::new());
    let scheduler =
        ScanScheduler::new(job(&["TCS", "INFY"]), Arc::clone(&latest), "0 0 11 * * Mon-Fri")
            .unwrap();

    assert!(latest.get().is_none());
    let batch = scheduler.run_now().await.unwrap();

    let published = latest.get().unwrap();
    assert!(Arc::ptr_eq(&batch, &published));
    assert_eq!(published.len(), 2);
    assert_eq!(latest.publish_count(), 1);
}

#[tokio::test]
async fn failed_batch_keeps_previous_result() {
    let latest = Arc::new(LatestBatch::new());

    let good = ScanScheduler::new(job(&["SBIN"]), Arc::clone(&latest), "0 0 11 * * *").unwrap();
    good.run_now().await.unwrap();
    let before = latest.get().unwrap();

    let empty = ScanScheduler::new(job(&[]), Arc::clone(&latest), "0 0 11 * * *").unwrap();
    let err = empty.run_now().await.unwrap_err();
    assert!(matches!(err, SchedulerError::Batch(_)));

    let after = latest.get().unwrap();
    assert!(Arc::ptr_eq(&before, &after));
    assert_eq!(latest.publish_count(), 1);
}

#[tokio::test]
async fn invalid_cron_is_rejected() {
    let latest = Arc::new(LatestBatch::new());
    let result = ScanScheduler::new(job(&["TCS"]), latest, "not a cron");
    assert!(matches!(result, Err(SchedulerError::InvalidCron { .. })));
}

#[tokio::test]
async fn start_stop_lifecycle() {
    let latest = Arc::new(LatestBatch::new());
    let scheduler =
        ScanScheduler::new(job(&["TCS"]), Arc::clone(&latest), "0 0 11 * * *").unwrap();

    assert!(!scheduler.is_running().await);
    assert!(scheduler.next_run().is_some());

    scheduler.start().await.unwrap();
    assert!(scheduler.is_running().await);
    assert!(matches!(
        scheduler.start().await,
        Err(SchedulerError::AlreadyRunning)
    ));

    scheduler.stop().await;
    assert!(!scheduler.is_running().await);

    // Restart after stop is allowed.
    scheduler.start().await.unwrap();
    scheduler.stop().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn cron_ticks_publish_batches() {
    let latest = Arc::new(LatestBatch::new());
    let mut rx = latest.subscribe();
    let expr = cron_for_interval(1).unwrap();
    let scheduler = ScanScheduler::new(job(&["TCS", "INFY"]), Arc::clone(&latest), &expr).unwrap();

    scheduler.start().await.unwrap();

    // A once-per-second schedule publishes well within five seconds.
    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no batch published within 5s")
        .unwrap();
    scheduler.stop().await;

    let batch = latest.get().unwrap();
    assert_eq!(batch.len(), 2);
    assert!(latest.publish_count() >= 1);
}
