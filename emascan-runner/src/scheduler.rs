//! Cron-driven re-evaluation of the universe.
//!
//! The scheduler owns no classification logic: on every tick (or manual
//! trigger) it runs the `ScanJob` on tokio's blocking pool and publishes the
//! finished batch to a shared `LatestBatch`. A batch that fails as a whole is
//! logged and the previously published batch stays in place.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use cron::Schedule;
use thiserror::Error;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use emascan_core::data::{PriceSource, SymbolUniverse};

use crate::batch::{run_batch, BatchError, BatchResult, ScanParams};
use crate::latest::LatestBatch;

#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid cron expression '{expr}': {message}")]
    InvalidCron { expr: String, message: String },

    #[error("invalid schedule: {0}")]
    InvalidSchedule(String),

    #[error("scheduler is already running")]
    AlreadyRunning,

    #[error(transparent)]
    Batch(#[from] BatchError),

    #[error("batch task did not complete: {0}")]
    Join(String),
}

/// Everything one batch needs, bundled so it can move onto a worker thread.
pub struct ScanJob {
    pub universe: SymbolUniverse,
    pub source: Arc<dyn PriceSource>,
    pub params: ScanParams,
    /// Fixed evaluation date. `None` evaluates as of today (UTC) on every run.
    pub as_of: Option<NaiveDate>,
}

impl ScanJob {
    pub fn new(universe: SymbolUniverse, source: Arc<dyn PriceSource>, params: ScanParams) -> Self {
        Self {
            universe,
            source,
            params,
            as_of: None,
        }
    }

    pub fn with_as_of(mut self, as_of: NaiveDate) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn resolve_as_of(&self) -> NaiveDate {
        self.as_of.unwrap_or_else(|| Utc::now().date_naive())
    }

    /// Run one batch synchronously.
    pub fn run(&self, as_of: NaiveDate) -> Result<BatchResult, BatchError> {
        run_batch(&self.universe, self.source.as_ref(), &self.params, as_of)
    }
}

/// Cron expression firing every `seconds`.
///
/// Sub-minute intervals use the seconds field, sub-hour intervals the
/// minutes field, longer ones the hours field (capped at once a day).
pub fn cron_for_interval(seconds: u64) -> Result<String, SchedulerError> {
    match seconds {
        0 => Err(SchedulerError::InvalidSchedule(
            "interval must be at least 1 second".into(),
        )),
        1..=59 => Ok(format!("*/{seconds} * * * * *")),
        60..=3599 => Ok(format!("0 */{} * * * *", seconds / 60)),
        3600..=86_399 => Ok(format!("0 0 */{} * * *", seconds / 3600)),
        _ => Ok("0 0 0 * * *".to_string()),
    }
}

/// Cron expression firing once a day at `hour:minute` UTC.
pub fn cron_daily_at(hour: u32, minute: u32) -> Result<String, SchedulerError> {
    if hour > 23 || minute > 59 {
        return Err(SchedulerError::InvalidSchedule(format!(
            "invalid time of day {hour:02}:{minute:02}"
        )));
    }
    Ok(format!("0 {minute} {hour} * * *"))
}

/// Parse a 6- or 7-field cron expression (seconds first, UTC).
pub fn parse_cron(expr: &str) -> Result<Schedule, SchedulerError> {
    Schedule::from_str(expr).map_err(|e| SchedulerError::InvalidCron {
        expr: expr.to_string(),
        message: e.to_string(),
    })
}

async fn run_and_publish(
    job: Arc<ScanJob>,
    latest: &LatestBatch,
) -> Result<Arc<BatchResult>, SchedulerError> {
    let as_of = job.resolve_as_of();
    let batch = tokio::task::spawn_blocking(move || job.run(as_of))
        .await
        .map_err(|e| SchedulerError::Join(e.to_string()))??;
    Ok(latest.publish(batch))
}

pub struct ScanScheduler {
    job: Arc<ScanJob>,
    latest: Arc<LatestBatch>,
    schedule: Schedule,
    cron_expr: String,
    handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl ScanScheduler {
    pub fn new(
        job: ScanJob,
        latest: Arc<LatestBatch>,
        cron_expr: &str,
    ) -> Result<Self, SchedulerError> {
        let schedule = parse_cron(cron_expr)?;
        info!(
            cron = %cron_expr,
            symbols = job.universe.len(),
            source = job.source.name(),
            "scheduler: created"
        );
        Ok(Self {
            job: Arc::new(job),
            latest,
            schedule,
            cron_expr: cron_expr.to_string(),
            handle: Arc::new(RwLock::new(None)),
        })
    }

    pub fn cron_expr(&self) -> &str {
        &self.cron_expr
    }

    pub fn latest(&self) -> &Arc<LatestBatch> {
        &self.latest
    }

    /// Manual trigger: run one batch now and publish it.
    pub async fn run_now(&self) -> Result<Arc<BatchResult>, SchedulerError> {
        info!("scheduler: manual run");
        run_and_publish(Arc::clone(&self.job), &self.latest).await
    }

    /// Next tick of the schedule after now.
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.upcoming(Utc).next()
    }

    /// Spawn the timer task. Fails if a task is already running.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut guard = self.handle.write().await;
        if guard.as_ref().is_some_and(|h| !h.is_finished()) {
            return Err(SchedulerError::AlreadyRunning);
        }

        let job = Arc::clone(&self.job);
        let latest = Arc::clone(&self.latest);
        let schedule = self.schedule.clone();

        let handle = tokio::spawn(async move {
            info!("scheduler: started, waiting for next tick");
            loop {
                let Some(next_tick) = schedule.upcoming(Utc).next() else {
                    warn!("scheduler: schedule has no upcoming ticks, stopping");
                    break;
                };
                let wait = (next_tick - Utc::now()).to_std().unwrap_or_default();
                tokio::time::sleep(wait).await;

                info!(tick = %next_tick, "scheduler: tick");
                match run_and_publish(Arc::clone(&job), &latest).await {
                    Ok(batch) => {
                        let summary = batch.summary();
                        info!(
                            flagged = summary.flagged(),
                            failed = summary.failed,
                            "scheduler: batch published"
                        );
                    }
                    Err(e) => {
                        error!(error = %e, "scheduler: batch failed, keeping previous result");
                    }
                }
            }
        });

        *guard = Some(handle);
        info!(cron = %self.cron_expr, "scheduler: started successfully");
        Ok(())
    }

    /// Abort the timer task. An in-flight batch on the blocking pool runs to
    /// completion but is no longer published.
    pub async fn stop(&self) {
        let mut handle = self.handle.write().await;
        if let Some(h) = handle.take() {
            h.abort();
            info!("scheduler: stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
