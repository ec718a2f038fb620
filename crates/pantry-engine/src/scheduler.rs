//! Background scheduling of depletion, catch-up and re-estimation.
//!
//! The loop runs startup reconciliation once, then fires the daily tick at
//! `daily_tick_time` every day, followed by re-estimation on every
//! `reestimation_interval_days`-th day. Each trigger fans out over tracked items with
//! bounded concurrency. A failing or panicking item is logged and counted; it never
//! stops the batch or the loop.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use futures::stream::{self, StreamExt};
use futures::FutureExt;
use pantry_core::ItemId;
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::clock::{latest_occurrence, next_occurrence};
use crate::engine::{PantryEngine, UnitStatus};
use crate::error::{EngineError, Result};

/// What started a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Trigger {
    /// Catch-up for days missed while the process was down.
    StartupReconciliation,
    /// The daily depletion slot.
    DailyTick,
    /// Periodic consumption rate re-estimation.
    Reestimation,
}

/// Summary of one batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TickReport {
    /// What started the batch.
    pub trigger: Trigger,
    /// When the batch started.
    pub started_at: DateTime<Utc>,
    /// Items changed.
    pub processed: usize,
    /// Items that needed no processing, or were not started because of shutdown.
    pub skipped: usize,
    /// Items whose processing failed.
    pub failed: usize,
    /// Set when the batch could not list its items at all.
    pub aborted: Option<String>,
}

impl TickReport {
    fn new(trigger: Trigger, started_at: DateTime<Utc>) -> Self {
        Self {
            trigger,
            started_at,
            processed: 0,
            skipped: 0,
            failed: 0,
            aborted: None,
        }
    }
}

/// Observable scheduler state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStatus {
    /// Startup reconciliation has finished.
    pub startup_complete: bool,
    /// Daily ticks run since start.
    pub daily_ticks: u64,
    /// Re-estimation batches run since start.
    pub reestimations: u64,
    /// The most recent batch.
    pub last_report: Option<TickReport>,
    /// The slot the loop is waiting for.
    pub next_tick_at: Option<DateTime<Utc>>,
    /// The loop has exited.
    pub stopped: bool,
}

#[derive(Debug, Clone, Copy)]
enum UnitOutcome {
    Processed,
    Skipped,
    Failed,
}

/// Drives the engine's processing units on a schedule.
pub struct Scheduler {
    engine: Arc<PantryEngine>,
    shutdown_tx: Arc<watch::Sender<bool>>,
    shutdown_rx: watch::Receiver<bool>,
    status_tx: Arc<watch::Sender<SchedulerStatus>>,
}

impl Scheduler {
    /// Create a scheduler for `engine`.
    #[must_use]
    pub fn new(engine: Arc<PantryEngine>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let (status_tx, _) = watch::channel(SchedulerStatus::default());
        Self {
            engine,
            shutdown_tx: Arc::new(shutdown_tx),
            shutdown_rx,
            status_tx: Arc::new(status_tx),
        }
    }

    /// Start of the daily slot containing `now`.
    #[must_use]
    pub fn current_slot(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        latest_occurrence(now, self.engine.config().daily_tick_time)
    }

    /// The first daily slot strictly after `now`.
    #[must_use]
    pub fn next_slot(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        next_occurrence(now, self.engine.config().daily_tick_time)
    }

    /// Whether re-estimation runs after the daily tick of `slot`.
    #[must_use]
    pub fn is_reestimation_slot(&self, slot: DateTime<Utc>) -> bool {
        let interval = i64::from(self.engine.config().reestimation_interval_days);
        i64::from(slot.date_naive().num_days_from_ce()).rem_euclid(interval) == 0
    }

    /// Catch up every tracked item on the whole days missed before the current slot.
    pub async fn run_startup_reconciliation(&self) -> TickReport {
        let boundary = self.current_slot(self.engine.now());
        let engine = &self.engine;
        self.run_batch(Trigger::StartupReconciliation, |item_id| {
            engine.catch_up_item(item_id, boundary)
        })
        .await
    }

    /// Deplete every tracked item not yet processed in the current slot.
    pub async fn run_daily_tick(&self) -> TickReport {
        let slot_start = self.current_slot(self.engine.now());
        let engine = &self.engine;
        self.run_batch(Trigger::DailyTick, |item_id| {
            engine.deplete_item(item_id, slot_start)
        })
        .await
    }

    /// Re-estimate the consumption rate of every tracked item that is due.
    pub async fn run_reestimation(&self) -> TickReport {
        let engine = &self.engine;
        self.run_batch(Trigger::Reestimation, |item_id| engine.reestimate_item(item_id))
            .await
    }

    async fn run_batch<F, Fut>(&self, trigger: Trigger, unit: F) -> TickReport
    where
        F: Fn(ItemId) -> Fut,
        Fut: Future<Output = Result<UnitStatus>>,
    {
        let mut report = TickReport::new(trigger, self.engine.now());

        let item_ids = match self.engine.tracked_item_ids().await {
            Ok(ids) => ids,
            Err(e) => {
                error!(?trigger, error = %e, "failed to list tracked items");
                report.aborted = Some(e.to_string());
                return report;
            }
        };

        let shutdown = &self.shutdown_rx;
        let outcomes: Vec<UnitOutcome> = stream::iter(item_ids)
            .map(|item_id| run_unit(trigger, item_id, shutdown, unit(item_id)))
            .buffer_unordered(self.engine.config().max_concurrent_items)
            .collect()
            .await;

        for outcome in outcomes {
            match outcome {
                UnitOutcome::Processed => report.processed += 1,
                UnitOutcome::Skipped => report.skipped += 1,
                UnitOutcome::Failed => report.failed += 1,
            }
        }

        info!(
            ?trigger,
            processed = report.processed,
            skipped = report.skipped,
            failed = report.failed,
            "batch complete"
        );
        report
    }

    /// Spawn the scheduling loop.
    #[must_use]
    pub fn start(self) -> SchedulerHandle {
        let shutdown_tx = Arc::clone(&self.shutdown_tx);
        let status_rx = self.status_tx.subscribe();
        let task = tokio::spawn(self.run());
        SchedulerHandle {
            shutdown_tx,
            status_rx,
            task,
        }
    }

    async fn run(self) {
        let mut shutdown = self.shutdown_rx.clone();
        info!("scheduler started");

        let report = self.run_startup_reconciliation().await;
        self.status_tx.send_modify(|status| {
            status.startup_complete = true;
            status.last_report = Some(report);
        });

        loop {
            if *shutdown.borrow() {
                break;
            }

            let slot = self.next_slot(self.engine.now());
            self.status_tx
                .send_modify(|status| status.next_tick_at = Some(slot));
            let clock = Arc::clone(self.engine.clock());
            tokio::select! {
                () = clock.sleep_until(slot) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    continue;
                }
            }

            if *shutdown.borrow() {
                break;
            }

            let report = self.run_daily_tick().await;
            self.status_tx.send_modify(|status| {
                status.daily_ticks += 1;
                status.last_report = Some(report);
            });

            if self.is_reestimation_slot(slot) {
                let report = self.run_reestimation().await;
                self.status_tx.send_modify(|status| {
                    status.reestimations += 1;
                    status.last_report = Some(report);
                });
            }
        }

        self.status_tx.send_modify(|status| {
            status.next_tick_at = None;
            status.stopped = true;
        });
        info!("scheduler stopped");
    }
}

async fn run_unit<Fut>(
    trigger: Trigger,
    item_id: ItemId,
    shutdown: &watch::Receiver<bool>,
    unit: Fut,
) -> UnitOutcome
where
    Fut: Future<Output = Result<UnitStatus>>,
{
    let stopping = *shutdown.borrow();
    if stopping {
        return UnitOutcome::Skipped;
    }

    match AssertUnwindSafe(unit).catch_unwind().await {
        Ok(Ok(UnitStatus::Processed)) => UnitOutcome::Processed,
        Ok(Ok(UnitStatus::Skipped)) => UnitOutcome::Skipped,
        Ok(Err(e)) => {
            error!(?trigger, item_id = %item_id, error = %e, "item processing failed");
            UnitOutcome::Failed
        }
        Err(_) => {
            let e = EngineError::Panicked(item_id);
            error!(?trigger, item_id = %item_id, error = %e, "item processing failed");
            UnitOutcome::Failed
        }
    }
}

/// Handle to a running scheduler loop.
pub struct SchedulerHandle {
    shutdown_tx: Arc<watch::Sender<bool>>,
    status_rx: watch::Receiver<SchedulerStatus>,
    task: JoinHandle<()>,
}

impl SchedulerHandle {
    /// Subscribe to status updates.
    #[must_use]
    pub fn status(&self) -> watch::Receiver<SchedulerStatus> {
        self.status_rx.clone()
    }

    /// Stop scheduling new work, let in-flight items finish, and wait for the loop to exit.
    pub async fn shutdown(self) {
        self.shutdown_tx.send_replace(true);
        if let Err(e) = self.task.await {
            warn!(error = %e, "scheduler task ended abnormally");
        }
    }
}
