//! The engine facade.
//!
//! [`PantryEngine`] wires storage, the clock and the four components together and exposes
//! the operations callers need: item lifecycle, external quantity reports, projections and
//! the per-item processing units the scheduler drives.
//!
//! Every operation that reads and writes an item holds that item's lock for its whole
//! duration, so depletion, catch-up, re-estimation and external reports never interleave
//! on the same item.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pantry_core::{
    validate_quantity, ChangeType, ItemId, PantryError, RestockEvent, RestockResolution,
    TrackedItem, TrackingSettings, UsageEvent,
};
use pantry_store::Store;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::depletion::{elapsed_days, DepletionOutcome, DepletionProcessor};
use crate::error::{EngineError, Result};
use crate::estimator::RateEstimator;
use crate::ledger::Ledger;
use crate::locks::ItemLocks;
use crate::restock::{RestockAction, RestockManager};
use crate::retry::with_retry;

/// Projections further out than this are reported without a depletion date.
const MAX_PROJECTION_DAYS: i64 = 36_500;

/// Read-only view of a tracked item for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemProjection {
    /// The item.
    pub item_id: ItemId,
    /// Display name.
    pub name: String,
    /// Unit of `quantity`.
    pub unit: String,
    /// Quantity as of `last_processed_at`.
    pub quantity: Decimal,
    /// Whether automatic depletion is on.
    pub is_tracked: bool,
    /// Quantity consumed per day.
    pub consumption_rate: Decimal,
    /// Reminder threshold in days.
    pub restock_threshold_days: Decimal,
    /// Days until empty; `None` means never.
    pub days_remaining: Option<Decimal>,
    /// When the item is projected to run out.
    pub projected_depletion_at: Option<DateTime<Utc>>,
    /// Whether the projection is at or below the threshold.
    pub needs_restock: bool,
    /// Instant up to which depletion has been accounted.
    pub last_processed_at: Option<DateTime<Utc>>,
    /// The active reminder, if any.
    pub active_reminder: Option<RestockEvent>,
}

impl ItemProjection {
    /// Build a projection for `item`.
    #[must_use]
    pub fn new(item: &TrackedItem, active_reminder: Option<RestockEvent>, now: DateTime<Utc>) -> Self {
        let days_remaining = item.days_remaining();
        let base = item.last_processed_at.unwrap_or(now);
        let projected_depletion_at = days_remaining.and_then(|days| depletion_date(base, days));

        Self {
            item_id: item.id,
            name: item.name.clone(),
            unit: item.unit.clone(),
            quantity: item.quantity,
            is_tracked: item.is_tracked,
            consumption_rate: item.consumption_rate,
            restock_threshold_days: item.restock_threshold_days,
            days_remaining,
            projected_depletion_at,
            needs_restock: item.is_tracked && item.needs_restock(),
            last_processed_at: item.last_processed_at,
            active_reminder,
        }
    }
}

fn depletion_date(base: DateTime<Utc>, days: Decimal) -> Option<DateTime<Utc>> {
    if days > Decimal::from(MAX_PROJECTION_DAYS) {
        return None;
    }
    let millis = days
        .checked_mul(Decimal::from(86_400_000))?
        .round()
        .to_i64()?;
    base.checked_add_signed(Duration::milliseconds(millis))
}

/// Result of a tracking configuration change.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemUpdate {
    /// The item as persisted.
    pub item: TrackedItem,
    /// What happened to the item's reminder.
    pub reminder: RestockAction,
}

/// Result of an external quantity report.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantityReport {
    /// The item as persisted.
    pub item: TrackedItem,
    /// The ledger entry written for the report.
    pub event: UsageEvent,
    /// What happened to the item's reminder.
    pub reminder: RestockAction,
}

/// Outcome of one per-item processing unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitStatus {
    /// The item was changed.
    Processed,
    /// The item did not need processing.
    Skipped,
}

/// The pantry depletion engine.
pub struct PantryEngine {
    store: Arc<dyn Store>,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
    ledger: Ledger,
    depletion: DepletionProcessor,
    restock: RestockManager,
    estimator: RateEstimator,
    locks: ItemLocks,
}

impl PantryEngine {
    /// Create an engine over `store`, reading time from `clock`.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Configuration`] if `config` is invalid.
    pub fn new(store: Arc<dyn Store>, clock: Arc<dyn Clock>, config: EngineConfig) -> Result<Self> {
        config.validate()?;

        let ledger = Ledger::new(Arc::clone(&store));
        let depletion = DepletionProcessor::new(ledger.clone());
        let restock = RestockManager::new(
            Arc::clone(&store),
            config.reminder_time,
            config.restock_margin_fraction,
            config.restock_margin_floor,
        );
        let estimator = RateEstimator::new(
            Arc::clone(&store),
            ledger.clone(),
            config.lookback_days,
            config.observed_rate_weight,
        );

        Ok(Self {
            store,
            clock,
            config,
            ledger,
            depletion,
            restock,
            estimator,
            locks: ItemLocks::new(),
        })
    }

    /// The engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The engine's time source.
    #[must_use]
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// The current instant according to the engine's clock.
    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    async fn retry<T, F, Fut>(&self, operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        with_retry(&self.config.retry, operation).await
    }

    fn load(&self, item_id: &ItemId) -> Result<TrackedItem> {
        self.store
            .get_item(item_id)?
            .ok_or(EngineError::ItemNotFound(*item_id))
    }

    // =========================================================================
    // Item lifecycle
    // =========================================================================

    /// Register an untracked item mirror.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ItemAlreadyExists`] if the ID is taken, a validation error
    /// for a negative quantity, or a storage error.
    pub async fn register_item(
        &self,
        item_id: ItemId,
        name: &str,
        quantity: Decimal,
        unit: &str,
    ) -> Result<TrackedItem> {
        let _guard = self.locks.lock(item_id).await;
        let item = TrackedItem::new(item_id, name, quantity, unit, self.now())?;

        let item = self.retry(move || {
            let item = item.clone();
            async move {
                if self.store.get_item(&item.id)?.is_some() {
                    return Err(EngineError::ItemAlreadyExists(item.id));
                }
                self.store.put_item(&item)?;
                Ok(item)
            }
        })
        .await?;

        info!(item_id = %item.id, name = %item.name, "registered item");
        Ok(item)
    }

    /// Turn tracking on, or change the rate and threshold of a tracked item.
    ///
    /// An item coming back from untracked is not depleted for the time it was off.
    ///
    /// # Errors
    ///
    /// Returns a validation error for bad settings, [`EngineError::ItemNotFound`], or a
    /// storage error.
    pub async fn enable_tracking(
        &self,
        item_id: ItemId,
        settings: TrackingSettings,
    ) -> Result<ItemUpdate> {
        settings.validate()?;
        let _guard = self.locks.lock(item_id).await;

        let item = self.retry(move || async move {
            let now = self.now();
            let mut item = self.load(&item_id)?;
            let resumed = !item.is_tracked;
            item.enable_tracking(settings, now);
            if resumed && item.last_processed_at.is_some() {
                item.last_processed_at = Some(now);
            }
            self.store.put_item(&item)?;
            Ok(item)
        })
        .await?;

        info!(
            item_id = %item.id,
            rate = %item.consumption_rate,
            threshold = %item.restock_threshold_days,
            "tracking enabled"
        );

        let reminder = self.settle_reminder(&item, item.days_remaining()).await;
        Ok(ItemUpdate { item, reminder })
    }

    /// Turn tracking off and retire the item's reminder.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ItemNotFound`] or a storage error.
    pub async fn disable_tracking(&self, item_id: ItemId) -> Result<ItemUpdate> {
        let _guard = self.locks.lock(item_id).await;

        let item = self.retry(move || async move {
            let mut item = self.load(&item_id)?;
            item.disable_tracking(self.now());
            self.store.put_item(&item)?;
            Ok(item)
        })
        .await?;

        let reminder = self.retry(move || async move {
            self.restock
                .retire_active(&item_id, RestockResolution::TrackingDisabled, self.now())
        })
        .await?;

        info!(item_id = %item.id, "tracking disabled");
        Ok(ItemUpdate { item, reminder })
    }

    /// Record a quantity reported from outside the engine.
    ///
    /// Writes one ledger entry, moves `last_processed_at` up to now and evaluates the
    /// item's reminder, which also detects restocks.
    ///
    /// # Errors
    ///
    /// Returns [`PantryError::InvalidChangeType`] for `auto_depletion`, a validation error
    /// for a negative quantity, [`EngineError::ItemNotFound`], or a storage error.
    pub async fn report_quantity_change(
        &self,
        item_id: ItemId,
        quantity: Decimal,
        change_type: ChangeType,
    ) -> Result<QuantityReport> {
        if !change_type.is_external() {
            return Err(PantryError::InvalidChangeType(change_type.as_str().to_owned()).into());
        }
        validate_quantity(quantity)?;
        let _guard = self.locks.lock(item_id).await;

        let (item, event) = self.retry(move || async move {
            let now = self.now();
            let mut item = self.load(&item_id)?;
            let before = item.quantity;
            item.set_quantity(quantity, now);
            item.last_processed_at = Some(item.last_processed_at.map_or(now, |last| last.max(now)));
            let event = self.ledger.record(&item, before, change_type, now)?;
            Ok((item, event))
        })
        .await?;

        debug!(
            item_id = %item.id,
            before = %event.quantity_before,
            after = %event.quantity_after,
            change_type = %change_type,
            "recorded quantity report"
        );

        let reminder = self.settle_reminder(&item, item.days_remaining()).await;
        Ok(QuantityReport {
            item,
            event,
            reminder,
        })
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Projections for every tracked item.
    ///
    /// # Errors
    ///
    /// Returns a storage error.
    pub fn projections(&self) -> Result<Vec<ItemProjection>> {
        let now = self.now();
        let mut reminders: HashMap<ItemId, RestockEvent> = self
            .store
            .list_active_restock_events()?
            .into_iter()
            .map(|reminder| (reminder.item_id, reminder))
            .collect();

        Ok(self
            .store
            .list_tracked_items()?
            .iter()
            .map(|item| ItemProjection::new(item, reminders.remove(&item.id), now))
            .collect())
    }

    /// Projection for one item, tracked or not.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ItemNotFound`] or a storage error.
    pub fn projection(&self, item_id: &ItemId) -> Result<ItemProjection> {
        let item = self.load(item_id)?;
        let reminder = self
            .store
            .active_restock_events(item_id)?
            .into_iter()
            .min_by_key(|e| (e.created_at, e.id));
        Ok(ItemProjection::new(&item, reminder, self.now()))
    }

    /// Ledger entries for an item with `from <= occurred_at < to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ItemNotFound`], [`EngineError::InvalidWindow`], or a
    /// storage error.
    pub fn usage_history(
        &self,
        item_id: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>> {
        self.load(item_id)?;
        self.ledger.history(item_id, from, to)
    }

    /// All reminders ever raised for an item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::ItemNotFound`] or a storage error.
    pub fn restock_history(&self, item_id: &ItemId) -> Result<Vec<RestockEvent>> {
        self.load(item_id)?;
        Ok(self.store.list_restock_events(item_id)?)
    }

    /// IDs of every tracked item.
    ///
    /// # Errors
    ///
    /// Returns a storage error once retries are exhausted.
    pub async fn tracked_item_ids(&self) -> Result<Vec<ItemId>> {
        self.retry(move || async move {
            Ok(self
                .store
                .list_tracked_items()?
                .into_iter()
                .map(|item| item.id)
                .collect())
        })
        .await
    }

    // =========================================================================
    // Processing units
    // =========================================================================

    /// Daily depletion for one item.
    ///
    /// Skips untracked items and items already processed at or after `slot_start`.
    /// An item never processed before is depleted by exactly one day.
    ///
    /// # Errors
    ///
    /// Returns the item's processing error once retries are exhausted.
    pub async fn deplete_item(&self, item_id: ItemId, slot_start: DateTime<Utc>) -> Result<UnitStatus> {
        let _guard = self.locks.lock(item_id).await;

        let outcome = self.retry(move || async move {
            self.deplete_once(item_id, slot_start)
        })
        .await?;

        match outcome {
            Some(outcome) => {
                self.evaluate_reminder(&outcome.item, outcome.days_remaining)
                    .await?;
                Ok(UnitStatus::Processed)
            }
            None => Ok(UnitStatus::Skipped),
        }
    }

    fn deplete_once(
        &self,
        item_id: ItemId,
        slot_start: DateTime<Utc>,
    ) -> Result<Option<DepletionOutcome>> {
        let item = self.load(&item_id)?;
        if !item.is_tracked || item.last_processed_at.is_some_and(|last| last >= slot_start) {
            return Ok(None);
        }

        let now = self.now();
        let days = item
            .last_processed_at
            .map_or(Decimal::ONE, |last| elapsed_days(last, now));
        self.depletion.process(item, days, now).map(Some)
    }

    /// Startup catch-up for one item.
    ///
    /// Applies every whole day elapsed since `last_processed_at` in one step and advances
    /// `last_processed_at` by exactly those days. Items never processed, or processed at
    /// or after `boundary`, are skipped.
    ///
    /// # Errors
    ///
    /// Returns the item's processing error once retries are exhausted.
    pub async fn catch_up_item(&self, item_id: ItemId, boundary: DateTime<Utc>) -> Result<UnitStatus> {
        let _guard = self.locks.lock(item_id).await;

        let outcome = self.retry(move || async move {
            self.catch_up_once(item_id, boundary)
        })
        .await?;

        match outcome {
            Some(outcome) => {
                self.evaluate_reminder(&outcome.item, outcome.days_remaining)
                    .await?;
                Ok(UnitStatus::Processed)
            }
            None => Ok(UnitStatus::Skipped),
        }
    }

    fn catch_up_once(
        &self,
        item_id: ItemId,
        boundary: DateTime<Utc>,
    ) -> Result<Option<DepletionOutcome>> {
        let item = self.load(&item_id)?;
        let Some(last) = item.last_processed_at.filter(|_| item.is_tracked) else {
            return Ok(None);
        };
        if last >= boundary {
            return Ok(None);
        }

        let whole_days = (self.now() - last).num_days();
        if whole_days < 1 {
            return Ok(None);
        }

        let processed_at = last + Duration::days(whole_days);
        debug!(item_id = %item_id, whole_days, "catching up missed days");
        self.depletion
            .process(item, Decimal::from(whole_days), processed_at)
            .map(Some)
    }

    /// Rate re-estimation for one item.
    ///
    /// Skips untracked items, items whose rate was written within the re-estimation
    /// interval, and items without enough restock history.
    ///
    /// # Errors
    ///
    /// Returns the item's processing error once retries are exhausted.
    pub async fn reestimate_item(&self, item_id: ItemId) -> Result<UnitStatus> {
        let _guard = self.locks.lock(item_id).await;
        let interval = self.config.reestimation_interval_days;

        let updated = self.retry(move || async move {
            let now = self.now();
            let item = self.load(&item_id)?;
            if !item.is_tracked || !RateEstimator::is_due(&item, now, interval) {
                return Ok(None);
            }
            Ok(self.estimator.apply(item, now)?.map(|(item, _)| item))
        })
        .await?;

        match updated {
            Some(item) => {
                self.evaluate_reminder(&item, item.days_remaining()).await?;
                Ok(UnitStatus::Processed)
            }
            None => Ok(UnitStatus::Skipped),
        }
    }

    async fn evaluate_reminder(
        &self,
        item: &TrackedItem,
        days_remaining: Option<Decimal>,
    ) -> Result<RestockAction> {
        self.retry(move || async move {
            self.restock.evaluate(item, days_remaining, self.now())
        })
        .await
    }

    /// Evaluate the reminder after an external write that already succeeded.
    ///
    /// A failure here must not fail the caller's request; the next tick re-evaluates.
    async fn settle_reminder(
        &self,
        item: &TrackedItem,
        days_remaining: Option<Decimal>,
    ) -> RestockAction {
        match self.evaluate_reminder(item, days_remaining).await {
            Ok(action) => action,
            Err(e) => {
                error!(item_id = %item.id, error = %e, "restock evaluation failed");
                RestockAction::Unchanged
            }
        }
    }
}
