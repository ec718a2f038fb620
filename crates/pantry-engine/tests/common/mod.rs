//! Common test utilities for engine integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pantry_core::{ItemId, RestockEvent, RestockEventId, TrackedItem, TrackingSettings, UsageEvent};
use pantry_engine::{EngineConfig, ManualClock, PantryEngine, RetryConfig, Scheduler};
use pantry_store::{MemoryStore, Store, StoreError};
use rust_decimal::Decimal;

/// 06:00 UTC, the default daily slot.
pub fn slot_start() -> DateTime<Utc> {
    "2026-03-10T06:00:00Z".parse().expect("valid timestamp")
}

/// Engine configuration with retries that never sleep.
pub fn test_config() -> EngineConfig {
    EngineConfig {
        retry: RetryConfig::immediate(3),
        ..EngineConfig::default()
    }
}

/// Test harness containing an engine over an in-memory store and a manual clock.
pub struct TestHarness {
    /// The engine under test.
    pub engine: Arc<PantryEngine>,
    /// The store behind the engine.
    pub store: Arc<dyn Store>,
    /// The clock behind the engine.
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// Create a harness whose clock starts at `start`.
    pub fn at(start: DateTime<Utc>) -> Self {
        Self::with_store(Arc::new(MemoryStore::new()), start)
    }

    /// Create a harness over a specific store.
    pub fn with_store(store: Arc<dyn Store>, start: DateTime<Utc>) -> Self {
        let clock = Arc::new(ManualClock::new(start));
        let engine = PantryEngine::new(Arc::clone(&store), clock.clone(), test_config())
            .expect("valid config");
        Self {
            engine: Arc::new(engine),
            store,
            clock,
        }
    }

    /// A scheduler over the harness engine.
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(Arc::clone(&self.engine))
    }

    /// Register and enable tracking for an item.
    pub async fn tracked_item(&self, quantity: Decimal, rate: Decimal, threshold: Decimal) -> ItemId {
        let id = ItemId::generate();
        self.engine
            .register_item(id, "test item", quantity, "unit")
            .await
            .expect("register item");
        self.engine
            .enable_tracking(id, TrackingSettings::new(rate, threshold).expect("valid settings"))
            .await
            .expect("enable tracking");
        id
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// The stored item.
    pub fn item(&self, id: &ItemId) -> TrackedItem {
        self.store.get_item(id).expect("store read").expect("item exists")
    }

    /// All ledger entries for an item.
    pub fn ledger(&self, id: &ItemId) -> Vec<UsageEvent> {
        self.store
            .list_usage_events(id, DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC)
            .expect("store read")
    }

    /// Active reminders for an item.
    pub fn active_reminders(&self, id: &ItemId) -> Vec<RestockEvent> {
        self.store.active_restock_events(id).expect("store read")
    }
}

/// A store that fails the next `failures` ledger writes with a transient error.
pub struct FlakyStore {
    inner: MemoryStore,
    failures: AtomicU32,
}

impl FlakyStore {
    /// Wrap a fresh memory store.
    pub fn new() -> Self {
        Self {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(0),
        }
    }

    /// Fail the next `count` ledger writes.
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn maybe_fail(&self) -> pantry_store::Result<()> {
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(StoreError::Unavailable("injected failure".into()));
        }
        Ok(())
    }
}

impl Store for FlakyStore {
    fn put_item(&self, item: &TrackedItem) -> pantry_store::Result<()> {
        self.inner.put_item(item)
    }

    fn get_item(&self, item_id: &ItemId) -> pantry_store::Result<Option<TrackedItem>> {
        self.inner.get_item(item_id)
    }

    fn list_items(&self) -> pantry_store::Result<Vec<TrackedItem>> {
        self.inner.list_items()
    }

    fn apply_transition(&self, item: &TrackedItem, event: &UsageEvent) -> pantry_store::Result<()> {
        self.maybe_fail()?;
        self.inner.apply_transition(item, event)
    }

    fn list_usage_events(
        &self,
        item_id: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> pantry_store::Result<Vec<UsageEvent>> {
        self.inner.list_usage_events(item_id, from, to)
    }

    fn put_restock_event(&self, event: &RestockEvent) -> pantry_store::Result<()> {
        self.inner.put_restock_event(event)
    }

    fn get_restock_event(&self, event_id: &RestockEventId) -> pantry_store::Result<Option<RestockEvent>> {
        self.inner.get_restock_event(event_id)
    }

    fn list_restock_events(&self, item_id: &ItemId) -> pantry_store::Result<Vec<RestockEvent>> {
        self.inner.list_restock_events(item_id)
    }

    fn list_active_restock_events(&self) -> pantry_store::Result<Vec<RestockEvent>> {
        self.inner.list_active_restock_events()
    }

    fn upsert_active_restock_event(&self, event: &RestockEvent) -> pantry_store::Result<RestockEvent> {
        self.inner.upsert_active_restock_event(event)
    }
}
