//! In-memory storage implementation.
//!
//! All state lives behind one `RwLock`, so every trait method is atomic with respect to
//! the others. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use pantry_core::{ItemId, RestockEvent, RestockEventId, TrackedItem, UsageEvent};

use crate::error::{Result, StoreError};
use crate::Store;

#[derive(Default)]
struct Inner {
    items: HashMap<ItemId, TrackedItem>,
    /// Per-item ledger, kept sorted by `occurred_at`.
    usage_events: HashMap<ItemId, Vec<UsageEvent>>,
    restock_events: HashMap<RestockEventId, RestockEvent>,
    /// Reminder IDs per item in insertion order.
    restock_by_item: HashMap<ItemId, Vec<RestockEventId>>,
}

impl Inner {
    fn restock_events_for(&self, item_id: &ItemId) -> Vec<RestockEvent> {
        self.restock_by_item
            .get(item_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.restock_events.get(id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    fn insert_restock_event(&mut self, event: &RestockEvent) {
        if self
            .restock_events
            .insert(event.id, event.clone())
            .is_none()
        {
            self.restock_by_item
                .entry(event.item_id)
                .or_default()
                .push(event.id);
        }
    }
}

/// Process-local storage implementation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Inner>> {
        self.inner
            .read()
            .map_err(|_| StoreError::Poisoned("memory store"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Inner>> {
        self.inner
            .write()
            .map_err(|_| StoreError::Poisoned("memory store"))
    }
}

impl Store for MemoryStore {
    fn put_item(&self, item: &TrackedItem) -> Result<()> {
        self.write()?.items.insert(item.id, item.clone());
        Ok(())
    }

    fn get_item(&self, item_id: &ItemId) -> Result<Option<TrackedItem>> {
        Ok(self.read()?.items.get(item_id).cloned())
    }

    fn list_items(&self) -> Result<Vec<TrackedItem>> {
        let mut items: Vec<_> = self.read()?.items.values().cloned().collect();
        items.sort_by_key(|item| item.id);
        Ok(items)
    }

    fn apply_transition(&self, item: &TrackedItem, event: &UsageEvent) -> Result<()> {
        let mut inner = self.write()?;
        inner.items.insert(item.id, item.clone());

        let ledger = inner.usage_events.entry(event.item_id).or_default();
        let pos = ledger.partition_point(|e| e.occurred_at <= event.occurred_at);
        ledger.insert(pos, event.clone());

        Ok(())
    }

    fn list_usage_events(
        &self,
        item_id: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>> {
        Ok(self
            .read()?
            .usage_events
            .get(item_id)
            .map(|ledger| {
                ledger
                    .iter()
                    .filter(|e| e.occurred_at >= from && e.occurred_at < to)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn put_restock_event(&self, event: &RestockEvent) -> Result<()> {
        self.write()?.insert_restock_event(event);
        Ok(())
    }

    fn get_restock_event(&self, event_id: &RestockEventId) -> Result<Option<RestockEvent>> {
        Ok(self.read()?.restock_events.get(event_id).cloned())
    }

    fn list_restock_events(&self, item_id: &ItemId) -> Result<Vec<RestockEvent>> {
        Ok(self.read()?.restock_events_for(item_id))
    }

    fn list_active_restock_events(&self) -> Result<Vec<RestockEvent>> {
        let mut active: Vec<_> = self
            .read()?
            .restock_events
            .values()
            .filter(|e| e.is_active())
            .cloned()
            .collect();
        active.sort_by_key(|e| e.id);
        Ok(active)
    }

    fn upsert_active_restock_event(&self, event: &RestockEvent) -> Result<RestockEvent> {
        let mut inner = self.write()?;

        let existing = inner
            .restock_events_for(&event.item_id)
            .into_iter()
            .find(RestockEvent::is_active);

        let stored = match existing {
            Some(mut current) => {
                current.refresh(event.latest_quantity, event.days_remaining, event.updated_at);
                current
            }
            None => event.clone(),
        };
        inner.insert_restock_event(&stored);

        Ok(stored)
    }
}
