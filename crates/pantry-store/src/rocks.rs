//! `RocksDB` storage implementation.
//!
//! This module provides the `RocksStore` implementation of the `Store` trait.

use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, Direction, IteratorMode,
    MultiThreaded, Options, WriteBatch,
};

use pantry_core::{ItemId, RestockEvent, RestockEventId, TrackedItem, UsageEvent};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    /// Serializes read-modify-write sequences on reminders.
    upsert_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(Self {
            db: Arc::new(db),
            upsert_lock: Mutex::new(()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    fn lock_upserts(&self) -> Result<MutexGuard<'_, ()>> {
        self.upsert_lock
            .lock()
            .map_err(|_| StoreError::Poisoned("reminder upsert"))
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Write a reminder and its item index entry in one batch.
    fn write_restock_event(&self, event: &RestockEvent) -> Result<()> {
        let cf_events = self.cf(cf::RESTOCK_EVENTS)?;
        let cf_by_item = self.cf(cf::RESTOCK_EVENTS_BY_ITEM)?;

        let value = Self::serialize(event)?;

        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_events, keys::restock_event_key(&event.id), &value);
        batch.put_cf(
            &cf_by_item,
            keys::item_restock_key(&event.item_id, &event.id),
            [],
        ); // Index entry (empty value)

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Item Operations
    // =========================================================================

    fn put_item(&self, item: &TrackedItem) -> Result<()> {
        let cf = self.cf(cf::ITEMS)?;
        let value = Self::serialize(item)?;

        self.db
            .put_cf(&cf, keys::item_key(&item.id), value)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn get_item(&self, item_id: &ItemId) -> Result<Option<TrackedItem>> {
        let cf = self.cf(cf::ITEMS)?;

        self.db
            .get_cf(&cf, keys::item_key(item_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_items(&self) -> Result<Vec<TrackedItem>> {
        let cf = self.cf(cf::ITEMS)?;

        self.db
            .iterator_cf(&cf, IteratorMode::Start)
            .map(|entry| {
                let (_, value) = entry.map_err(|e| StoreError::Database(e.to_string()))?;
                Self::deserialize(&value)
            })
            .collect()
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    fn apply_transition(&self, item: &TrackedItem, event: &UsageEvent) -> Result<()> {
        let cf_items = self.cf(cf::ITEMS)?;
        let cf_usage = self.cf(cf::USAGE_EVENTS)?;

        let item_value = Self::serialize(item)?;
        let event_value = Self::serialize(event)?;
        let event_key = keys::usage_event_key(&event.item_id, event.occurred_at, &event.id);

        // Write atomically
        let mut batch = WriteBatch::default();
        batch.put_cf(&cf_items, keys::item_key(&item.id), &item_value);
        batch.put_cf(&cf_usage, &event_key, &event_value);

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))
    }

    fn list_usage_events(
        &self,
        item_id: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>> {
        let cf = self.cf(cf::USAGE_EVENTS)?;
        let lower = keys::usage_event_bound(item_id, from);
        let upper = keys::usage_event_bound(item_id, to);

        let mut events = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf, IteratorMode::From(&lower, Direction::Forward));

        for entry in iter {
            let (key, value) = entry.map_err(|e| StoreError::Database(e.to_string()))?;
            if key.as_ref() >= upper.as_slice() {
                break;
            }
            events.push(Self::deserialize(&value)?);
        }

        Ok(events)
    }

    // =========================================================================
    // Restock Reminder Operations
    // =========================================================================

    fn put_restock_event(&self, event: &RestockEvent) -> Result<()> {
        let _guard = self.lock_upserts()?;
        self.write_restock_event(event)
    }

    fn get_restock_event(&self, event_id: &RestockEventId) -> Result<Option<RestockEvent>> {
        let cf = self.cf(cf::RESTOCK_EVENTS)?;

        self.db
            .get_cf(&cf, keys::restock_event_key(event_id))
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_restock_events(&self, item_id: &ItemId) -> Result<Vec<RestockEvent>> {
        let cf_by_item = self.cf(cf::RESTOCK_EVENTS_BY_ITEM)?;
        let prefix = keys::item_key(item_id);

        let mut events = Vec::new();
        let iter = self
            .db
            .iterator_cf(&cf_by_item, IteratorMode::From(&prefix, Direction::Forward));

        for entry in iter {
            let (key, _) = entry.map_err(|e| StoreError::Database(e.to_string()))?;
            if !key.starts_with(&prefix) {
                break;
            }

            let event_id = keys::extract_restock_event_id(&key)
                .ok_or_else(|| StoreError::Database("malformed reminder index key".into()))?;
            if let Some(event) = self.get_restock_event(&event_id)? {
                events.push(event);
            }
        }

        Ok(events)
    }

    fn list_active_restock_events(&self) -> Result<Vec<RestockEvent>> {
        let cf = self.cf(cf::RESTOCK_EVENTS)?;

        let mut active = Vec::new();
        for entry in self.db.iterator_cf(&cf, IteratorMode::Start) {
            let (_, value) = entry.map_err(|e| StoreError::Database(e.to_string()))?;
            let event: RestockEvent = Self::deserialize(&value)?;
            if event.is_active() {
                active.push(event);
            }
        }

        Ok(active)
    }

    fn upsert_active_restock_event(&self, event: &RestockEvent) -> Result<RestockEvent> {
        let _guard = self.lock_upserts()?;

        let existing = self
            .list_restock_events(&event.item_id)?
            .into_iter()
            .find(RestockEvent::is_active);

        let stored = match existing {
            Some(mut current) => {
                current.refresh(event.latest_quantity, event.days_remaining, event.updated_at);
                current
            }
            None => event.clone(),
        };
        self.write_restock_event(&stored)?;

        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pantry_core::{ChangeType, RestockResolution};
    use rust_decimal_macros::dec;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn item() -> TrackedItem {
        TrackedItem::new(ItemId::generate(), "flour", dec!(2), "kg", Utc::now()).unwrap()
    }

    #[test]
    fn item_crud() {
        let (store, _dir) = create_test_store();
        let mut item = item();
        store.put_item(&item).unwrap();

        let retrieved = store.get_item(&item.id).unwrap().unwrap();
        assert_eq!(retrieved, item);

        item.is_tracked = true;
        store.put_item(&item).unwrap();
        assert_eq!(store.list_tracked_items().unwrap().len(), 1);
    }

    #[test]
    fn ledger_range_query() {
        let (store, _dir) = create_test_store();
        let mut item = item();
        let base = Utc::now();

        for day in 0..5 {
            let at = base + Duration::days(day);
            let before = item.quantity;
            item.set_quantity(before - dec!(0.25), at);
            let event = UsageEvent::new(item.id, before, item.quantity, ChangeType::AutoDepletion, at);
            store.apply_transition(&item, &event).unwrap();
        }

        let all = store
            .list_usage_events(&item.id, base, base + Duration::days(5))
            .unwrap();
        assert_eq!(all.len(), 5);
        assert!(all.windows(2).all(|w| w[0].occurred_at <= w[1].occurred_at));

        let window = store
            .list_usage_events(&item.id, base + Duration::days(1), base + Duration::days(3))
            .unwrap();
        assert_eq!(window.len(), 2);

        let other = store
            .list_usage_events(&ItemId::generate(), base, base + Duration::days(5))
            .unwrap();
        assert!(other.is_empty());

        assert_eq!(store.get_item(&item.id).unwrap().unwrap().quantity, dec!(0.75));
    }

    #[test]
    fn reminder_upsert_and_resolution() {
        let (store, _dir) = create_test_store();
        let item_id = ItemId::generate();
        let now = Utc::now();

        let first = store
            .upsert_active_restock_event(&RestockEvent::new(item_id, now, dec!(1), dec!(2), now))
            .unwrap();
        let updated = store
            .upsert_active_restock_event(&RestockEvent::new(item_id, now, dec!(0.5), dec!(1), now))
            .unwrap();
        assert_eq!(updated.id, first.id);
        assert_eq!(updated.latest_quantity, dec!(0.5));
        assert_eq!(store.active_restock_events(&item_id).unwrap().len(), 1);

        let mut resolved = updated;
        resolved.resolve(RestockResolution::Restocked, now);
        store.put_restock_event(&resolved).unwrap();

        assert!(store.list_active_restock_events().unwrap().is_empty());
        assert_eq!(store.list_restock_events(&item_id).unwrap().len(), 1);
        assert_eq!(
            store.get_restock_event(&first.id).unwrap().unwrap().resolution,
            Some(RestockResolution::Restocked)
        );
    }
}
