//! Storage layer for the pantry depletion engine.
//!
//! This crate defines the persistence contract the engine consumes and two backends:
//!
//! - [`MemoryStore`]: process-local maps behind a lock, used by tests and single-process setups
//! - `RocksStore` (feature `rocksdb-backend`): `RocksDB` with column families for indexing
//!
//! # Ledger
//!
//! Usage events are append-only. The trait exposes no way to update or delete them, and
//! the only write path is [`Store::apply_transition`], which persists the item's new
//! state together with the entry describing the change.
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use pantry_core::{ItemId, TrackedItem};
//! use pantry_store::{MemoryStore, Store};
//! use rust_decimal::Decimal;
//!
//! let store = MemoryStore::new();
//! let item = TrackedItem::new(ItemId::generate(), "oats", Decimal::ONE, "kg", Utc::now()).unwrap();
//! store.put_item(&item).unwrap();
//! assert!(store.get_item(&item.id).unwrap().is_some());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod memory;

#[cfg(feature = "rocksdb-backend")]
pub mod keys;
#[cfg(feature = "rocksdb-backend")]
pub mod rocks;
#[cfg(feature = "rocksdb-backend")]
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use chrono::{DateTime, Utc};
use pantry_core::{ItemId, RestockEvent, RestockEventId, TrackedItem, UsageEvent};

/// The storage trait defining all persistence the engine relies on.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // Item Operations
    // =========================================================================

    /// Insert or replace an item record.
    ///
    /// Used for registration and configuration changes; quantity changes go through
    /// [`Store::apply_transition`] so they are always ledgered.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_item(&self, item: &TrackedItem) -> Result<()>;

    /// Get an item by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_item(&self, item_id: &ItemId) -> Result<Option<TrackedItem>>;

    /// List every item.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_items(&self) -> Result<Vec<TrackedItem>>;

    /// List items with `is_tracked` set.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_tracked_items(&self) -> Result<Vec<TrackedItem>> {
        Ok(self
            .list_items()?
            .into_iter()
            .filter(|item| item.is_tracked)
            .collect())
    }

    // =========================================================================
    // Ledger Operations
    // =========================================================================

    /// Persist an item's new state and append the ledger entry for the change, atomically.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails; in that case neither write is visible.
    fn apply_transition(&self, item: &TrackedItem, event: &UsageEvent) -> Result<()>;

    /// List ledger entries for an item with `from <= occurred_at < to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_usage_events(
        &self,
        item_id: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>>;

    // =========================================================================
    // Restock Reminder Operations
    // =========================================================================

    /// Write a reminder record as-is.
    ///
    /// This is a raw write keyed by reminder ID and performs no at-most-one check;
    /// callers creating reminders should use [`Store::upsert_active_restock_event`].
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn put_restock_event(&self, event: &RestockEvent) -> Result<()>;

    /// Get a reminder by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_restock_event(&self, event_id: &RestockEventId) -> Result<Option<RestockEvent>>;

    /// List all reminders (active and resolved) for an item, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_restock_events(&self, item_id: &ItemId) -> Result<Vec<RestockEvent>>;

    /// List active reminders for an item, oldest first.
    ///
    /// More than one entry means the at-most-one invariant was broken and needs repair.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn active_restock_events(&self, item_id: &ItemId) -> Result<Vec<RestockEvent>> {
        Ok(self
            .list_restock_events(item_id)?
            .into_iter()
            .filter(RestockEvent::is_active)
            .collect())
    }

    /// List active reminders across all items.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_active_restock_events(&self) -> Result<Vec<RestockEvent>>;

    /// Insert or update the active reminder for `event.item_id`, keyed by item.
    ///
    /// If an active reminder already exists for the item, its projection payload
    /// (`days_remaining`, `latest_quantity`, `updated_at`) is replaced and its ID and
    /// creation metadata are kept. Otherwise `event` is inserted. Returns the stored reminder.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn upsert_active_restock_event(&self, event: &RestockEvent) -> Result<RestockEvent>;
}
