//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Item records, keyed by `item_id`.
    pub const ITEMS: &str = "items";

    /// Ledger entries, keyed by `item_id || occurred_at || event_id`.
    pub const USAGE_EVENTS: &str = "usage_events";

    /// Restock reminders, keyed by `restock_event_id` (ULID).
    pub const RESTOCK_EVENTS: &str = "restock_events";

    /// Index: reminders by item, keyed by `item_id || restock_event_id`.
    /// Value is empty (index only).
    pub const RESTOCK_EVENTS_BY_ITEM: &str = "restock_events_by_item";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ITEMS,
        cf::USAGE_EVENTS,
        cf::RESTOCK_EVENTS,
        cf::RESTOCK_EVENTS_BY_ITEM,
    ]
}
