//! Key encoding utilities for `RocksDB`.
//!
//! Ledger keys embed the occurrence time so a prefix scan returns an item's history in
//! canonical order, independent of when the entry's ULID was generated.

use chrono::{DateTime, Utc};
use pantry_core::{ItemId, RestockEventId, UsageEventId};

/// Length of an item ID prefix.
pub const ITEM_PREFIX_LEN: usize = 16;

/// Create an item key from an item ID.
#[must_use]
pub fn item_key(item_id: &ItemId) -> Vec<u8> {
    item_id.as_bytes().to_vec()
}

/// Encode a timestamp so that byte order matches chronological order.
#[must_use]
pub fn timestamp_bytes(at: DateTime<Utc>) -> [u8; 8] {
    #[allow(clippy::cast_sign_loss)]
    let biased = (at.timestamp_millis() as u64) ^ (1 << 63);
    biased.to_be_bytes()
}

/// Create a ledger key.
///
/// Format: `item_id (16 bytes) || occurred_at millis (8 bytes) || event_id (16 bytes)`
#[must_use]
pub fn usage_event_key(
    item_id: &ItemId,
    occurred_at: DateTime<Utc>,
    event_id: &UsageEventId,
) -> Vec<u8> {
    let mut key = Vec::with_capacity(40);
    key.extend_from_slice(item_id.as_bytes());
    key.extend_from_slice(&timestamp_bytes(occurred_at));
    key.extend_from_slice(&event_id.to_bytes());
    key
}

/// Create the lowest ledger key for an item at or after `at`.
#[must_use]
pub fn usage_event_bound(item_id: &ItemId, at: DateTime<Utc>) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(item_id.as_bytes());
    key.extend_from_slice(&timestamp_bytes(at));
    key
}

/// Create a reminder key from a reminder ID.
#[must_use]
pub fn restock_event_key(event_id: &RestockEventId) -> Vec<u8> {
    event_id.to_bytes().to_vec()
}

/// Create an item-reminder index key.
///
/// Format: `item_id (16 bytes) || restock_event_id (16 bytes)`
#[must_use]
pub fn item_restock_key(item_id: &ItemId, event_id: &RestockEventId) -> Vec<u8> {
    let mut key = Vec::with_capacity(32);
    key.extend_from_slice(item_id.as_bytes());
    key.extend_from_slice(&event_id.to_bytes());
    key
}

/// Extract the reminder ID from an item-reminder index key.
///
/// Returns `None` if the key is shorter than 32 bytes.
#[must_use]
pub fn extract_restock_event_id(key: &[u8]) -> Option<RestockEventId> {
    let bytes: [u8; 16] = key.get(ITEM_PREFIX_LEN..ITEM_PREFIX_LEN + 16)?.try_into().ok()?;
    Some(RestockEventId::from_bytes(bytes))
}
