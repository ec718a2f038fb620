//! The usage ledger.
//!
//! Every change to an item's quantity is recorded here, together with the new item state,
//! in a single storage write. Entries are never updated or deleted.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use pantry_core::{ChangeType, ItemId, TrackedItem, UsageEvent};
use pantry_store::Store;
use rust_decimal::Decimal;

use crate::error::{EngineError, Result};

/// Append-only record of quantity changes.
#[derive(Clone)]
pub struct Ledger {
    store: Arc<dyn Store>,
}

impl Ledger {
    /// Create a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Persist `item` and append one entry describing the move from `quantity_before`.
    ///
    /// The entry is written even when the quantity did not change.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage write fails; nothing is persisted in that case.
    pub fn record(
        &self,
        item: &TrackedItem,
        quantity_before: Decimal,
        change_type: ChangeType,
        occurred_at: DateTime<Utc>,
    ) -> Result<UsageEvent> {
        let event = UsageEvent::new(
            item.id,
            quantity_before,
            item.quantity,
            change_type,
            occurred_at,
        );
        self.store.apply_transition(item, &event)?;
        Ok(event)
    }

    /// Entries for an item with `from <= occurred_at < to`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidWindow`] if `from >= to`, or a storage error.
    pub fn history(
        &self,
        item_id: &ItemId,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<UsageEvent>> {
        if from >= to {
            return Err(EngineError::InvalidWindow);
        }
        Ok(self.store.list_usage_events(item_id, from, to)?)
    }

    /// Restock entries within the `lookback_days` ending at `now` (inclusive), oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the storage read fails.
    pub fn recent_restocks(
        &self,
        item_id: &ItemId,
        now: DateTime<Utc>,
        lookback_days: u32,
    ) -> Result<Vec<UsageEvent>> {
        let from = now - Duration::days(i64::from(lookback_days));
        let to = now + Duration::milliseconds(1);
        Ok(self
            .store
            .list_usage_events(item_id, from, to)?
            .into_iter()
            .filter(|e| e.change_type == ChangeType::Restock)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pantry_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn setup() -> (Ledger, Arc<MemoryStore>, TrackedItem, DateTime<Utc>) {
        let store = Arc::new(MemoryStore::new());
        let now: DateTime<Utc> = "2026-03-10T06:00:00Z".parse().unwrap();
        let item = TrackedItem::new(ItemId::generate(), "milk", dec!(2), "l", now).unwrap();
        store.put_item(&item).unwrap();
        (Ledger::new(store.clone()), store, item, now)
    }

    #[test]
    fn record_persists_item_and_entry() {
        let (ledger, store, mut item, now) = setup();
        item.set_quantity(dec!(1.5), now);

        let event = ledger.record(&item, dec!(2), ChangeType::AutoDepletion, now).unwrap();
        assert_eq!(event.quantity_change, dec!(-0.5));
        assert_eq!(store.get_item(&item.id).unwrap().unwrap().quantity, dec!(1.5));

        let history = ledger
            .history(&item.id, now, now + Duration::seconds(1))
            .unwrap();
        assert_eq!(history, vec![event]);
    }

    #[test]
    fn zero_change_is_still_recorded() {
        let (ledger, _store, item, now) = setup();
        let event = ledger.record(&item, dec!(2), ChangeType::AutoDepletion, now).unwrap();
        assert_eq!(event.quantity_change, Decimal::ZERO);
        assert_eq!(
            ledger.history(&item.id, now, now + Duration::days(1)).unwrap().len(),
            1
        );
    }

    #[test]
    fn history_rejects_empty_window() {
        let (ledger, _store, item, now) = setup();
        assert!(matches!(
            ledger.history(&item.id, now, now),
            Err(EngineError::InvalidWindow)
        ));
    }

    #[test]
    fn recent_restocks_filters_type_and_window() {
        let (ledger, _store, mut item, now) = setup();

        let old = now - Duration::days(40);
        item.set_quantity(dec!(4), old);
        ledger.record(&item, dec!(2), ChangeType::Restock, old).unwrap();

        let recent = now - Duration::days(3);
        item.set_quantity(dec!(3), recent);
        ledger.record(&item, dec!(4), ChangeType::ManualUpdate, recent).unwrap();
        item.set_quantity(dec!(5), now);
        ledger.record(&item, dec!(3), ChangeType::Restock, now).unwrap();

        let restocks = ledger.recent_restocks(&item.id, now, 30).unwrap();
        assert_eq!(restocks.len(), 1);
        assert_eq!(restocks[0].quantity_after, dec!(5));
    }
}
