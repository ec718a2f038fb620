//! Time-based depletion.
//!
//! Applies `quantity = max(0, quantity - rate * elapsed_days)` to an item and records the
//! transition in the ledger. Applying N days in one step yields the same quantity as N
//! one-day steps, which is what startup catch-up relies on.

use chrono::{DateTime, Utc};
use pantry_core::{ChangeType, TrackedItem, UsageEvent};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::{EngineError, Result};
use crate::ledger::Ledger;

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Fractional days between two instants, floored at zero.
#[must_use]
pub fn elapsed_days(from: DateTime<Utc>, to: DateTime<Utc>) -> Decimal {
    let millis = (to - from).num_milliseconds().max(0);
    Decimal::from(millis) / Decimal::from(MILLIS_PER_DAY)
}

/// Quantity left after consuming at `rate` for `days`, never negative.
///
/// Returns `None` if the computation overflows.
#[must_use]
pub fn deplete(quantity: Decimal, rate: Decimal, days: Decimal) -> Option<Decimal> {
    let consumed = rate.checked_mul(days)?;
    let remaining = quantity.checked_sub(consumed)?;
    Some(remaining.max(Decimal::ZERO))
}

/// Result of depleting one item.
#[derive(Debug, Clone)]
pub struct DepletionOutcome {
    /// The item as persisted.
    pub item: TrackedItem,
    /// The ledger entry written for the step.
    pub event: UsageEvent,
    /// Projection after the step; `None` means the item never runs out.
    pub days_remaining: Option<Decimal>,
}

/// Applies depletion steps and writes them to the ledger.
#[derive(Clone)]
pub struct DepletionProcessor {
    ledger: Ledger,
}

impl DepletionProcessor {
    /// Create a processor writing to `ledger`.
    #[must_use]
    pub fn new(ledger: Ledger) -> Self {
        Self { ledger }
    }

    /// Deplete `item` by `days` of consumption, account it up to `processed_at`, and persist.
    ///
    /// `last_processed_at` never moves backwards.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidItemState`] for a negative rate, negative quantity,
    /// negative duration or arithmetic overflow, and a storage error if the write fails.
    pub fn process(
        &self,
        mut item: TrackedItem,
        days: Decimal,
        processed_at: DateTime<Utc>,
    ) -> Result<DepletionOutcome> {
        if item.consumption_rate < Decimal::ZERO {
            return Err(EngineError::invalid_state(
                item.id,
                format!("negative consumption rate {}", item.consumption_rate),
            ));
        }
        if item.quantity < Decimal::ZERO {
            return Err(EngineError::invalid_state(
                item.id,
                format!("negative quantity {}", item.quantity),
            ));
        }
        if days < Decimal::ZERO {
            return Err(EngineError::invalid_state(
                item.id,
                format!("negative elapsed duration {days}"),
            ));
        }

        let before = item.quantity;
        let after = deplete(before, item.consumption_rate, days)
            .ok_or_else(|| EngineError::invalid_state(item.id, "depletion overflowed"))?;

        item.set_quantity(after, processed_at);
        item.last_processed_at = Some(match item.last_processed_at {
            Some(last) if last > processed_at => last,
            _ => processed_at,
        });

        let event = self
            .ledger
            .record(&item, before, ChangeType::AutoDepletion, processed_at)?;

        debug!(
            item_id = %item.id,
            %before,
            %after,
            %days,
            "depleted item"
        );

        let days_remaining = item.days_remaining();
        Ok(DepletionOutcome {
            item,
            event,
            days_remaining,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pantry_core::{ItemId, TrackingSettings};
    use pantry_store::{MemoryStore, Store};
    use rust_decimal_macros::dec;
    use std::sync::Arc;

    fn now() -> DateTime<Utc> {
        "2026-03-10T06:00:00Z".parse().unwrap()
    }

    fn tracked(quantity: Decimal, rate: Decimal) -> TrackedItem {
        let mut item = TrackedItem::new(ItemId::generate(), "rice", quantity, "kg", now()).unwrap();
        item.enable_tracking(TrackingSettings::new(rate, dec!(2)).unwrap(), now());
        item
    }

    fn processor() -> (DepletionProcessor, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (DepletionProcessor::new(Ledger::new(store.clone())), store)
    }

    #[test]
    fn elapsed_days_is_fractional() {
        let start = now();
        assert_eq!(elapsed_days(start, start + Duration::days(3)), dec!(3));
        assert_eq!(elapsed_days(start, start + Duration::hours(12)), dec!(0.5));
        assert_eq!(elapsed_days(start + Duration::hours(1), start), Decimal::ZERO);
    }

    #[test]
    fn deplete_floors_at_zero() {
        assert_eq!(deplete(dec!(2), dec!(0.5), dec!(1)), Some(dec!(1.5)));
        assert_eq!(deplete(dec!(0.5), dec!(1), dec!(3)), Some(Decimal::ZERO));
        assert_eq!(deplete(dec!(1), Decimal::ZERO, dec!(100)), Some(dec!(1)));
        assert_eq!(deplete(dec!(1), Decimal::MAX, Decimal::MAX), None);
    }

    #[test]
    fn process_writes_item_and_ledger_entry() {
        let (processor, store) = processor();
        let item = tracked(dec!(2), dec!(0.5));
        let id = item.id;

        let outcome = processor.process(item, dec!(1), now()).unwrap();

        assert_eq!(outcome.item.quantity, dec!(1.5));
        assert_eq!(outcome.days_remaining, Some(dec!(3)));
        assert_eq!(outcome.event.quantity_before, dec!(2));
        assert_eq!(outcome.event.change_type, ChangeType::AutoDepletion);

        let stored = store.get_item(&id).unwrap().unwrap();
        assert_eq!(stored.quantity, dec!(1.5));
        assert_eq!(stored.last_processed_at, Some(now()));
    }

    #[test]
    fn zero_rate_writes_zero_change_entry() {
        let (processor, store) = processor();
        let item = tracked(dec!(2), Decimal::ZERO);
        let id = item.id;

        let outcome = processor.process(item, dec!(1), now()).unwrap();
        assert_eq!(outcome.item.quantity, dec!(2));
        assert_eq!(outcome.event.quantity_change, Decimal::ZERO);
        assert_eq!(outcome.days_remaining, None);
        assert_eq!(
            store
                .list_usage_events(&id, now(), now() + Duration::days(1))
                .unwrap()
                .len(),
            1
        );
    }

    #[test]
    fn last_processed_at_never_moves_backwards() {
        let (processor, _store) = processor();
        let mut item = tracked(dec!(2), dec!(0.5));
        let later = now() + Duration::hours(2);
        item.last_processed_at = Some(later);

        let outcome = processor.process(item, dec!(1), now()).unwrap();
        assert_eq!(outcome.item.last_processed_at, Some(later));
    }

    #[test]
    fn negative_rate_is_rejected_without_writing() {
        let (processor, store) = processor();
        let mut item = tracked(dec!(2), dec!(0.5));
        item.consumption_rate = dec!(-1);
        let id = item.id;

        let err = processor.process(item, dec!(1), now()).unwrap_err();
        assert!(matches!(err, EngineError::InvalidItemState { .. }));
        assert!(store.get_item(&id).unwrap().is_none());
    }
}
