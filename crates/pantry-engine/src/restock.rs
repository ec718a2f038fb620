//! Restock reminder management.
//!
//! Decides, after every quantity change, whether an item's reminder should be created,
//! refreshed, retired or left alone. At most one reminder per item is active; if storage
//! ever holds more, the oldest is kept and the rest are retired as duplicates.

use std::sync::Arc;

use chrono::{DateTime, NaiveTime, Utc};
use pantry_core::{ItemId, RestockEvent, RestockResolution, TrackedItem};
use pantry_store::Store;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::clock::next_occurrence;
use crate::error::Result;

/// What an evaluation did to the item's reminder.
#[derive(Debug, Clone, PartialEq)]
pub enum RestockAction {
    /// A new reminder was created.
    Created(RestockEvent),
    /// The active reminder's projection was refreshed.
    Updated(RestockEvent),
    /// The active reminder was retired.
    Retired(RestockEvent),
    /// A restock retired the active reminder, but stock is still low enough for a new one.
    Replaced {
        /// The reminder resolved by the restock.
        retired: RestockEvent,
        /// The reminder raised from the restocked quantity.
        created: RestockEvent,
    },
    /// Nothing changed.
    Unchanged,
}

impl RestockAction {
    /// The reminder touched by the evaluation, if any; the new one for a replacement.
    #[must_use]
    pub fn reminder(&self) -> Option<&RestockEvent> {
        match self {
            Self::Created(event)
            | Self::Updated(event)
            | Self::Retired(event)
            | Self::Replaced { created: event, .. } => Some(event),
            Self::Unchanged => None,
        }
    }
}

/// Creates, refreshes and retires restock reminders.
#[derive(Clone)]
pub struct RestockManager {
    store: Arc<dyn Store>,
    reminder_time: NaiveTime,
    margin_fraction: Decimal,
    margin_floor: Decimal,
}

impl RestockManager {
    /// Create a manager.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        reminder_time: NaiveTime,
        margin_fraction: Decimal,
        margin_floor: Decimal,
    ) -> Self {
        Self {
            store,
            reminder_time,
            margin_fraction,
            margin_floor,
        }
    }

    /// Quantity increase over a reminder's creation quantity that counts as a restock.
    #[must_use]
    pub fn restock_margin(&self, item: &TrackedItem) -> Decimal {
        let scaled = item
            .peak_quantity
            .checked_mul(self.margin_fraction)
            .unwrap_or(Decimal::MAX);
        scaled.max(self.margin_floor)
    }

    /// When a reminder created at `now` should be shown.
    #[must_use]
    pub fn reminder_slot(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        next_occurrence(now, self.reminder_time)
    }

    /// Evaluate the reminder for `item` given its fresh projection.
    ///
    /// A restock retires the active reminder; if the restocked quantity is still at or
    /// below the threshold, a new reminder is raised from it in the same evaluation.
    ///
    /// # Errors
    ///
    /// Returns a storage error if reading or writing reminders fails.
    pub fn evaluate(
        &self,
        item: &TrackedItem,
        days_remaining: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<RestockAction> {
        let retired = match self.active_reminder(&item.id, now)? {
            Some(reminder) => {
                let margin = self.restock_margin(item);
                let restocked = reminder
                    .quantity_at_creation
                    .checked_add(margin)
                    .is_some_and(|limit| item.quantity > limit);
                if !restocked {
                    return self.refresh(item, reminder, days_remaining, now);
                }
                Some(self.retire(reminder, RestockResolution::Restocked, now)?)
            }
            None => None,
        };

        let created = match days_remaining {
            Some(days) if item.is_tracked && days <= item.restock_threshold_days => {
                Some(self.create(item, days, now)?)
            }
            _ => None,
        };

        Ok(match (retired, created) {
            (Some(retired), Some(created)) => RestockAction::Replaced { retired, created },
            (Some(retired), None) => RestockAction::Retired(retired),
            (None, Some(created)) => RestockAction::Created(created),
            (None, None) => RestockAction::Unchanged,
        })
    }

    fn refresh(
        &self,
        item: &TrackedItem,
        mut reminder: RestockEvent,
        days_remaining: Option<Decimal>,
        now: DateTime<Utc>,
    ) -> Result<RestockAction> {
        match days_remaining {
            Some(days)
                if item.is_tracked
                    && days <= item.restock_threshold_days
                    && days < reminder.days_remaining =>
            {
                reminder.refresh(item.quantity, days, now);
                let stored = self.store.upsert_active_restock_event(&reminder)?;
                debug!(item_id = %item.id, %days, "refreshed restock reminder");
                Ok(RestockAction::Updated(stored))
            }
            _ => Ok(RestockAction::Unchanged),
        }
    }

    fn create(&self, item: &TrackedItem, days: Decimal, now: DateTime<Utc>) -> Result<RestockEvent> {
        let reminder = RestockEvent::new(item.id, self.reminder_slot(now), item.quantity, days, now);
        let stored = self.store.upsert_active_restock_event(&reminder)?;
        info!(
            item_id = %item.id,
            reminder_id = %stored.id,
            %days,
            scheduled_for = %stored.scheduled_for,
            "created restock reminder"
        );
        Ok(stored)
    }

    /// Retire the item's active reminder, if there is one.
    ///
    /// # Errors
    ///
    /// Returns a storage error if reading or writing reminders fails.
    pub fn retire_active(
        &self,
        item_id: &ItemId,
        resolution: RestockResolution,
        now: DateTime<Utc>,
    ) -> Result<RestockAction> {
        match self.active_reminder(item_id, now)? {
            Some(reminder) => Ok(RestockAction::Retired(self.retire(reminder, resolution, now)?)),
            None => Ok(RestockAction::Unchanged),
        }
    }

    /// The item's single active reminder, collapsing duplicates if storage holds several.
    ///
    /// # Errors
    ///
    /// Returns a storage error if reading or writing reminders fails.
    pub fn active_reminder(
        &self,
        item_id: &ItemId,
        now: DateTime<Utc>,
    ) -> Result<Option<RestockEvent>> {
        let mut active = self.store.active_restock_events(item_id)?;
        if active.len() > 1 {
            warn!(
                item_id = %item_id,
                count = active.len(),
                "multiple active restock reminders, keeping the oldest"
            );
            active.sort_by_key(|e| (e.created_at, e.id));
            for mut duplicate in active.drain(1..) {
                duplicate.resolve(RestockResolution::Duplicate, now);
                self.store.put_restock_event(&duplicate)?;
            }
        }
        Ok(active.into_iter().next())
    }

    fn retire(
        &self,
        mut reminder: RestockEvent,
        resolution: RestockResolution,
        now: DateTime<Utc>,
    ) -> Result<RestockEvent> {
        reminder.resolve(resolution, now);
        self.store.put_restock_event(&reminder)?;
        info!(
            item_id = %reminder.item_id,
            reminder_id = %reminder.id,
            ?resolution,
            "retired restock reminder"
        );
        Ok(reminder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pantry_core::TrackingSettings;
    use pantry_store::MemoryStore;
    use rust_decimal_macros::dec;

    fn now() -> DateTime<Utc> {
        "2026-03-10T06:00:00Z".parse().unwrap()
    }

    fn manager() -> (RestockManager, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let manager = RestockManager::new(
            store.clone(),
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            dec!(0.5),
            dec!(0.25),
        );
        (manager, store)
    }

    fn item(quantity: Decimal, rate: Decimal) -> TrackedItem {
        let mut item = TrackedItem::new(ItemId::generate(), "eggs", quantity, "pcs", now()).unwrap();
        item.enable_tracking(TrackingSettings::new(rate, dec!(2)).unwrap(), now());
        item
    }

    #[test]
    fn creates_reminder_at_threshold() {
        let (manager, store) = manager();
        let item = item(dec!(1), dec!(0.5));

        let action = manager.evaluate(&item, item.days_remaining(), now()).unwrap();
        let RestockAction::Created(reminder) = action else {
            panic!("expected a new reminder, got {action:?}");
        };
        assert_eq!(reminder.days_remaining, dec!(2));
        assert_eq!(reminder.quantity_at_creation, dec!(1));
        assert_eq!(
            reminder.scheduled_for,
            "2026-03-10T08:00:00Z".parse::<DateTime<Utc>>().unwrap()
        );
        assert_eq!(store.active_restock_events(&item.id).unwrap().len(), 1);
    }

    #[test]
    fn above_threshold_or_zero_rate_is_unchanged() {
        let (manager, store) = manager();

        let plenty = item(dec!(5), dec!(0.5));
        assert_eq!(
            manager.evaluate(&plenty, plenty.days_remaining(), now()).unwrap(),
            RestockAction::Unchanged
        );

        let never_used = item(Decimal::ZERO, Decimal::ZERO);
        assert_eq!(
            manager
                .evaluate(&never_used, never_used.days_remaining(), now())
                .unwrap(),
            RestockAction::Unchanged
        );
        assert!(store.list_active_restock_events().unwrap().is_empty());
    }

    #[test]
    fn refreshes_only_when_projection_drops() {
        let (manager, store) = manager();
        let mut item = item(dec!(1), dec!(0.5));
        let created = manager.evaluate(&item, item.days_remaining(), now()).unwrap();
        let created = created.reminder().unwrap().clone();

        let later = now() + Duration::days(1);
        item.set_quantity(dec!(0.5), later);
        let action = manager.evaluate(&item, item.days_remaining(), later).unwrap();
        let RestockAction::Updated(updated) = action else {
            panic!("expected a refresh, got {action:?}");
        };
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.days_remaining, dec!(1));
        assert_eq!(updated.quantity_at_creation, dec!(1));

        // A small top-up raises the projection but stays within the margin.
        item.set_quantity(dec!(0.75), later);
        assert_eq!(
            manager.evaluate(&item, item.days_remaining(), later).unwrap(),
            RestockAction::Unchanged
        );
        assert_eq!(store.list_restock_events(&item.id).unwrap().len(), 1);
    }

    #[test]
    fn restock_past_margin_retires_reminder() {
        let (manager, store) = manager();
        let mut item = item(dec!(0.3), dec!(0.5));
        manager.evaluate(&item, item.days_remaining(), now()).unwrap();

        item.set_quantity(dec!(5), now());
        let action = manager.evaluate(&item, item.days_remaining(), now()).unwrap();
        let RestockAction::Retired(retired) = action else {
            panic!("expected retirement, got {action:?}");
        };
        assert_eq!(retired.resolution, Some(RestockResolution::Restocked));
        assert!(store.active_restock_events(&item.id).unwrap().is_empty());
    }

    #[test]
    fn restock_still_below_threshold_replaces_reminder() {
        let (manager, store) = manager();
        let mut item = item(dec!(0.3), dec!(0.5));
        let first = manager.evaluate(&item, item.days_remaining(), now()).unwrap();
        let first = first.reminder().unwrap().clone();

        // Margin is 0.45 of the new peak, so 0.9 counts as a restock but lasts only 1.8 days.
        item.set_quantity(dec!(0.9), now());
        let action = manager.evaluate(&item, item.days_remaining(), now()).unwrap();
        let RestockAction::Replaced { retired, created } = action else {
            panic!("expected a replacement, got {action:?}");
        };
        assert_eq!(retired.id, first.id);
        assert_eq!(retired.resolution, Some(RestockResolution::Restocked));
        assert_ne!(created.id, first.id);
        assert_eq!(created.quantity_at_creation, dec!(0.9));
        assert_eq!(created.days_remaining, dec!(1.8));

        let active = store.active_restock_events(&item.id).unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, created.id);
    }

    #[test]
    fn margin_has_a_floor() {
        let (manager, _store) = manager();
        let small = item(dec!(0.1), dec!(0.5));
        assert_eq!(manager.restock_margin(&small), dec!(0.25));

        let large = item(dec!(10), dec!(0.5));
        assert_eq!(manager.restock_margin(&large), dec!(5));
    }

    #[test]
    fn duplicates_are_collapsed_to_the_oldest() {
        let (manager, store) = manager();
        let item = item(dec!(0.5), dec!(0.5));

        let oldest = RestockEvent::new(item.id, now(), dec!(1), dec!(2), now());
        let newer = RestockEvent::new(
            item.id,
            now(),
            dec!(0.5),
            dec!(1),
            now() + Duration::hours(1),
        );
        store.put_restock_event(&newer).unwrap();
        store.put_restock_event(&oldest).unwrap();

        let kept = manager.active_reminder(&item.id, now()).unwrap().unwrap();
        assert_eq!(kept.id, oldest.id);

        let active = store.active_restock_events(&item.id).unwrap();
        assert_eq!(active.len(), 1);
        let retired = store.get_restock_event(&newer.id).unwrap().unwrap();
        assert_eq!(retired.resolution, Some(RestockResolution::Duplicate));
    }

    #[test]
    fn retire_active_without_reminder_is_noop() {
        let (manager, _store) = manager();
        assert_eq!(
            manager
                .retire_active(&ItemId::generate(), RestockResolution::TrackingDisabled, now())
                .unwrap(),
            RestockAction::Unchanged
        );
    }
}
