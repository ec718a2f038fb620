//! Restock reminders.
//!
//! At most one reminder per item may be [`RestockStatus::Active`] at any time.
//! Retired reminders are kept with a [`RestockResolution`] for history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{ItemId, RestockEventId};

/// A calendar-like reminder to restock an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestockEvent {
    /// Unique reminder ID.
    pub id: RestockEventId,

    /// The item to restock.
    pub item_id: ItemId,

    /// When the reminder should be shown.
    pub scheduled_for: DateTime<Utc>,

    /// Projected days of stock left, as of the latest update.
    pub days_remaining: Decimal,

    /// Quantity when the reminder was created. Restock detection compares against this.
    pub quantity_at_creation: Decimal,

    /// Quantity as of the latest update.
    pub latest_quantity: Decimal,

    /// Lifecycle state.
    pub status: RestockStatus,

    /// Why the reminder was retired, if it was.
    pub resolution: Option<RestockResolution>,

    /// When the reminder was created.
    pub created_at: DateTime<Utc>,

    /// When the payload was last updated.
    pub updated_at: DateTime<Utc>,

    /// When the reminder was retired.
    pub resolved_at: Option<DateTime<Utc>>,
}

impl RestockEvent {
    /// Create an active reminder.
    #[must_use]
    pub fn new(
        item_id: ItemId,
        scheduled_for: DateTime<Utc>,
        quantity: Decimal,
        days_remaining: Decimal,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RestockEventId::generate(),
            item_id,
            scheduled_for,
            days_remaining,
            quantity_at_creation: quantity,
            latest_quantity: quantity,
            status: RestockStatus::Active,
            resolution: None,
            created_at: now,
            updated_at: now,
            resolved_at: None,
        }
    }

    /// Whether the reminder is still active.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == RestockStatus::Active
    }

    /// Refresh the payload with a newer projection. Creation metadata is left untouched.
    pub fn refresh(&mut self, quantity: Decimal, days_remaining: Decimal, now: DateTime<Utc>) {
        self.latest_quantity = quantity;
        self.days_remaining = days_remaining;
        self.updated_at = now;
    }

    /// Retire the reminder.
    pub fn resolve(&mut self, resolution: RestockResolution, now: DateTime<Utc>) {
        self.status = RestockStatus::Resolved;
        self.resolution = Some(resolution);
        self.resolved_at = Some(now);
        self.updated_at = now;
    }
}

/// Reminder lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestockStatus {
    /// Shown to the user until the item is replenished.
    Active,

    /// Retired.
    Resolved,
}

/// Why a reminder was retired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RestockResolution {
    /// The quantity rose past the restock-detection margin.
    Restocked,

    /// Collapsed into another active reminder for the same item.
    Duplicate,

    /// Tracking was disabled for the item.
    TrackingDisabled,
}
