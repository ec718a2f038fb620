//! Tracked inventory items.
//!
//! A [`TrackedItem`] is the slice of an inventory record the depletion engine owns:
//! quantity, consumption rate, restock threshold and processing bookkeeping.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{PantryError, Result};
use crate::ItemId;

/// Default number of days of remaining stock at which a reminder is raised.
pub const DEFAULT_RESTOCK_THRESHOLD_DAYS: Decimal = Decimal::TWO;

/// An inventory item as seen by the depletion engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedItem {
    /// Identifier assigned by the inventory layer.
    pub id: ItemId,

    /// Display name, mirrored from the inventory record.
    pub name: String,

    /// Current quantity, never negative.
    pub quantity: Decimal,

    /// Unit the quantity is expressed in (`g`, `ml`, `pcs`, ...).
    pub unit: String,

    /// Whether the item takes part in automatic depletion.
    pub is_tracked: bool,

    /// Quantity consumed per day.
    pub consumption_rate: Decimal,

    /// A reminder is raised once projected days remaining drop to this value.
    pub restock_threshold_days: Decimal,

    /// Largest quantity ever observed for this item.
    pub peak_quantity: Decimal,

    /// Instant up to which depletion has been accounted. `None` means never processed.
    pub last_processed_at: Option<DateTime<Utc>>,

    /// When the rate estimator last wrote `consumption_rate`.
    pub rate_updated_at: Option<DateTime<Utc>>,

    /// When the item was registered with the engine.
    pub created_at: DateTime<Utc>,

    /// When the item was last modified.
    pub updated_at: DateTime<Utc>,
}

impl TrackedItem {
    /// Create an untracked item mirror.
    ///
    /// # Errors
    ///
    /// Returns [`PantryError::InvalidQuantity`] if `quantity` is negative.
    pub fn new(
        id: ItemId,
        name: impl Into<String>,
        quantity: Decimal,
        unit: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Result<Self> {
        validate_quantity(quantity)?;
        Ok(Self {
            id,
            name: name.into(),
            quantity,
            unit: unit.into(),
            is_tracked: false,
            consumption_rate: Decimal::ZERO,
            restock_threshold_days: DEFAULT_RESTOCK_THRESHOLD_DAYS,
            peak_quantity: quantity,
            last_processed_at: None,
            rate_updated_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Projected days until the item runs out.
    ///
    /// `None` means the item never runs out (zero consumption rate).
    #[must_use]
    pub fn days_remaining(&self) -> Option<Decimal> {
        days_remaining(self.quantity, self.consumption_rate)
    }

    /// Whether the projection is at or below the restock threshold.
    #[must_use]
    pub fn needs_restock(&self) -> bool {
        self.days_remaining()
            .is_some_and(|days| days <= self.restock_threshold_days)
    }

    /// Turn tracking on with the given settings.
    pub fn enable_tracking(&mut self, settings: TrackingSettings, now: DateTime<Utc>) {
        self.is_tracked = true;
        self.consumption_rate = settings.consumption_rate;
        self.restock_threshold_days = settings.restock_threshold_days;
        self.updated_at = now;
    }

    /// Turn tracking off. Rate and threshold are kept so re-enabling can reuse them.
    pub fn disable_tracking(&mut self, now: DateTime<Utc>) {
        self.is_tracked = false;
        self.updated_at = now;
    }

    /// Set a new quantity and bump the peak if it was exceeded.
    pub fn set_quantity(&mut self, quantity: Decimal, now: DateTime<Utc>) {
        self.quantity = quantity;
        if quantity > self.peak_quantity {
            self.peak_quantity = quantity;
        }
        self.updated_at = now;
    }
}

/// Projected days of stock for a quantity at a daily rate.
///
/// Returns `None` for a non-positive rate.
#[must_use]
pub fn days_remaining(quantity: Decimal, rate: Decimal) -> Option<Decimal> {
    if rate <= Decimal::ZERO {
        return None;
    }
    Some(quantity.checked_div(rate).unwrap_or(Decimal::MAX))
}

/// Validated tracking configuration for an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackingSettings {
    /// Quantity consumed per day (`>= 0`).
    pub consumption_rate: Decimal,

    /// Reminder threshold in days (`> 0`).
    pub restock_threshold_days: Decimal,
}

impl TrackingSettings {
    /// Build validated settings.
    ///
    /// # Errors
    ///
    /// - [`PantryError::InvalidConsumptionRate`] if the rate is negative.
    /// - [`PantryError::InvalidThreshold`] if the threshold is not positive.
    pub fn new(consumption_rate: Decimal, restock_threshold_days: Decimal) -> Result<Self> {
        let settings = Self {
            consumption_rate,
            restock_threshold_days,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Check the invariants on rate and threshold.
    ///
    /// # Errors
    ///
    /// See [`TrackingSettings::new`].
    pub fn validate(&self) -> Result<()> {
        if self.consumption_rate < Decimal::ZERO {
            return Err(PantryError::InvalidConsumptionRate(self.consumption_rate));
        }
        if self.restock_threshold_days <= Decimal::ZERO {
            return Err(PantryError::InvalidThreshold(self.restock_threshold_days));
        }
        Ok(())
    }
}

impl Default for TrackingSettings {
    fn default() -> Self {
        Self {
            consumption_rate: Decimal::ZERO,
            restock_threshold_days: DEFAULT_RESTOCK_THRESHOLD_DAYS,
        }
    }
}

/// Reject negative quantities.
///
/// # Errors
///
/// Returns [`PantryError::InvalidQuantity`] if `quantity` is negative.
pub fn validate_quantity(quantity: Decimal) -> Result<()> {
    if quantity < Decimal::ZERO {
        return Err(PantryError::InvalidQuantity(quantity));
    }
    Ok(())
}
