//! Usage ledger entries.
//!
//! Every quantity change of an item is recorded as one immutable [`UsageEvent`].

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::PantryError;
use crate::{ItemId, UsageEventId};

/// A single quantity change of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageEvent {
    /// Unique entry ID.
    pub id: UsageEventId,

    /// The item whose quantity changed.
    pub item_id: ItemId,

    /// Quantity before the change.
    pub quantity_before: Decimal,

    /// Quantity after the change.
    pub quantity_after: Decimal,

    /// `quantity_after - quantity_before`.
    pub quantity_change: Decimal,

    /// Why the quantity changed.
    pub change_type: ChangeType,

    /// When the change took effect.
    pub occurred_at: DateTime<Utc>,
}

impl UsageEvent {
    /// Record a change from `before` to `after`.
    #[must_use]
    pub fn new(
        item_id: ItemId,
        quantity_before: Decimal,
        quantity_after: Decimal,
        change_type: ChangeType,
        occurred_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UsageEventId::generate(),
            item_id,
            quantity_before,
            quantity_after,
            quantity_change: quantity_after - quantity_before,
            change_type,
            occurred_at,
        }
    }

    /// Whether this entry records an increase in quantity.
    #[must_use]
    pub fn is_increase(&self) -> bool {
        self.quantity_change > Decimal::ZERO
    }
}

/// Reason for a quantity change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeType {
    /// Time-based depletion applied by the engine.
    AutoDepletion,

    /// A correction reported by the user.
    ManualUpdate,

    /// The user replenished the item.
    Restock,
}

impl ChangeType {
    /// Get the change type as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::AutoDepletion => "auto_depletion",
            Self::ManualUpdate => "manual_update",
            Self::Restock => "restock",
        }
    }

    /// Whether the change may be reported from outside the engine.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        matches!(self, Self::ManualUpdate | Self::Restock)
    }
}

impl std::str::FromStr for ChangeType {
    type Err = PantryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto_depletion" => Ok(Self::AutoDepletion),
            "manual_update" => Ok(Self::ManualUpdate),
            "restock" => Ok(Self::Restock),
            other => Err(PantryError::InvalidChangeType(other.to_string())),
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
