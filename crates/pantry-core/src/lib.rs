//! Core types for the pantry depletion engine.
//!
//! This crate provides the domain types shared by the store, the engine and the service:
//!
//! - **Identifiers**: `ItemId`, `UsageEventId`, `RestockEventId`
//! - **Items**: `TrackedItem`, `TrackingSettings`
//! - **Ledger**: `UsageEvent`, `ChangeType`
//! - **Reminders**: `RestockEvent`, `RestockStatus`, `RestockResolution`
//!
//! # Quantities
//!
//! Quantities, consumption rates and thresholds are exact decimals so that repeated
//! depletion steps add up to the same result as one combined step.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod ids;
pub mod item;
pub mod restock;
pub mod usage;

pub use error::{PantryError, Result};
pub use ids::{IdError, ItemId, RestockEventId, UsageEventId};
pub use item::{
    days_remaining, validate_quantity, TrackedItem, TrackingSettings,
    DEFAULT_RESTOCK_THRESHOLD_DAYS,
};
pub use restock::{RestockEvent, RestockResolution, RestockStatus};
pub use usage::{ChangeType, UsageEvent};
