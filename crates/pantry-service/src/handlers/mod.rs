//! HTTP request handlers.

pub mod health;
pub mod history;
pub mod items;
pub mod projections;
pub mod quantity;
pub mod tracking;

use pantry_core::{ItemId, RestockEvent};
use pantry_engine::RestockAction;
use serde::Serialize;

use crate::error::ApiError;

/// Parse an item ID from a path segment.
pub(crate) fn parse_item_id(raw: &str) -> Result<ItemId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid item id: {raw}")))
}

/// What a request did to an item's restock reminder.
#[derive(Debug, Serialize)]
pub struct ReminderChange {
    /// `created`, `updated`, `retired`, `replaced` or `unchanged`.
    pub action: &'static str,
    /// The reminder touched, if any; for `replaced`, the new one.
    pub reminder: Option<RestockEvent>,
    /// The reminder a restock resolved before raising a new one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub retired: Option<RestockEvent>,
}

impl From<RestockAction> for ReminderChange {
    fn from(action: RestockAction) -> Self {
        let label = match &action {
            RestockAction::Created(_) => "created",
            RestockAction::Updated(_) => "updated",
            RestockAction::Retired(_) => "retired",
            RestockAction::Replaced { .. } => "replaced",
            RestockAction::Unchanged => "unchanged",
        };
        let reminder = action.reminder().cloned();
        let retired = match action {
            RestockAction::Replaced { retired, .. } => Some(retired),
            _ => None,
        };
        Self {
            action: label,
            reminder,
            retired,
        }
    }
}
