//! External quantity report handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use pantry_core::{ChangeType, TrackedItem, UsageEvent};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::{parse_item_id, ReminderChange};
use crate::state::AppState;

/// Quantity report request.
#[derive(Debug, Deserialize)]
pub struct QuantityRequest {
    /// New absolute quantity.
    pub quantity: Decimal,
    /// `manual_update` or `restock`.
    pub change_type: String,
}

/// Quantity report response.
#[derive(Debug, Serialize)]
pub struct QuantityResponse {
    /// The item as persisted.
    pub item: TrackedItem,
    /// The ledger entry written.
    pub event: UsageEvent,
    /// Effect on the restock reminder.
    pub reminder: ReminderChange,
}

/// Record a manual update or restock.
pub async fn report_quantity(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<QuantityRequest>,
) -> Result<Json<QuantityResponse>, ApiError> {
    let id = parse_item_id(&id)?;
    let change_type: ChangeType = req
        .change_type
        .parse()
        .map_err(|e: pantry_core::PantryError| ApiError::BadRequest(e.to_string()))?;

    let report = state
        .engine
        .report_quantity_change(id, req.quantity, change_type)
        .await?;

    Ok(Json(QuantityResponse {
        item: report.item,
        event: report.event,
        reminder: report.reminder.into(),
    }))
}
