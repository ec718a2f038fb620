//! Tracking configuration handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use pantry_core::{TrackedItem, TrackingSettings, DEFAULT_RESTOCK_THRESHOLD_DAYS};
use pantry_engine::ItemUpdate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::{parse_item_id, ReminderChange};
use crate::state::AppState;

/// Enable tracking request.
#[derive(Debug, Deserialize)]
pub struct EnableTrackingRequest {
    /// Quantity consumed per day.
    pub consumption_rate: Decimal,
    /// Days of stock at which a reminder is raised (default: 2).
    #[serde(default = "default_threshold")]
    pub restock_threshold_days: Decimal,
}

fn default_threshold() -> Decimal {
    DEFAULT_RESTOCK_THRESHOLD_DAYS
}

/// Tracking change response.
#[derive(Debug, Serialize)]
pub struct TrackingResponse {
    /// The item as persisted.
    pub item: TrackedItem,
    /// Effect on the restock reminder.
    pub reminder: ReminderChange,
}

impl From<ItemUpdate> for TrackingResponse {
    fn from(update: ItemUpdate) -> Self {
        Self {
            item: update.item,
            reminder: update.reminder.into(),
        }
    }
}

/// Enable tracking, or update rate and threshold.
pub async fn enable_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<EnableTrackingRequest>,
) -> Result<Json<TrackingResponse>, ApiError> {
    let id = parse_item_id(&id)?;
    let settings = TrackingSettings::new(req.consumption_rate, req.restock_threshold_days)
        .map_err(|e| ApiError::BadRequest(e.to_string()))?;

    let update = state.engine.enable_tracking(id, settings).await?;
    Ok(Json(update.into()))
}

/// Disable tracking and retire the active reminder.
pub async fn disable_tracking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<TrackingResponse>, ApiError> {
    let id = parse_item_id(&id)?;
    let update = state.engine.disable_tracking(id).await?;
    Ok(Json(update.into()))
}
