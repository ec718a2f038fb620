//! Ledger and reminder history handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Duration, Utc};
use pantry_core::{ItemId, RestockEvent, UsageEvent};
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::handlers::parse_item_id;
use crate::state::AppState;

/// Default history window when `from` is omitted.
const DEFAULT_WINDOW_DAYS: i64 = 30;

/// History query parameters.
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    /// Window start, inclusive (default: 30 days before `to`).
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Window end, exclusive (default: now, inclusive of entries written at this instant).
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

/// Usage history response.
#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    /// The item.
    pub item_id: ItemId,
    /// Window start.
    pub from: DateTime<Utc>,
    /// Window end.
    pub to: DateTime<Utc>,
    /// Ledger entries, oldest first.
    pub events: Vec<UsageEvent>,
}

/// List ledger entries for an item within a time window.
pub async fn usage_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let id = parse_item_id(&id)?;
    // The end bound is exclusive; the default must still cover entries written just now.
    let to = query
        .to
        .unwrap_or_else(|| state.engine.now() + Duration::milliseconds(1));
    let from = match query.from {
        Some(from) => from,
        None => to
            .checked_sub_signed(Duration::days(DEFAULT_WINDOW_DAYS))
            .ok_or_else(|| {
                ApiError::BadRequest(format!(
                    "no {DEFAULT_WINDOW_DAYS}-day window fits before {to}; pass `from` explicitly"
                ))
            })?,
    };

    let events = state.engine.usage_history(&id, from, to)?;

    Ok(Json(HistoryResponse {
        item_id: id,
        from,
        to,
        events,
    }))
}

/// Reminder history response.
#[derive(Debug, Serialize)]
pub struct RemindersResponse {
    /// The item.
    pub item_id: ItemId,
    /// All reminders, oldest first.
    pub reminders: Vec<RestockEvent>,
}

/// List every reminder raised for an item.
pub async fn restock_history(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<RemindersResponse>, ApiError> {
    let id = parse_item_id(&id)?;
    let reminders = state.engine.restock_history(&id)?;
    Ok(Json(RemindersResponse {
        item_id: id,
        reminders,
    }))
}
