//! Item registration handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use pantry_core::{ItemId, TrackedItem};
use pantry_engine::ItemProjection;
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::error::ApiError;
use crate::handlers::parse_item_id;
use crate::state::AppState;

/// Register item request.
#[derive(Debug, Deserialize)]
pub struct CreateItemRequest {
    /// Item ID from the inventory layer; generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    /// Display name.
    pub name: String,
    /// Current quantity.
    pub quantity: Decimal,
    /// Unit of the quantity.
    pub unit: String,
}

/// Register an item. Tracking starts disabled.
pub async fn create_item(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateItemRequest>,
) -> Result<(StatusCode, Json<TrackedItem>), ApiError> {
    if req.name.trim().is_empty() {
        return Err(ApiError::BadRequest("name must not be empty".into()));
    }

    let id = match req.id.as_deref() {
        Some(raw) => parse_item_id(raw)?,
        None => ItemId::generate(),
    };

    let item = state
        .engine
        .register_item(id, req.name.trim(), req.quantity, &req.unit)
        .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// Get an item's current projection.
pub async fn get_item(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<ItemProjection>, ApiError> {
    let id = parse_item_id(&id)?;
    Ok(Json(state.engine.projection(&id)?))
}
