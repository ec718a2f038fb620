//! Projection handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use pantry_engine::ItemProjection;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

/// Projections response.
#[derive(Debug, Serialize)]
pub struct ProjectionsResponse {
    /// One entry per tracked item.
    pub items: Vec<ItemProjection>,
    /// Number of items at or below their restock threshold.
    pub needs_restock: usize,
}

/// List projections for all tracked items.
pub async fn list_projections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ProjectionsResponse>, ApiError> {
    let items = state.engine.projections()?;
    let needs_restock = items.iter().filter(|p| p.needs_restock).count();
    Ok(Json(ProjectionsResponse {
        items,
        needs_restock,
    }))
}
