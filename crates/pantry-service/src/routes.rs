//! Router configuration.
//!
//! This module sets up the Axum router with all routes and middleware.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{get, post, put};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{health, history, items, projections, quantity, tracking};
use crate::state::AppState;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// - `GET /health` - Health check and scheduler status
/// - `POST /v1/items` - Register an item
/// - `GET /v1/items/:id` - Item projection
/// - `PUT /v1/items/:id/tracking` - Enable tracking or change rate and threshold
/// - `DELETE /v1/items/:id/tracking` - Disable tracking
/// - `POST /v1/items/:id/quantity` - Report a manual update or restock
/// - `GET /v1/items/:id/history` - Usage ledger within `from`/`to`
/// - `GET /v1/items/:id/reminders` - Reminder history
/// - `GET /v1/projections` - Projections for all tracked items
pub fn create_router(state: AppState) -> Router {
    // Extract config values before moving state
    let cors_origins = state.config.cors_origins.clone();
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let cors = build_cors_layer(&cors_origins);

    let state = Arc::new(state);

    Router::new()
        .route("/health", get(health::health))
        // Items
        .route("/v1/items", post(items::create_item))
        .route("/v1/items/:id", get(items::get_item))
        .route(
            "/v1/items/:id/tracking",
            put(tracking::enable_tracking).delete(tracking::disable_tracking),
        )
        .route("/v1/items/:id/quantity", post(quantity::report_quantity))
        .route("/v1/items/:id/history", get(history::usage_history))
        .route("/v1/items/:id/reminders", get(history::restock_history))
        // Projections
        .route("/v1/projections", get(projections::list_projections))
        // Middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(
            request_timeout_seconds,
        )))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
