//! Pantry HTTP API Service.
//!
//! This crate exposes the depletion engine over HTTP:
//!
//! - Item registration and tracking configuration
//! - External quantity reports (manual updates and restocks)
//! - Projections, usage history and reminder history
//!
//! The background scheduler runs in the same process; its status is reported by
//! `GET /health`.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers over the sync store stay async for Axum

pub mod config;
pub mod error;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::ServiceConfig;
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
