//! Common test utilities for pantry service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::Router;
use axum_test::TestServer;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use pantry_engine::{ManualClock, PantryEngine, RetryConfig, Scheduler};
use pantry_service::{create_router, AppState, ServiceConfig};
use pantry_store::MemoryStore;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// The engine behind the server.
    pub engine: Arc<PantryEngine>,
    /// The clock behind the engine.
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// Create a new test harness with an empty store and a clock at the 06:00 slot.
    pub fn new() -> Self {
        let clock = Arc::new(ManualClock::new(start_time()));
        let mut config = ServiceConfig {
            scheduler_enabled: false,
            ..ServiceConfig::default()
        };
        config.engine.retry = RetryConfig::immediate(3);

        let engine = Arc::new(
            PantryEngine::new(
                Arc::new(MemoryStore::new()),
                clock.clone(),
                config.engine.clone(),
            )
            .expect("valid engine config"),
        );

        let state = AppState::new(Arc::clone(&engine), config);
        let router: Router = create_router(state);
        let server = TestServer::new(router).expect("Failed to create test server");

        Self {
            server,
            engine,
            clock,
        }
    }

    /// A scheduler over the harness engine, for driving ticks directly.
    pub fn scheduler(&self) -> Scheduler {
        Scheduler::new(Arc::clone(&self.engine))
    }

    /// Register an item and enable tracking; returns its ID.
    pub async fn tracked_item(&self, quantity: &str, rate: &str) -> String {
        let created = self
            .server
            .post("/v1/items")
            .json(&json!({ "name": "flour", "quantity": quantity, "unit": "kg" }))
            .await;
        created.assert_status(axum::http::StatusCode::CREATED);
        let id = created.json::<Value>()["id"]
            .as_str()
            .expect("item id")
            .to_string();

        self.server
            .put(&format!("/v1/items/{id}/tracking"))
            .json(&json!({ "consumption_rate": rate, "restock_threshold_days": "2" }))
            .await
            .assert_status_ok();

        id
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

/// The clock's starting instant.
pub fn start_time() -> DateTime<Utc> {
    "2026-03-10T06:00:00Z".parse().expect("valid timestamp")
}

/// Read a decimal field serialized as a string.
pub fn decimal(value: &Value) -> rust_decimal::Decimal {
    value
        .as_str()
        .expect("decimal encoded as string")
        .parse()
        .expect("valid decimal")
}
