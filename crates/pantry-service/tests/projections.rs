//! Projection endpoint tests.

mod common;

use chrono::Duration;
use common::{decimal, start_time, TestHarness};
use rust_decimal_macros::dec;
use serde_json::Value;

#[tokio::test]
async fn projections_follow_daily_depletion() {
    let harness = TestHarness::new();
    let flour = harness.tracked_item("2", "0.5").await;
    let sugar = harness.tracked_item("10", "0").await;
    let scheduler = harness.scheduler();

    scheduler.run_daily_tick().await;
    harness.clock.advance(Duration::days(1));
    scheduler.run_daily_tick().await;

    let response = harness.server.get("/v1/projections").await;
    response.assert_status_ok();
    let body: Value = response.json();

    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(body["needs_restock"], 1);

    let flour = items.iter().find(|p| p["item_id"] == flour.as_str()).unwrap();
    assert_eq!(decimal(&flour["quantity"]), dec!(1.0));
    assert_eq!(decimal(&flour["days_remaining"]), dec!(2));
    assert_eq!(flour["needs_restock"], true);
    assert_eq!(flour["active_reminder"]["status"], "active");
    let expected: chrono::DateTime<chrono::Utc> = start_time() + Duration::days(3);
    let projected: chrono::DateTime<chrono::Utc> =
        flour["projected_depletion_at"].as_str().unwrap().parse().unwrap();
    assert_eq!(projected, expected);

    let sugar = items.iter().find(|p| p["item_id"] == sugar.as_str()).unwrap();
    assert!(sugar["days_remaining"].is_null());
    assert!(sugar["projected_depletion_at"].is_null());
    assert_eq!(sugar["needs_restock"], false);
}

#[tokio::test]
async fn untracked_items_are_not_projected() {
    let harness = TestHarness::new();
    let id = harness.tracked_item("2", "0.5").await;

    harness
        .server
        .delete(&format!("/v1/items/{id}/tracking"))
        .await
        .assert_status_ok();

    let body: Value = harness.server.get("/v1/projections").await.json();
    assert!(body["items"].as_array().unwrap().is_empty());

    let single: Value = harness.server.get(&format!("/v1/items/{id}")).await.json();
    assert_eq!(single["is_tracked"], false);
}
