//! Generation gate and completion callback integration tests.

mod common;

use chrono::Utc;
use common::TestHarness;
use serde_json::json;

// Default policy: 10 base + 1 per full minute.

// ============================================================================
// Pre-check
// ============================================================================

#[tokio::test]
async fn check_allows_when_balance_covers_cost() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let response = harness
        .server
        .post("/v1/generation/check")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .add_header("x-service-name", "podcast-gen")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "estimated_duration_seconds": 120
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["allowed"], true);
    assert_eq!(body["total_points"], 100);
    assert_eq!(body["required"], 12);
}

#[tokio::test]
async fn check_denies_when_balance_insufficient() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    // 100 minutes: 10 base + 100 per-minute = 110 > 100
    let response = harness
        .server
        .post("/v1/generation/check")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "estimated_duration_seconds": 6000
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["allowed"], false);
    assert_eq!(body["required"], 110);
}

#[tokio::test]
async fn check_does_not_debit() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    harness
        .server
        .post("/v1/generation/check")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "estimated_duration_seconds": 60
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/points/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_points"], 100);
}

#[tokio::test]
async fn check_without_api_key_fails() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let response = harness
        .server
        .post("/v1/generation/check")
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "estimated_duration_seconds": 60
        }))
        .await;

    response.assert_status_unauthorized();
}

#[tokio::test]
async fn check_unknown_account_is_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/generation/check")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "user_id": harness.test_user_id.to_string(),
            "estimated_duration_seconds": 60
        }))
        .await;

    response.assert_status_not_found();
}

// ============================================================================
// Completion Callback
// ============================================================================

#[tokio::test]
async fn complete_debits_generation_cost() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let response = harness
        .server
        .post("/v1/generation/complete")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .add_header("x-service-name", "podcast-gen")
        .json(&json!({
            "task_id": "task_001",
            "user_id": harness.test_user_id.to_string(),
            "duration_seconds": 180,
            "completed_at": Utc::now().to_rfc3339()
        }))
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["cost"], 13);
    assert_eq!(body["total_points"], 87);
    assert!(body["transaction_id"].as_str().is_some());
}

#[tokio::test]
async fn complete_records_debit_in_transaction_log() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;
    tokio::time::sleep(std::time::Duration::from_millis(2)).await;

    harness
        .server
        .post("/v1/generation/complete")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "task_id": "task_002",
            "user_id": harness.test_user_id.to_string(),
            "duration_seconds": 0,
            "completed_at": Utc::now().to_rfc3339()
        }))
        .await
        .assert_status_ok();

    let response = harness
        .server
        .get("/v1/points/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;

    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions[0]["reason"], "podcast_generation");
    assert_eq!(transactions[0]["points_change"], -10);
}

#[tokio::test]
async fn complete_with_insufficient_balance_is_payment_required() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    // 200 minutes: 10 + 200 = 210 > 100
    let response = harness
        .server
        .post("/v1/generation/complete")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "task_id": "task_003",
            "user_id": harness.test_user_id.to_string(),
            "duration_seconds": 12000,
            "completed_at": Utc::now().to_rfc3339()
        }))
        .await;

    response.assert_status(axum::http::StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["balance"], 100);
    assert_eq!(body["error"]["details"]["required"], 210);

    // Balance unchanged by the failed debit
    let response = harness
        .server
        .get("/v1/points/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_points"], 100);
}

#[tokio::test]
async fn complete_replay_with_same_task_id_conflicts() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let request = json!({
        "task_id": "task_004",
        "user_id": harness.test_user_id.to_string(),
        "duration_seconds": 60,
        "completed_at": Utc::now().to_rfc3339()
    });

    harness
        .server
        .post("/v1/generation/complete")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&request)
        .await
        .assert_status_ok();

    // Replayed callback must not double-charge
    let response = harness
        .server
        .post("/v1/generation/complete")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&request)
        .await;

    response.assert_status_conflict();

    let response = harness
        .server
        .get("/v1/points/balance")
        .add_header("authorization", harness.user_auth_header())
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_points"], 89);
}

#[tokio::test]
async fn complete_with_stale_timestamp_is_rejected() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let stale = Utc::now() - chrono::Duration::seconds(60);
    let response = harness
        .server
        .post("/v1/generation/complete")
        .add_header("x-api-key", harness.service_api_key.as_str())
        .json(&json!({
            "task_id": "task_005",
            "user_id": harness.test_user_id.to_string(),
            "duration_seconds": 60,
            "completed_at": stale.to_rfc3339()
        }))
        .await;

    response.assert_status_bad_request();
}

#[tokio::test]
async fn complete_without_api_key_fails() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let response = harness
        .server
        .post("/v1/generation/complete")
        .json(&json!({
            "task_id": "task_006",
            "user_id": harness.test_user_id.to_string(),
            "duration_seconds": 60,
            "completed_at": Utc::now().to_rfc3339()
        }))
        .await;

    response.assert_status_unauthorized();
}
