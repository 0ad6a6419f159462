//! Account bootstrap and lookup integration tests.

mod common;

use common::TestHarness;

// ============================================================================
// Bootstrap
// ============================================================================

#[tokio::test]
async fn bootstrap_creates_account_with_bonus() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], harness.test_user_id.to_string());
    assert_eq!(body["total_points"], 100);
    assert_eq!(body["created"], true);
}

#[tokio::test]
async fn bootstrap_grant_appears_in_transaction_log() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let response = harness
        .server
        .get("/v1/points/transactions")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let transactions = body["transactions"].as_array().unwrap();
    assert_eq!(transactions.len(), 1);
    assert_eq!(transactions[0]["reason"], "initial_bonus");
    assert_eq!(transactions[0]["points_change"], 100);
}

#[tokio::test]
async fn bootstrap_is_idempotent() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    // Second bootstrap returns the existing account without a second grant
    let response = harness
        .server
        .post("/v1/accounts")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["total_points"], 100);
    assert_eq!(body["created"], false);
}

#[tokio::test]
async fn bootstrap_without_auth_fails() {
    let harness = TestHarness::new();

    let response = harness.server.post("/v1/accounts").await;

    response.assert_status_unauthorized();
}

// ============================================================================
// Get Account
// ============================================================================

#[tokio::test]
async fn get_account_success() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["user_id"], harness.test_user_id.to_string());
    assert_eq!(body["total_points"], 100);
}

#[tokio::test]
async fn get_account_not_found() {
    let harness = TestHarness::new();

    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", harness.user_auth_header())
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn accounts_are_isolated_per_user() {
    let harness = TestHarness::new();
    harness.bootstrap_account().await;

    // A different user has no account
    let response = harness
        .server
        .get("/v1/accounts/me")
        .add_header("authorization", TestHarness::other_user_auth_header())
        .await;

    response.assert_status_not_found();
}
