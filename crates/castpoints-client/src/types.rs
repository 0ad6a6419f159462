//! Request and response types for the castpoints client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Gate pre-check request.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationCheckRequest {
    /// User ID to check.
    pub user_id: String,
    /// Estimated audio duration in seconds.
    pub estimated_duration_seconds: u64,
}

/// Gate pre-check response.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationCheckResponse {
    /// Whether the user's balance covers the estimated cost.
    pub allowed: bool,
    /// Current balance.
    pub total_points: i64,
    /// Estimated cost.
    pub required: i64,
}

/// A completed generation to report for debiting.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationCompletion {
    /// Unique task ID; the service uses it as the debit idempotency key.
    pub task_id: String,
    /// User ID being charged.
    pub user_id: String,
    /// Duration of the generated audio in seconds.
    pub duration_seconds: u64,
    /// When the generation completed.
    pub completed_at: DateTime<Utc>,
}

/// Completion response from the API.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationChargeResponse {
    /// Points deducted.
    pub cost: i64,
    /// Balance after the deduction.
    pub total_points: i64,
    /// Transaction ID.
    pub transaction_id: String,
}

/// Balance response.
#[derive(Debug, Clone, Deserialize)]
pub struct BalanceResponse {
    /// Current points balance.
    pub total_points: i64,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}
