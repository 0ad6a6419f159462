//! Podcast-generation usage gate and completion callback handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use castpoints_core::{PointTransaction, ReasonCode};
use castpoints_store::Store;

use crate::auth::ServiceAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Usage gate pre-check request.
#[derive(Debug, Deserialize)]
pub struct GenerationCheckRequest {
    /// User requesting the generation.
    pub user_id: String,
    /// Estimated audio duration in seconds (0 if unknown; base cost only).
    #[serde(default)]
    pub estimated_duration_seconds: u64,
}

/// Usage gate pre-check response.
#[derive(Debug, Serialize)]
pub struct GenerationCheckResponse {
    /// Whether the user's balance covers the estimated cost.
    pub allowed: bool,
    /// Current balance.
    pub total_points: i64,
    /// Estimated cost of the generation.
    pub required: i64,
}

/// Check whether a user can afford a generation. No debit occurs.
///
/// The actual debit happens on the completion callback; between the check and
/// the callback the balance can change, which is why the callback re-checks
/// sufficiency inside the debit's atomic scope.
pub async fn check_generation(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<GenerationCheckRequest>,
) -> Result<Json<GenerationCheckResponse>, ApiError> {
    let user_id = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    let required = state
        .config
        .policy
        .generation_cost(body.estimated_duration_seconds);

    let account = state
        .store
        .get_account(&user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let allowed = account.has_sufficient_points(required);

    tracing::debug!(
        service = %auth.service_name,
        user_id = %user_id,
        balance = %account.total_points,
        required = %required,
        allowed = %allowed,
        "Generation pre-check"
    );

    Ok(Json(GenerationCheckResponse {
        allowed,
        total_points: account.total_points,
        required,
    }))
}

/// Completion callback request from the generation service.
#[derive(Debug, Deserialize)]
pub struct GenerationCompleteRequest {
    /// Unique task identifier; doubles as the debit idempotency reference.
    pub task_id: String,
    /// User to charge.
    pub user_id: String,
    /// Duration of the generated audio in seconds.
    pub duration_seconds: u64,
    /// When the generation completed, per the generation service's clock.
    pub completed_at: DateTime<Utc>,
}

/// Completion callback response.
#[derive(Debug, Serialize)]
pub struct GenerationCompleteResponse {
    /// Points deducted for this generation.
    pub cost: i64,
    /// Balance after the deduction.
    pub total_points: i64,
    /// The audit transaction ID.
    pub transaction_id: String,
}

/// Debit the cost of a completed generation.
///
/// The `task_id` is recorded as a debit reference in the same atomic scope as
/// the balance mutation, so a replayed callback fails as 409 instead of
/// double-charging. The timestamp freshness check narrows the replay window
/// further but is secondary to the reference check.
pub async fn complete_generation(
    State(state): State<Arc<AppState>>,
    auth: ServiceAuth,
    Json(body): Json<GenerationCompleteRequest>,
) -> Result<Json<GenerationCompleteResponse>, ApiError> {
    let user_id = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    if body.task_id.is_empty() {
        return Err(ApiError::BadRequest("task_id must not be empty".into()));
    }

    let skew = (Utc::now() - body.completed_at).num_seconds().abs();
    if skew > state.config.callback_tolerance_seconds {
        tracing::warn!(
            service = %auth.service_name,
            task_id = %body.task_id,
            skew_seconds = %skew,
            "Rejected stale completion callback"
        );
        return Err(ApiError::BadRequest(format!(
            "completed_at deviates from server time by {skew}s (tolerance {}s)",
            state.config.callback_tolerance_seconds
        )));
    }

    let cost = state.config.policy.generation_cost(body.duration_seconds);

    let tx = PointTransaction::debit(
        user_id,
        cost,
        ReasonCode::PodcastGeneration,
        Some(format!("Podcast generation {}", body.task_id)),
    );

    let balance = state.store.debit(&tx, Some(&body.task_id))?;

    tracing::info!(
        service = %auth.service_name,
        task_id = %body.task_id,
        user_id = %user_id,
        cost = %cost,
        new_balance = %balance,
        "Generation debited"
    );

    Ok(Json(GenerationCompleteResponse {
        cost,
        total_points: balance,
        transaction_id: tx.id.to_string(),
    }))
}
