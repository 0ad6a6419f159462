//! Points balance, history, daily sign-in and grant handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use castpoints_core::{PointTransaction, ReasonCode};
use castpoints_store::Store;

use crate::auth::{AdminAuth, AuthUser};
use crate::error::ApiError;
use crate::state::AppState;

/// Balance response.
#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    /// Current points balance.
    pub total_points: i64,
}

/// Get current points balance.
///
/// Answers 404 for users that were never onboarded; callers may render that
/// as zero, but absent and zero are distinct states.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BalanceResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(BalanceResponse {
        total_points: account.total_points,
    }))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// 1-based page number (default: 1).
    #[serde(default = "default_page")]
    pub page: usize,
    /// Page size (default: 50, max: 100).
    #[serde(default = "default_page_size")]
    pub page_size: usize,
}

fn default_page() -> usize {
    1
}

fn default_page_size() -> usize {
    50
}

/// Transaction response.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Transaction ID.
    pub id: String,
    /// Signed delta (positive = credit, negative = debit).
    pub points_change: i64,
    /// Reason code.
    pub reason: ReasonCode,
    /// Description.
    pub description: Option<String>,
    /// Timestamp.
    pub created_at: String,
}

impl From<&PointTransaction> for TransactionResponse {
    fn from(tx: &PointTransaction) -> Self {
        Self {
            id: tx.id.to_string(),
            points_change: tx.points_change,
            reason: tx.reason,
            description: tx.description.clone(),
            created_at: tx.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Transactions (newest first).
    pub transactions: Vec<TransactionResponse>,
    /// The page that was returned.
    pub page: usize,
    /// Whether there are more transactions past this page.
    pub has_more: bool,
}

/// List transaction history, newest first.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Verify account exists
    state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    let page = query.page.max(1);
    let page_size = query.page_size.clamp(1, 100);
    let offset = (page - 1) * page_size;

    // Fetch one more than requested to determine has_more
    let transactions = state
        .store
        .list_transactions(&auth.user_id, page_size + 1, offset)?;

    let has_more = transactions.len() > page_size;
    let transactions: Vec<_> = transactions
        .iter()
        .take(page_size)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        page,
        has_more,
    }))
}

/// Daily sign-in response.
#[derive(Debug, Serialize)]
pub struct DailySignInResponse {
    /// Points granted by this call.
    pub granted: i64,
    /// Balance after the grant.
    pub total_points: i64,
}

/// Claim the once-per-day sign-in reward.
///
/// The gate is the transaction log itself: any `sign_in` transaction since
/// UTC midnight means the reward was already claimed today, answered as 409.
pub async fn daily_sign_in(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<DailySignInResponse>, ApiError> {
    let midnight = Utc::now()
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ApiError::Internal("invalid midnight construction".into()))?
        .and_utc();

    if state
        .store
        .has_transaction_since(&auth.user_id, ReasonCode::SignIn, midnight)?
    {
        return Err(ApiError::Conflict(
            "Daily sign-in reward already claimed today".into(),
        ));
    }

    let amount = state.config.policy.daily_sign_in_points;
    let tx = PointTransaction::credit(
        auth.user_id,
        amount,
        ReasonCode::SignIn,
        Some("Daily sign-in reward".into()),
    );

    let balance = state.store.credit(&tx)?;

    tracing::info!(
        user_id = %auth.user_id,
        granted = %amount,
        balance = %balance,
        "Daily sign-in reward granted"
    );

    Ok(Json(DailySignInResponse {
        granted: amount,
        total_points: balance,
    }))
}

/// Admin grant request.
#[derive(Debug, Deserialize)]
pub struct GrantPointsRequest {
    /// User ID to grant points to.
    pub user_id: String,
    /// Amount of points (must be positive).
    pub amount: i64,
    /// Reason for the grant.
    pub reason: String,
}

/// Admin grant response.
#[derive(Debug, Serialize)]
pub struct GrantPointsResponse {
    /// Balance after the grant.
    pub total_points: i64,
    /// The audit transaction ID.
    pub transaction_id: String,
}

/// Admin endpoint to grant points manually.
pub async fn grant_points(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<GrantPointsRequest>,
) -> Result<Json<GrantPointsResponse>, ApiError> {
    let user_id = body
        .user_id
        .parse()
        .map_err(|_| ApiError::BadRequest("Invalid user ID".into()))?;

    if body.amount <= 0 {
        return Err(ApiError::BadRequest("Amount must be positive".into()));
    }

    let tx = PointTransaction::credit(
        user_id,
        body.amount,
        ReasonCode::Adjustment,
        Some(body.reason.clone()),
    );

    let balance = state.store.credit(&tx)?;

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %user_id,
        amount = %body.amount,
        reason = %body.reason,
        new_balance = %balance,
        "Points granted"
    );

    Ok(Json(GrantPointsResponse {
        total_points: balance,
        transaction_id: tx.id.to_string(),
    }))
}
