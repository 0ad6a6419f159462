//! Account bootstrap and lookup handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use castpoints_core::{Account, PointTransaction, ReasonCode};
use castpoints_store::{Store, StoreError};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Account response.
#[derive(Debug, Serialize)]
pub struct AccountResponse {
    /// User ID.
    pub user_id: String,
    /// Current points balance.
    pub total_points: i64,
    /// Created timestamp.
    pub created_at: String,
    /// Last mutation timestamp.
    pub updated_at: String,
}

impl From<&Account> for AccountResponse {
    fn from(account: &Account) -> Self {
        Self {
            user_id: account.user_id.to_string(),
            total_points: account.total_points,
            created_at: account.created_at.to_rfc3339(),
            updated_at: account.updated_at.to_rfc3339(),
        }
    }
}

/// Bootstrap response: the account, plus whether this call created it.
#[derive(Debug, Serialize)]
pub struct BootstrapResponse {
    /// The account (existing or freshly created).
    #[serde(flatten)]
    pub account: AccountResponse,
    /// True when this call created the account and granted the bonus.
    pub created: bool,
}

/// New-user bootstrap hook, called on first successful sign-in.
///
/// Creates the account and the one-time `initial_bonus` grant in one atomic
/// operation. Repeat calls (and concurrent first-login races) are benign
/// no-ops: the existing account is returned unchanged, with the storage
/// uniqueness check as the final arbiter.
pub async fn bootstrap_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<BootstrapResponse>, ApiError> {
    if let Some(existing) = state.store.get_account(&auth.user_id)? {
        return Ok(Json(BootstrapResponse {
            account: AccountResponse::from(&existing),
            created: false,
        }));
    }

    let bonus = state.config.policy.bootstrap_bonus_points;
    let account = Account::with_points(auth.user_id, bonus);
    let grant = PointTransaction::credit(
        auth.user_id,
        bonus,
        ReasonCode::InitialBonus,
        Some("New user bonus".into()),
    );

    match state.store.create_account_with_grant(&account, &grant) {
        Ok(balance) => {
            tracing::info!(
                user_id = %auth.user_id,
                bonus = %bonus,
                balance = %balance,
                "Account bootstrapped"
            );

            Ok(Json(BootstrapResponse {
                account: AccountResponse::from(&account),
                created: true,
            }))
        }
        // Lost a concurrent first-login race; the winner's account stands.
        Err(StoreError::AlreadyExists { .. }) => {
            let existing = state
                .store
                .get_account(&auth.user_id)?
                .ok_or_else(|| ApiError::Internal("account vanished after create race".into()))?;

            Ok(Json(BootstrapResponse {
                account: AccountResponse::from(&existing),
                created: false,
            }))
        }
        Err(e) => Err(e.into()),
    }
}

/// Get the current user's account.
pub async fn get_account(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<AccountResponse>, ApiError> {
    let account = state
        .store
        .get_account(&auth.user_id)?
        .ok_or_else(|| ApiError::NotFound("Account not found".into()))?;

    Ok(Json(AccountResponse::from(&account)))
}
