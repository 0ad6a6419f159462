//! Account types for the castpoints ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// The materialized current points balance for one user.
///
/// The account is the fast-read cache of the transaction log's running sum.
/// It is mutated exclusively through the store's credit/debit operations,
/// which update it in the same atomic batch as the transaction row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// The user ID (from the OAuth identity provider).
    pub user_id: UserId,

    /// Current points balance. Never negative.
    pub total_points: i64,

    /// When the account was created.
    pub created_at: DateTime<Utc>,

    /// When the account was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// Create a new account with zero points.
    #[must_use]
    pub fn new(user_id: UserId) -> Self {
        Self::with_points(user_id, 0)
    }

    /// Create a new account with an initial balance.
    ///
    /// Used by the bootstrap flow, where the initial grant transaction is
    /// written in the same batch as the account row.
    #[must_use]
    pub fn with_points(user_id: UserId, total_points: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            total_points,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check whether the account can cover a deduction.
    #[must_use]
    pub const fn has_sufficient_points(&self, amount: i64) -> bool {
        self.total_points >= amount
    }
}
