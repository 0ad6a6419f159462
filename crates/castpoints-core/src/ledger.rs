//! Point transaction types for the castpoints ledger.
//!
//! Every balance change appends one immutable `PointTransaction` row with a
//! signed delta and a reason code.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{TransactionId, UserId};

/// An immutable, signed point-change record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointTransaction {
    /// Unique transaction ID (ULID for time-ordering).
    pub id: TransactionId,

    /// The user whose balance was affected.
    pub user_id: UserId,

    /// Signed delta. Positive = credit, negative = debit.
    pub points_change: i64,

    /// Why this transaction occurred.
    pub reason: ReasonCode,

    /// Human-readable free text. May embed a task reference.
    pub description: Option<String>,

    /// When the transaction was created. Used both for ordering and for
    /// "already rewarded today" checks.
    pub created_at: DateTime<Utc>,
}

impl PointTransaction {
    /// Create a credit transaction (positive delta).
    #[must_use]
    pub fn credit(
        user_id: UserId,
        amount: i64,
        reason: ReasonCode,
        description: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            points_change: amount.abs(),
            reason,
            description,
            created_at: Utc::now(),
        }
    }

    /// Create a debit transaction (negative delta).
    #[must_use]
    pub fn debit(
        user_id: UserId,
        amount: i64,
        reason: ReasonCode,
        description: Option<String>,
    ) -> Self {
        Self {
            id: TransactionId::generate(),
            user_id,
            points_change: -amount.abs(),
            reason,
            description,
            created_at: Utc::now(),
        }
    }

    /// Whether this transaction added points.
    #[must_use]
    pub const fn is_credit(&self) -> bool {
        self.points_change > 0
    }
}

/// A short symbolic tag classifying why a transaction occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReasonCode {
    /// One-time new-user bootstrap grant.
    InitialBonus,

    /// Daily sign-in reward.
    SignIn,

    /// Points spent on a completed podcast generation.
    PodcastGeneration,

    /// Manual admin adjustment.
    Adjustment,
}

impl ReasonCode {
    /// The wire/storage tag for this reason.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::InitialBonus => "initial_bonus",
            Self::SignIn => "sign_in",
            Self::PodcastGeneration => "podcast_generation",
            Self::Adjustment => "adjustment",
        }
    }
}

impl std::fmt::Display for ReasonCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
