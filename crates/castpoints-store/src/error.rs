//! Error types for castpoints storage.

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in storage operations.
///
/// The ledger never retries internally; every failure is returned to the
/// caller, which decides user-facing behavior.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed.
    #[error("database error: {0}")]
    Database(String),

    /// Serialization/deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Operation referenced a user with no account row.
    #[error("account not found: {user_id}")]
    AccountNotFound {
        /// The user ID that was not found.
        user_id: String,
    },

    /// Account creation attempted for an existing user.
    #[error("account already exists: {user_id}")]
    AlreadyExists {
        /// The user ID that already exists.
        user_id: String,
    },

    /// Debit requested more points than available. The balance is unchanged.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// A referenced debit was already recorded (idempotency).
    #[error("duplicate reference: {reference}")]
    DuplicateReference {
        /// The external reference that was duplicated.
        reference: String,
    },

    /// A grant or deduction amount with the wrong sign or zero.
    #[error("invalid amount: {0}")]
    InvalidAmount(String),
}
