//! Client error types.

/// Errors that can occur when using the castpoints client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Server returned an error response.
    #[error("API error: {code} - {message}")]
    Api {
        /// Error code.
        code: String,
        /// Error message.
        message: String,
        /// HTTP status code.
        status: u16,
    },

    /// Insufficient points to cover the debit.
    #[error("insufficient points: balance={balance}, required={required}")]
    InsufficientPoints {
        /// Current balance.
        balance: i64,
        /// Required amount.
        required: i64,
    },

    /// Duplicate task (already debited).
    #[error("duplicate task: {task_id}")]
    DuplicateTask {
        /// The task ID.
        task_id: String,
    },

    /// Account not found.
    #[error("account not found: {message}")]
    AccountNotFound {
        /// The server's error message.
        message: String,
    },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
