//! Database schema definitions and column families.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Current balance records, keyed by `user_id`.
    pub const ACCOUNTS: &str = "accounts";

    /// Point transactions, keyed by `transaction_id` (ULID).
    pub const TRANSACTIONS: &str = "transactions";

    /// Index: transactions by user, keyed by `user_id || transaction_id`.
    /// Value is empty (index only).
    pub const TRANSACTIONS_BY_USER: &str = "transactions_by_user";

    /// External debit references for idempotency, keyed by
    /// `user_id || reference`. Value is the transaction ID that consumed the
    /// reference.
    pub const DEBIT_REFS: &str = "debit_refs";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::ACCOUNTS,
        cf::TRANSACTIONS,
        cf::TRANSACTIONS_BY_USER,
        cf::DEBIT_REFS,
    ]
}
