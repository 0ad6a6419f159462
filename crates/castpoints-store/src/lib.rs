//! `RocksDB` storage layer for the castpoints ledger.
//!
//! This crate persists accounts and the append-only transaction log using
//! `RocksDB` with column families for efficient indexing, and owns the
//! atomicity of every compound ledger operation.
//!
//! # Architecture
//!
//! Column families:
//!
//! - `accounts`: Current balance records, keyed by `user_id`
//! - `transactions`: Point transactions, keyed by `transaction_id` (ULID)
//! - `transactions_by_user`: Index for listing transactions by user
//! - `debit_refs`: External debit references for idempotency, keyed by
//!   `user_id || reference`
//!
//! Compound operations (credit, debit, bootstrap-with-grant) write the
//! transaction row and the balance update in one `WriteBatch`, and the
//! check-then-write sequence for a user is serialized by a per-user lock, so
//! the balance can never go negative and never diverges from the log's
//! running sum.
//!
//! # Example
//!
//! ```no_run
//! use castpoints_store::{RocksStore, Store};
//! use castpoints_core::{Account, PointTransaction, ReasonCode, UserId};
//!
//! let store = RocksStore::open("/tmp/castpoints-db").unwrap();
//!
//! let user_id = UserId::generate();
//! let account = Account::with_points(user_id, 100);
//! let grant = PointTransaction::credit(user_id, 100, ReasonCode::InitialBonus, None);
//! store.create_account_with_grant(&account, &grant).unwrap();
//!
//! let balance = store.get_account(&user_id).unwrap().map(|a| a.total_points);
//! assert_eq!(balance, Some(100));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use rocks::RocksStore;

use castpoints_core::{Account, PointTransaction, ReasonCode, TransactionId, UserId};
use chrono::{DateTime, Utc};

/// The storage trait defining all ledger operations.
///
/// This trait abstracts the storage layer, allowing for different
/// implementations. All compound operations are atomic: either both the
/// transaction row and the balance update land, or neither does.
pub trait Store: Send + Sync {
    // =========================================================================
    // Account Operations
    // =========================================================================

    /// Insert a new account record.
    ///
    /// No transaction log entry is written; callers that want an audited
    /// creation use [`Store::create_account_with_grant`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if an account exists for the user.
    fn create_account(&self, account: &Account) -> Result<()>;

    /// Atomically insert a new account together with its initial grant
    /// transaction.
    ///
    /// This is the bootstrap operation for new users: the account row and the
    /// `initial_bonus` audit row land in one batch, so the log reconciles
    /// with the balance from the first row on. Returns the resulting balance.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::AlreadyExists` if an account exists for the user;
    /// the storage uniqueness check is the final arbiter of concurrent
    /// first-login races.
    fn create_account_with_grant(
        &self,
        account: &Account,
        grant: &PointTransaction,
    ) -> Result<i64>;

    /// Get an account by user ID.
    ///
    /// `None` means the user was never onboarded, which is distinct from a
    /// zero balance.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>>;

    /// Read-only existence check.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn account_exists(&self, user_id: &UserId) -> Result<bool> {
        Ok(self.get_account(user_id)?.is_some())
    }

    // =========================================================================
    // Compound Ledger Operations
    // =========================================================================

    /// Grant points: insert the transaction row and add its delta to the
    /// balance atomically. Returns the new balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::AccountNotFound` if the account doesn't exist.
    /// - `StoreError::InvalidAmount` if the transaction delta is not
    ///   positive. A negative "credit" is a debit in disguise and is
    ///   rejected rather than silently accepted.
    fn credit(&self, transaction: &PointTransaction) -> Result<i64>;

    /// Spend points: check sufficiency, insert the transaction row and
    /// subtract its delta from the balance atomically. Returns the new
    /// balance.
    ///
    /// When `reference` is given (e.g. a generation task ID), a uniqueness
    /// record for `(user, reference)` is written in the same batch; a second
    /// debit with the same reference fails without touching the balance.
    ///
    /// # Errors
    ///
    /// - `StoreError::AccountNotFound` if the account doesn't exist.
    /// - `StoreError::InsufficientPoints` if the balance cannot cover the
    ///   amount; the balance is left unchanged.
    /// - `StoreError::DuplicateReference` if the reference was already
    ///   debited.
    /// - `StoreError::InvalidAmount` if the transaction delta is not
    ///   negative.
    fn debit(&self, transaction: &PointTransaction, reference: Option<&str>) -> Result<i64>;

    // =========================================================================
    // Query Operations
    // =========================================================================

    /// Get a transaction by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<PointTransaction>>;

    /// List transactions for a user, newest first.
    ///
    /// Each call is independent; there is no cursor state.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PointTransaction>>;

    /// Whether the user has any transaction with the given reason at or after
    /// `since`.
    ///
    /// Backs the once-per-day reward gate: the caller computes the start of
    /// the local day and asks for `sign_in` transactions since then.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_transaction_since(
        &self,
        user_id: &UserId,
        reason: ReasonCode,
        since: DateTime<Utc>,
    ) -> Result<bool>;
}
