//! `RocksDB` storage implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, DBWithThreadMode, IteratorMode, MultiThreaded,
    Options, WriteBatch,
};

use castpoints_core::{Account, PointTransaction, ReasonCode, TransactionId, UserId};
use chrono::{DateTime, Utc};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::schema::{all_column_families, cf};
use crate::Store;

/// RocksDB-backed storage implementation.
///
/// `WriteBatch` makes each compound mutation atomic, but the balance
/// check-then-write sequence spans a read and a write. A per-user lock
/// serializes those sequences so two concurrent debits cannot both pass the
/// check against a stale balance; operations on different users take
/// different locks and proceed independently.
pub struct RocksStore {
    db: Arc<DBWithThreadMode<MultiThreaded>>,
    user_locks: Mutex<HashMap<UserId, Arc<Mutex<()>>>>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = DBWithThreadMode::open_cf_descriptors(&opts, path, cf_descriptors)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        tracing::debug!("RocksDB store opened");

        Ok(Self {
            db: Arc::new(db),
            user_locks: Mutex::new(HashMap::new()),
        })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Get (or create) the mutation lock for one user's account.
    fn user_lock(&self, user_id: &UserId) -> Arc<Mutex<()>> {
        let mut locks = self
            .user_locks
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        Arc::clone(locks.entry(*user_id).or_default())
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Read an account without taking the user lock. Callers that mutate must
    /// hold the lock across this read and the subsequent write.
    fn read_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(user_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Stage a transaction row and its user-index entry into a batch.
    fn stage_transaction(&self, batch: &mut WriteBatch, tx: &PointTransaction) -> Result<()> {
        let cf_tx = self.cf(cf::TRANSACTIONS)?;
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;

        let tx_key = keys::transaction_key(&tx.id);
        let user_tx_key = keys::user_transaction_key(&tx.user_id, &tx.id);
        let value = Self::serialize(tx)?;

        batch.put_cf(&cf_tx, &tx_key, &value);
        batch.put_cf(&cf_by_user, &user_tx_key, []); // Index entry (empty value)

        Ok(())
    }

    /// Stage an account row into a batch.
    fn stage_account(&self, batch: &mut WriteBatch, account: &Account) -> Result<()> {
        let cf = self.cf(cf::ACCOUNTS)?;
        let key = keys::account_key(&account.user_id);
        let value = Self::serialize(account)?;
        batch.put_cf(&cf, &key, &value);
        Ok(())
    }

    /// Whether a debit reference was already consumed for this user.
    fn has_debit_ref(&self, user_id: &UserId, reference: &str) -> Result<bool> {
        let cf = self.cf(cf::DEBIT_REFS)?;
        let key = keys::debit_ref_key(user_id, reference);

        let exists = self
            .db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .is_some();

        Ok(exists)
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Account Operations
    // =========================================================================

    fn create_account(&self, account: &Account) -> Result<()> {
        let lock = self.user_lock(&account.user_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if self.read_account(&account.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                user_id: account.user_id.to_string(),
            });
        }

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, account)?;

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(())
    }

    fn create_account_with_grant(
        &self,
        account: &Account,
        grant: &PointTransaction,
    ) -> Result<i64> {
        if grant.points_change <= 0 {
            return Err(StoreError::InvalidAmount(format!(
                "bootstrap grant must be positive, got {}",
                grant.points_change
            )));
        }
        if grant.user_id != account.user_id || account.total_points != grant.points_change {
            return Err(StoreError::InvalidAmount(
                "bootstrap grant must match the account's initial balance".into(),
            ));
        }

        let lock = self.user_lock(&account.user_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if self.read_account(&account.user_id)?.is_some() {
            return Err(StoreError::AlreadyExists {
                user_id: account.user_id.to_string(),
            });
        }

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, account)?;
        self.stage_transaction(&mut batch, grant)?;

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(account.total_points)
    }

    fn get_account(&self, user_id: &UserId) -> Result<Option<Account>> {
        self.read_account(user_id)
    }

    // =========================================================================
    // Compound Ledger Operations
    // =========================================================================

    fn credit(&self, transaction: &PointTransaction) -> Result<i64> {
        if transaction.points_change <= 0 {
            return Err(StoreError::InvalidAmount(format!(
                "credit amount must be positive, got {}",
                transaction.points_change
            )));
        }

        let lock = self.user_lock(&transaction.user_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        let mut account =
            self.read_account(&transaction.user_id)?
                .ok_or_else(|| StoreError::AccountNotFound {
                    user_id: transaction.user_id.to_string(),
                })?;

        account.total_points += transaction.points_change;
        account.updated_at = Utc::now();

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, transaction)?;

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(account.total_points)
    }

    fn debit(&self, transaction: &PointTransaction, reference: Option<&str>) -> Result<i64> {
        if transaction.points_change >= 0 {
            return Err(StoreError::InvalidAmount(format!(
                "debit amount must be positive, got delta {}",
                transaction.points_change
            )));
        }
        let required = -transaction.points_change;

        let lock = self.user_lock(&transaction.user_id);
        let _guard = lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);

        if let Some(reference) = reference {
            if self.has_debit_ref(&transaction.user_id, reference)? {
                return Err(StoreError::DuplicateReference {
                    reference: reference.to_string(),
                });
            }
        }

        let mut account =
            self.read_account(&transaction.user_id)?
                .ok_or_else(|| StoreError::AccountNotFound {
                    user_id: transaction.user_id.to_string(),
                })?;

        if account.total_points < required {
            return Err(StoreError::InsufficientPoints {
                balance: account.total_points,
                required,
            });
        }

        account.total_points -= required;
        account.updated_at = Utc::now();

        let mut batch = WriteBatch::default();
        self.stage_account(&mut batch, &account)?;
        self.stage_transaction(&mut batch, transaction)?;

        if let Some(reference) = reference {
            let cf_refs = self.cf(cf::DEBIT_REFS)?;
            let ref_key = keys::debit_ref_key(&transaction.user_id, reference);
            batch.put_cf(&cf_refs, &ref_key, transaction.id.to_bytes());
        }

        self.db
            .write(batch)
            .map_err(|e| StoreError::Database(e.to_string()))?;

        Ok(account.total_points)
    }

    // =========================================================================
    // Query Operations
    // =========================================================================

    fn get_transaction(&self, transaction_id: &TransactionId) -> Result<Option<PointTransaction>> {
        let cf = self.cf(cf::TRANSACTIONS)?;
        let key = keys::transaction_key(transaction_id);

        self.db
            .get_cf(&cf, key)
            .map_err(|e| StoreError::Database(e.to_string()))?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn list_transactions(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<PointTransaction>> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        // Collect the user's index keys; ULIDs sort chronologically, so the
        // reversed key order is newest first.
        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&prefix, rocksdb::Direction::Forward),
        );

        let mut all_keys: Vec<Vec<u8>> = Vec::new();
        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            all_keys.push(key.to_vec());
        }

        all_keys.reverse();

        let mut transactions = Vec::new();
        for key in all_keys.into_iter().skip(offset) {
            if transactions.len() >= limit {
                break;
            }

            let tx_id = keys::extract_transaction_id_from_user_key(&key);
            if let Some(tx) = self.get_transaction(&tx_id)? {
                transactions.push(tx);
            }
        }

        Ok(transactions)
    }

    fn has_transaction_since(
        &self,
        user_id: &UserId,
        reason: ReasonCode,
        since: DateTime<Utc>,
    ) -> Result<bool> {
        let cf_by_user = self.cf(cf::TRANSACTIONS_BY_USER)?;
        let prefix = keys::user_transactions_prefix(user_id);

        // Seek straight to the first index key at or after `since` instead of
        // scanning the user's whole history.
        let since_ms = u64::try_from(since.timestamp_millis()).unwrap_or(0);
        let lower = keys::user_transaction_key(user_id, &TransactionId::lower_bound(since_ms));

        let iter = self.db.iterator_cf(
            &cf_by_user,
            IteratorMode::From(&lower, rocksdb::Direction::Forward),
        );

        for item in iter {
            let (key, _) = item.map_err(|e| StoreError::Database(e.to_string()))?;

            if !key.starts_with(&prefix) {
                break;
            }

            let tx_id = keys::extract_transaction_id_from_user_key(&key);
            if let Some(tx) = self.get_transaction(&tx_id)? {
                if tx.reason == reason && tx.created_at >= since {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    fn create_test_store() -> (RocksStore, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RocksStore::open(dir.path()).unwrap();
        (store, dir)
    }

    fn bootstrap(store: &RocksStore, points: i64) -> UserId {
        let user_id = UserId::generate();
        let account = Account::with_points(user_id, points);
        let grant =
            PointTransaction::credit(user_id, points, ReasonCode::InitialBonus, None);
        store.create_account_with_grant(&account, &grant).unwrap();
        user_id
    }

    #[test]
    fn create_account_then_duplicate_fails() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();
        let account = Account::new(user_id);

        store.create_account(&account).unwrap();
        assert!(store.account_exists(&user_id).unwrap());

        let result = store.create_account(&account);
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));
    }

    #[test]
    fn bootstrap_writes_account_and_audit_row() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.total_points, 100);

        let transactions = store.list_transactions(&user_id, 10, 0).unwrap();
        assert_eq!(transactions.len(), 1);
        assert_eq!(transactions[0].points_change, 100);
        assert_eq!(transactions[0].reason, ReasonCode::InitialBonus);
    }

    #[test]
    fn bootstrap_loser_gets_already_exists() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        let account = Account::with_points(user_id, 100);
        let grant = PointTransaction::credit(user_id, 100, ReasonCode::InitialBonus, None);
        let result = store.create_account_with_grant(&account, &grant);
        assert!(matches!(result, Err(StoreError::AlreadyExists { .. })));

        // The losing attempt left no extra rows.
        assert_eq!(store.list_transactions(&user_id, 10, 0).unwrap().len(), 1);
        assert_eq!(store.get_account(&user_id).unwrap().unwrap().total_points, 100);
    }

    #[test]
    fn missing_account_is_absent_not_zero() {
        let (store, _dir) = create_test_store();
        let user_id = UserId::generate();

        assert!(!store.account_exists(&user_id).unwrap());
        assert!(store.get_account(&user_id).unwrap().is_none());
    }

    #[test]
    fn credit_updates_balance_and_log() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        let tx = PointTransaction::credit(user_id, 5, ReasonCode::SignIn, None);
        let balance = store.credit(&tx).unwrap();
        assert_eq!(balance, 105);

        let account = store.get_account(&user_id).unwrap().unwrap();
        assert_eq!(account.total_points, 105);
        assert!(account.updated_at >= account.created_at);
    }

    #[test]
    fn credit_rejects_non_positive_amounts() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        let mut tx = PointTransaction::credit(user_id, 5, ReasonCode::SignIn, None);
        tx.points_change = 0;
        assert!(matches!(
            store.credit(&tx),
            Err(StoreError::InvalidAmount(_))
        ));

        tx.points_change = -5;
        assert!(matches!(
            store.credit(&tx),
            Err(StoreError::InvalidAmount(_))
        ));
    }

    #[test]
    fn credit_without_account_fails() {
        let (store, _dir) = create_test_store();
        let tx = PointTransaction::credit(UserId::generate(), 5, ReasonCode::SignIn, None);
        assert!(matches!(
            store.credit(&tx),
            Err(StoreError::AccountNotFound { .. })
        ));
    }

    #[test]
    fn debit_decrements_balance() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        let tx = PointTransaction::debit(
            user_id,
            10,
            ReasonCode::PodcastGeneration,
            Some("task-abc".into()),
        );
        let balance = store.debit(&tx, Some("task-abc")).unwrap();
        assert_eq!(balance, 90);

        let transactions = store.list_transactions(&user_id, 10, 0).unwrap();
        assert_eq!(transactions[0].points_change, -10);
    }

    #[test]
    fn debit_insufficient_leaves_balance_unchanged() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 5);

        let tx = PointTransaction::debit(user_id, 10, ReasonCode::PodcastGeneration, None);
        let result = store.debit(&tx, None);
        assert!(matches!(
            result,
            Err(StoreError::InsufficientPoints {
                balance: 5,
                required: 10
            })
        ));

        assert_eq!(store.get_account(&user_id).unwrap().unwrap().total_points, 5);
        // Only the bootstrap grant is in the log.
        assert_eq!(store.list_transactions(&user_id, 10, 0).unwrap().len(), 1);
    }

    #[test]
    fn debit_same_reference_twice_fails() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        let tx = PointTransaction::debit(
            user_id,
            10,
            ReasonCode::PodcastGeneration,
            Some("task-abc".into()),
        );
        store.debit(&tx, Some("task-abc")).unwrap();

        let replay = PointTransaction::debit(
            user_id,
            10,
            ReasonCode::PodcastGeneration,
            Some("task-abc".into()),
        );
        let result = store.debit(&replay, Some("task-abc"));
        assert!(matches!(
            result,
            Err(StoreError::DuplicateReference { .. })
        ));

        // Charged exactly once.
        assert_eq!(store.get_account(&user_id).unwrap().unwrap().total_points, 90);
    }

    #[test]
    fn balance_reconciles_with_log() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        store
            .credit(&PointTransaction::credit(user_id, 5, ReasonCode::SignIn, None))
            .unwrap();
        store
            .debit(
                &PointTransaction::debit(user_id, 30, ReasonCode::PodcastGeneration, None),
                None,
            )
            .unwrap();

        let account = store.get_account(&user_id).unwrap().unwrap();
        let log_sum: i64 = store
            .list_transactions(&user_id, 100, 0)
            .unwrap()
            .iter()
            .map(|tx| tx.points_change)
            .sum();
        assert_eq!(account.total_points, log_sum);
    }

    #[test]
    fn list_transactions_newest_first_with_pagination() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        std::thread::sleep(std::time::Duration::from_millis(2)); // Distinct ULID timestamps
        store
            .credit(&PointTransaction::credit(
                user_id,
                5,
                ReasonCode::SignIn,
                Some("day 1".into()),
            ))
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(2));
        store
            .credit(&PointTransaction::credit(
                user_id,
                5,
                ReasonCode::SignIn,
                Some("day 2".into()),
            ))
            .unwrap();

        let all = store.list_transactions(&user_id, 10, 0).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].description.as_deref(), Some("day 2"));
        assert_eq!(all[2].reason, ReasonCode::InitialBonus);

        let page1 = store.list_transactions(&user_id, 1, 0).unwrap();
        let page2 = store.list_transactions(&user_id, 1, 1).unwrap();
        assert_eq!(page1[0].description.as_deref(), Some("day 2"));
        assert_eq!(page2[0].description.as_deref(), Some("day 1"));

        // Repeated reads with no mutation are identical.
        let again = store.list_transactions(&user_id, 10, 0).unwrap();
        assert_eq!(again.len(), 3);
        assert_eq!(again[0].id, all[0].id);
    }

    #[test]
    fn has_transaction_since_respects_window_and_reason() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 100);

        let before_reward = Utc::now();
        assert!(!store
            .has_transaction_since(&user_id, ReasonCode::SignIn, before_reward)
            .unwrap());

        store
            .credit(&PointTransaction::credit(user_id, 5, ReasonCode::SignIn, None))
            .unwrap();

        assert!(store
            .has_transaction_since(&user_id, ReasonCode::SignIn, before_reward)
            .unwrap());

        // A window starting after the reward sees nothing.
        let tomorrow = Utc::now() + Duration::days(1);
        assert!(!store
            .has_transaction_since(&user_id, ReasonCode::SignIn, tomorrow)
            .unwrap());

        // Reason codes don't bleed into each other.
        assert!(!store
            .has_transaction_since(&user_id, ReasonCode::Adjustment, before_reward)
            .unwrap());
    }

    #[test]
    fn concurrent_debits_never_overdraw() {
        let (store, _dir) = create_test_store();
        let user_id = bootstrap(&store, 50);
        let store = Arc::new(store);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || {
                    let tx = PointTransaction::debit(
                        user_id,
                        10,
                        ReasonCode::PodcastGeneration,
                        None,
                    );
                    store.debit(&tx, None).is_ok()
                })
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();

        // floor(50 / 10) debits succeed, the rest fail with insufficiency.
        assert_eq!(successes, 5);
        assert_eq!(store.get_account(&user_id).unwrap().unwrap().total_points, 0);
    }
}
