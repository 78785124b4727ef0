/// In-process record store
///
/// Keeps users, accounts and ledger entries in ordered maps behind a
/// `tokio::sync::RwLock`. Ids are assigned sequentially from 1, and account
/// numbers and transaction ids are unique, matching the PostgreSQL schema.
///
/// Writes are counted so callers can assert that a rejected operation did not
/// touch the store.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::debug;

use super::RecordStore;
use crate::error::{StoreError, StoreResult};
use crate::models::account::{Account, AccountStatus, SaveAccount};
use crate::models::account_user::AccountUser;
use crate::models::transaction::{NewTransaction, Transaction};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i64, AccountUser>,
    accounts: BTreeMap<i64, Account>,
    transactions: BTreeMap<i64, Transaction>,
    next_user_id: i64,
    next_account_id: i64,
    next_transaction_id: i64,
}

impl Tables {
    fn allocate(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// Record store held entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    writes: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an account user with the next free id
    pub async fn insert_user(&self, name: &str) -> AccountUser {
        let mut tables = self.tables.write().await;
        let id = Tables::allocate(&mut tables.next_user_id);
        self.insert_user_locked(&mut tables, id, name)
    }

    /// Creates an account user with an explicit id
    ///
    /// Later ids continue after the highest one inserted.
    pub async fn insert_user_with_id(&self, id: i64, name: &str) -> AccountUser {
        let mut tables = self.tables.write().await;
        if id > tables.next_user_id {
            tables.next_user_id = id;
        }
        self.insert_user_locked(&mut tables, id, name)
    }

    fn insert_user_locked(&self, tables: &mut Tables, id: i64, name: &str) -> AccountUser {
        let now = Utc::now();
        let user = AccountUser {
            id,
            name: name.to_string(),
            created_at: now,
            updated_at: now,
        };
        tables.users.insert(id, user.clone());
        user
    }

    /// Number of account and transaction writes performed so far
    pub fn write_count(&self) -> u64 {
        self.writes.load(Ordering::SeqCst)
    }

    /// Snapshot of every ledger entry for an account, oldest first
    pub async fn transactions_for_account(&self, account_id: i64) -> Vec<Transaction> {
        let tables = self.tables.read().await;
        tables
            .transactions
            .values()
            .filter(|tx| tx.account_id == account_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<AccountUser>> {
        Ok(self.tables.read().await.users.get(&id).cloned())
    }

    async fn find_account_by_number(&self, account_number: &str) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .find(|a| a.account_number == account_number)
            .cloned())
    }

    async fn find_account_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        Ok(self.tables.read().await.accounts.get(&id).cloned())
    }

    async fn find_latest_account(&self) -> StoreResult<Option<Account>> {
        let tables = self.tables.read().await;
        Ok(tables.accounts.values().next_back().cloned())
    }

    async fn count_accounts_for_user(
        &self,
        account_user_id: i64,
        status: Option<AccountStatus>,
    ) -> StoreResult<i64> {
        let tables = self.tables.read().await;
        let count = tables
            .accounts
            .values()
            .filter(|a| a.account_user_id == account_user_id)
            .filter(|a| status.map_or(true, |s| a.account_status == s))
            .count();
        Ok(count as i64)
    }

    async fn list_accounts_for_user(&self, account_user_id: i64) -> StoreResult<Vec<Account>> {
        let tables = self.tables.read().await;
        Ok(tables
            .accounts
            .values()
            .filter(|a| a.account_user_id == account_user_id)
            .cloned()
            .collect())
    }

    async fn save_account(&self, account: SaveAccount) -> StoreResult<Account> {
        let mut tables = self.tables.write().await;
        let now = Utc::now();

        let saved = match account.id {
            None => {
                if !tables.users.contains_key(&account.account_user_id) {
                    return Err(StoreError::InvalidData(format!(
                        "account user {} does not exist",
                        account.account_user_id
                    )));
                }
                if tables
                    .accounts
                    .values()
                    .any(|a| a.account_number == account.account_number)
                {
                    return Err(StoreError::Conflict(
                        "accounts_account_number_key".to_string(),
                    ));
                }
                if account.balance < 0 {
                    return Err(StoreError::InvalidData("negative balance".to_string()));
                }

                let id = Tables::allocate(&mut tables.next_account_id);
                let created = Account {
                    id,
                    account_user_id: account.account_user_id,
                    account_number: account.account_number,
                    balance: account.balance,
                    account_status: account.account_status,
                    registered_at: account.registered_at,
                    unregistered_at: account.unregistered_at,
                    created_at: now,
                    updated_at: now,
                };
                debug!(account_id = id, account_number = %created.account_number, "Inserted account");
                tables.accounts.insert(id, created.clone());
                created
            }
            Some(id) => {
                if account.balance < 0 {
                    return Err(StoreError::InvalidData("negative balance".to_string()));
                }
                let existing = tables
                    .accounts
                    .get_mut(&id)
                    .ok_or_else(|| StoreError::InvalidData(format!("account {} vanished", id)))?;

                // Owner and number are immutable
                existing.balance = account.balance;
                existing.account_status = account.account_status;
                existing.unregistered_at = account.unregistered_at;
                existing.updated_at = now;
                debug!(account_id = id, "Updated account");
                existing.clone()
            }
        };

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(saved)
    }

    async fn save_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction> {
        let mut tables = self.tables.write().await;

        if !tables.accounts.contains_key(&transaction.account_id) {
            return Err(StoreError::InvalidData(format!(
                "account {} does not exist",
                transaction.account_id
            )));
        }
        if tables
            .transactions
            .values()
            .any(|tx| tx.transaction_id == transaction.transaction_id)
        {
            return Err(StoreError::Conflict(
                "transactions_transaction_id_key".to_string(),
            ));
        }
        if transaction.is_reversal()
            && tables
                .transactions
                .values()
                .any(|tx| tx.canceled_transaction_id == transaction.canceled_transaction_id)
        {
            return Err(StoreError::Conflict(
                "idx_transactions_canceled_transaction_id".to_string(),
            ));
        }

        let now = Utc::now();
        let id = Tables::allocate(&mut tables.next_transaction_id);
        let saved = Transaction {
            id,
            transaction_type: transaction.transaction_type,
            transaction_result_type: transaction.transaction_result_type,
            account_id: transaction.account_id,
            amount: transaction.amount,
            balance_snapshot: transaction.balance_snapshot,
            transaction_id: transaction.transaction_id,
            canceled_transaction_id: transaction.canceled_transaction_id,
            transacted_at: transaction.transacted_at,
            created_at: now,
            updated_at: now,
        };
        tables.transactions.insert(id, saved.clone());

        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(saved)
    }

    async fn find_transaction_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .find(|tx| tx.transaction_id == transaction_id)
            .cloned())
    }

    async fn find_cancel_of(&self, transaction_id: &str) -> StoreResult<Option<Transaction>> {
        let tables = self.tables.read().await;
        Ok(tables
            .transactions
            .values()
            .find(|tx| tx.canceled_transaction_id.as_deref() == Some(transaction_id))
            .cloned())
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::transaction::{TransactionResultType, TransactionType};

    #[tokio::test]
    async fn test_insert_user_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let first = store.insert_user("Pobi").await;
        let second = store.insert_user("Harry").await;
        assert_eq!(first.id, 1);
        assert_eq!(second.id, 2);

        let explicit = store.insert_user_with_id(12, "Crong").await;
        assert_eq!(explicit.id, 12);
        assert_eq!(store.insert_user("Honux").await.id, 13);
    }

    #[tokio::test]
    async fn test_save_account_insert_then_update() {
        let store = MemoryStore::new();
        let user = store.insert_user("Pobi").await;

        let created = store
            .save_account(SaveAccount::opening(user.id, "1000000000", 500))
            .await
            .unwrap();
        assert_eq!(created.id, 1);
        assert_eq!(store.write_count(), 1);

        let mut draft = SaveAccount::from(created.clone());
        draft.balance = 0;
        let updated = store.save_account(draft).await.unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.balance, 0);
        assert_eq!(store.write_count(), 2);
    }

    #[tokio::test]
    async fn test_duplicate_account_number_conflicts() {
        let store = MemoryStore::new();
        let user = store.insert_user("Pobi").await;
        store
            .save_account(SaveAccount::opening(user.id, "1000000000", 0))
            .await
            .unwrap();

        let err = store
            .save_account(SaveAccount::opening(user.id, "1000000000", 0))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_latest_account_and_counts() {
        let store = MemoryStore::new();
        let pobi = store.insert_user("Pobi").await;
        let harry = store.insert_user("Harry").await;
        assert!(store.find_latest_account().await.unwrap().is_none());

        store.save_account(SaveAccount::opening(pobi.id, "1000000000", 0)).await.unwrap();
        store.save_account(SaveAccount::opening(harry.id, "1000000001", 0)).await.unwrap();
        let mut closed = SaveAccount::opening(pobi.id, "1000000002", 0);
        closed.account_status = AccountStatus::Unregistered;
        store.save_account(closed).await.unwrap();

        let latest = store.find_latest_account().await.unwrap().unwrap();
        assert_eq!(latest.account_number, "1000000002");

        assert_eq!(store.count_accounts_for_user(pobi.id, None).await.unwrap(), 2);
        assert_eq!(
            store
                .count_accounts_for_user(pobi.id, Some(AccountStatus::InUse))
                .await
                .unwrap(),
            1
        );
        assert_eq!(store.list_accounts_for_user(harry.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_transaction_requires_account() {
        let store = MemoryStore::new();
        let tx = NewTransaction::now(TransactionType::Use, TransactionResultType::S, 99, 10, 0);
        assert!(store.save_transaction(tx).await.is_err());
        assert_eq!(store.write_count(), 0);
    }

    #[tokio::test]
    async fn test_entry_can_be_reversed_once() {
        let store = MemoryStore::new();
        let pobi = store.insert_user("Pobi").await;
        let account = store
            .save_account(SaveAccount::opening(pobi.id, "1000000000", 900))
            .await
            .unwrap();
        let used = store
            .save_transaction(NewTransaction::now(
                TransactionType::Use,
                TransactionResultType::S,
                account.id,
                100,
                900,
            ))
            .await
            .unwrap();
        assert!(store.find_cancel_of(&used.transaction_id).await.unwrap().is_none());

        let reversal = || {
            NewTransaction::now(TransactionType::Cancel, TransactionResultType::S, account.id, 100, 1000)
                .reversing(used.transaction_id.clone())
        };
        let cancel = store.save_transaction(reversal()).await.unwrap();
        let found = store.find_cancel_of(&used.transaction_id).await.unwrap().unwrap();
        assert_eq!(found.transaction_id, cancel.transaction_id);

        let writes = store.write_count();
        assert!(matches!(
            store.save_transaction(reversal()).await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.write_count(), writes);
    }
}
