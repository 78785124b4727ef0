/// PostgreSQL-backed record store

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::debug;

use super::RecordStore;
use crate::db::pool;
use crate::error::{StoreError, StoreResult};
use crate::models::account::{Account, AccountStatus, SaveAccount};
use crate::models::account_user::AccountUser;
use crate::models::transaction::{NewTransaction, Transaction};

/// Record store over a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Maps unique-constraint violations to `StoreError::Conflict`
fn map_write_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            let constraint = db_err.constraint().unwrap_or("unique").to_string();
            return StoreError::Conflict(constraint);
        }
    }
    StoreError::Database(err)
}

#[async_trait]
impl RecordStore for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn find_user_by_id(&self, id: i64) -> StoreResult<Option<AccountUser>> {
        Ok(AccountUser::find_by_id(&self.pool, id).await?)
    }

    async fn find_account_by_number(&self, account_number: &str) -> StoreResult<Option<Account>> {
        Ok(Account::find_by_number(&self.pool, account_number).await?)
    }

    async fn find_account_by_id(&self, id: i64) -> StoreResult<Option<Account>> {
        Ok(Account::find_by_id(&self.pool, id).await?)
    }

    async fn find_latest_account(&self) -> StoreResult<Option<Account>> {
        Ok(Account::find_latest(&self.pool).await?)
    }

    async fn count_accounts_for_user(
        &self,
        account_user_id: i64,
        status: Option<AccountStatus>,
    ) -> StoreResult<i64> {
        Ok(Account::count_by_user(&self.pool, account_user_id, status).await?)
    }

    async fn list_accounts_for_user(&self, account_user_id: i64) -> StoreResult<Vec<Account>> {
        Ok(Account::list_by_user(&self.pool, account_user_id).await?)
    }

    async fn save_account(&self, account: SaveAccount) -> StoreResult<Account> {
        match account.id {
            None => {
                debug!(account_number = %account.account_number, "Inserting account");
                Account::insert(&self.pool, &account)
                    .await
                    .map_err(map_write_error)
            }
            Some(id) => {
                debug!(account_id = id, "Updating account");
                Account::update(&self.pool, id, &account)
                    .await
                    .map_err(map_write_error)?
                    .ok_or_else(|| StoreError::InvalidData(format!("account {} vanished", id)))
            }
        }
    }

    async fn save_transaction(&self, transaction: NewTransaction) -> StoreResult<Transaction> {
        Transaction::insert(&self.pool, &transaction)
            .await
            .map_err(map_write_error)
    }

    async fn find_transaction_by_transaction_id(
        &self,
        transaction_id: &str,
    ) -> StoreResult<Option<Transaction>> {
        Ok(Transaction::find_by_transaction_id(&self.pool, transaction_id).await?)
    }

    async fn find_cancel_of(&self, transaction_id: &str) -> StoreResult<Option<Transaction>> {
        Ok(Transaction::find_cancel_of(&self.pool, transaction_id).await?)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(pool::health_check(&self.pool).await?)
    }
}
