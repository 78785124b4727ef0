/// Transaction ledger model and database operations
///
/// The ledger is append-only: rows are inserted and read, never updated or
/// deleted. Every row records the account balance right after it was
/// applied (`balance_snapshot`). Failed attempts are recorded too, with the
/// unchanged balance. A successful `CANCEL` names the `USE` entry it
/// reverses in `canceled_transaction_id`, which is unique.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE transaction_type AS ENUM ('USE', 'CANCEL');
/// CREATE TYPE transaction_result_type AS ENUM ('S', 'F');
///
/// CREATE TABLE transactions (
///     id BIGSERIAL PRIMARY KEY,
///     transaction_type transaction_type NOT NULL,
///     transaction_result_type transaction_result_type NOT NULL,
///     account_id BIGINT NOT NULL REFERENCES accounts(id),
///     amount BIGINT NOT NULL,
///     balance_snapshot BIGINT NOT NULL,
///     transaction_id VARCHAR(64) NOT NULL UNIQUE,
///     canceled_transaction_id VARCHAR(64) UNIQUE REFERENCES transactions(transaction_id),
///     transacted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

const TRANSACTION_COLUMNS: &str = "id, transaction_type, transaction_result_type, account_id, \
     amount, balance_snapshot, transaction_id, canceled_transaction_id, transacted_at, \
     created_at, updated_at";

/// Kind of balance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    Use,
    Cancel,
}

/// Outcome of a balance operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "transaction_result_type")]
pub enum TransactionResultType {
    /// Success
    S,

    /// Failure
    F,
}

/// A ledger entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Transaction {
    pub id: i64,
    pub transaction_type: TransactionType,
    pub transaction_result_type: TransactionResultType,

    /// Account this entry belongs to
    pub account_id: i64,

    pub amount: i64,

    /// Account balance immediately after this entry
    pub balance_snapshot: i64,

    /// Externally visible identifier
    pub transaction_id: String,

    /// For a successful cancel, the `USE` entry it reversed
    pub canceled_transaction_id: Option<String>,

    pub transacted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for appending a ledger entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTransaction {
    pub transaction_type: TransactionType,
    pub transaction_result_type: TransactionResultType,
    pub account_id: i64,
    pub amount: i64,
    pub balance_snapshot: i64,
    pub transaction_id: String,
    pub canceled_transaction_id: Option<String>,
    pub transacted_at: DateTime<Utc>,
}

impl NewTransaction {
    /// Builds an entry transacted now with a fresh transaction id
    pub fn now(
        transaction_type: TransactionType,
        transaction_result_type: TransactionResultType,
        account_id: i64,
        amount: i64,
        balance_snapshot: i64,
    ) -> Self {
        Self {
            transaction_type,
            transaction_result_type,
            account_id,
            amount,
            balance_snapshot,
            transaction_id: generate_transaction_id(),
            canceled_transaction_id: None,
            transacted_at: Utc::now(),
        }
    }

    /// Marks this entry as the reversal of `transaction_id`
    pub fn reversing(mut self, transaction_id: impl Into<String>) -> Self {
        self.canceled_transaction_id = Some(transaction_id.into());
        self
    }

    /// Whether this entry reverses another
    pub fn is_reversal(&self) -> bool {
        self.canceled_transaction_id.is_some()
    }
}

/// Generates an external transaction id (32 lowercase hex chars)
pub fn generate_transaction_id() -> String {
    Uuid::new_v4().simple().to_string()
}

impl Transaction {
    /// Appends a ledger entry
    pub async fn insert(pool: &PgPool, data: &NewTransaction) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO transactions (transaction_type, transaction_result_type, account_id,
                                      amount, balance_snapshot, transaction_id,
                                      canceled_transaction_id, transacted_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {TRANSACTION_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Transaction>(&query)
            .bind(data.transaction_type)
            .bind(data.transaction_result_type)
            .bind(data.account_id)
            .bind(data.amount)
            .bind(data.balance_snapshot)
            .bind(&data.transaction_id)
            .bind(&data.canceled_transaction_id)
            .bind(data.transacted_at)
            .fetch_one(pool)
            .await
    }

    /// Finds an entry by its external transaction id
    pub async fn find_by_transaction_id(
        pool: &PgPool,
        transaction_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE transaction_id = $1");

        sqlx::query_as::<_, Transaction>(&query)
            .bind(transaction_id)
            .fetch_optional(pool)
            .await
    }

    /// Finds the successful cancel that reversed `transaction_id`, if any
    pub async fn find_cancel_of(
        pool: &PgPool,
        transaction_id: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions WHERE canceled_transaction_id = $1"
        );

        sqlx::query_as::<_, Transaction>(&query)
            .bind(transaction_id)
            .fetch_optional(pool)
            .await
    }

    /// Whether this entry is a successful `USE`, the only kind a cancel may reverse
    pub fn is_cancelable(&self) -> bool {
        self.transaction_type == TransactionType::Use
            && self.transaction_result_type == TransactionResultType::S
    }
}
