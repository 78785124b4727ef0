/// Account model and database operations
///
/// # State Machine
///
/// ```text
/// IN_USE → UNREGISTERED   (only with a zero balance, never reversed)
/// ```
///
/// # Schema
///
/// ```sql
/// CREATE TYPE account_status AS ENUM ('IN_USE', 'UNREGISTERED');
///
/// CREATE TABLE accounts (
///     id BIGSERIAL PRIMARY KEY,
///     account_user_id BIGINT NOT NULL REFERENCES account_users(id),
///     account_number VARCHAR(32) NOT NULL UNIQUE,
///     balance BIGINT NOT NULL DEFAULT 0 CHECK (balance >= 0),
///     account_status account_status NOT NULL DEFAULT 'IN_USE',
///     registered_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     unregistered_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use bank_shared::models::account::{Account, SaveAccount};
/// use bank_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///
/// let account = Account::insert(&pool, &SaveAccount::opening(12, "1000000000", 1000)).await?;
/// let found = Account::find_by_number(&pool, &account.account_number).await?;
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

const ACCOUNT_COLUMNS: &str = "id, account_user_id, account_number, balance, account_status, \
     registered_at, unregistered_at, created_at, updated_at";

/// Account status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "account_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountStatus {
    /// Open and usable
    InUse,

    /// Closed. Terminal.
    Unregistered,
}

impl AccountStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountStatus::InUse => "IN_USE",
            AccountStatus::Unregistered => "UNREGISTERED",
        }
    }

    /// Checks if transition to target status is valid
    pub fn can_transition_to(&self, target: AccountStatus) -> bool {
        matches!(
            (self, target),
            (AccountStatus::InUse, AccountStatus::Unregistered)
        )
    }
}

/// A bank account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    /// Store-assigned id
    pub id: i64,

    /// Owner. Immutable after creation.
    pub account_user_id: i64,

    /// Globally unique, sequentially generated number
    pub account_number: String,

    /// Current balance, never negative
    pub balance: i64,

    pub account_status: AccountStatus,

    pub registered_at: DateTime<Utc>,

    /// Set when the account is unregistered
    pub unregistered_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn is_unregistered(&self) -> bool {
        self.account_status == AccountStatus::Unregistered
    }

    pub fn is_owned_by(&self, account_user_id: i64) -> bool {
        self.account_user_id == account_user_id
    }
}

/// Input for persisting an account
///
/// `id: None` inserts a new row and lets the store assign id and timestamps.
/// `id: Some(_)` updates the existing row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveAccount {
    pub id: Option<i64>,
    pub account_user_id: i64,
    pub account_number: String,
    pub balance: i64,
    pub account_status: AccountStatus,
    pub registered_at: DateTime<Utc>,
    pub unregistered_at: Option<DateTime<Utc>>,
}

impl SaveAccount {
    /// A brand new `IN_USE` account registered now
    pub fn opening(account_user_id: i64, account_number: impl Into<String>, balance: i64) -> Self {
        Self {
            id: None,
            account_user_id,
            account_number: account_number.into(),
            balance,
            account_status: AccountStatus::InUse,
            registered_at: Utc::now(),
            unregistered_at: None,
        }
    }
}

impl From<Account> for SaveAccount {
    fn from(account: Account) -> Self {
        Self {
            id: Some(account.id),
            account_user_id: account.account_user_id,
            account_number: account.account_number,
            balance: account.balance,
            account_status: account.account_status,
            registered_at: account.registered_at,
            unregistered_at: account.unregistered_at,
        }
    }
}

/// Computes the account number following `latest`
///
/// The result is `latest + 1`, zero-padded to the width of `latest`.
/// Returns None if `latest` is not a non-negative integer or would overflow.
pub fn next_account_number(latest: &str) -> Option<String> {
    let value: u64 = latest.parse().ok()?;
    let next = value.checked_add(1)?;
    Some(format!("{:0width$}", next, width = latest.len()))
}

impl Account {
    /// Inserts a new account
    ///
    /// # Errors
    ///
    /// Returns an error if the account number already exists (unique
    /// constraint), the owner does not exist, or the connection fails
    pub async fn insert(pool: &PgPool, data: &SaveAccount) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO accounts (account_user_id, account_number, balance, account_status,
                                  registered_at, unregistered_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(data.account_user_id)
            .bind(&data.account_number)
            .bind(data.balance)
            .bind(data.account_status)
            .bind(data.registered_at)
            .bind(data.unregistered_at)
            .fetch_one(pool)
            .await
    }

    /// Updates the mutable columns of an existing account
    ///
    /// Owner and account number are never rewritten.
    ///
    /// # Returns
    ///
    /// The updated account, None if no row has this id
    pub async fn update(
        pool: &PgPool,
        id: i64,
        data: &SaveAccount,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            UPDATE accounts
            SET balance = $2,
                account_status = $3,
                unregistered_at = $4,
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ACCOUNT_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .bind(data.balance)
            .bind(data.account_status)
            .bind(data.unregistered_at)
            .fetch_optional(pool)
            .await
    }

    /// Finds an account by id
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");

        sqlx::query_as::<_, Account>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Finds an account by its account number
    pub async fn find_by_number(
        pool: &PgPool,
        account_number: &str,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_number = $1");

        sqlx::query_as::<_, Account>(&query)
            .bind(account_number)
            .fetch_optional(pool)
            .await
    }

    /// Finds the most recently created account (highest id)
    pub async fn find_latest(pool: &PgPool) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts ORDER BY id DESC LIMIT 1");

        sqlx::query_as::<_, Account>(&query)
            .fetch_optional(pool)
            .await
    }

    /// Counts the accounts owned by a user
    ///
    /// With `status` set, only accounts in that status are counted.
    pub async fn count_by_user(
        pool: &PgPool,
        account_user_id: i64,
        status: Option<AccountStatus>,
    ) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = match status {
            Some(status) => {
                sqlx::query_as(
                    "SELECT COUNT(*) FROM accounts WHERE account_user_id = $1 AND account_status = $2",
                )
                .bind(account_user_id)
                .bind(status)
                .fetch_one(pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM accounts WHERE account_user_id = $1")
                    .bind(account_user_id)
                    .fetch_one(pool)
                    .await?
            }
        };

        Ok(count)
    }

    /// Lists every account owned by a user, oldest first
    pub async fn list_by_user(
        pool: &PgPool,
        account_user_id: i64,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_user_id = $1 ORDER BY id ASC"
        );

        sqlx::query_as::<_, Account>(&query)
            .bind(account_user_id)
            .fetch_all(pool)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_transitions() {
        assert!(AccountStatus::InUse.can_transition_to(AccountStatus::Unregistered));
        assert!(!AccountStatus::Unregistered.can_transition_to(AccountStatus::InUse));
        assert!(!AccountStatus::InUse.can_transition_to(AccountStatus::InUse));
        assert!(!AccountStatus::Unregistered.can_transition_to(AccountStatus::Unregistered));
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&AccountStatus::InUse).unwrap();
        assert_eq!(json, "\"IN_USE\"");
        assert_eq!(AccountStatus::Unregistered.as_str(), "UNREGISTERED");
    }

    #[test]
    fn test_next_account_number() {
        assert_eq!(next_account_number("1000000012").as_deref(), Some("1000000013"));
        assert_eq!(next_account_number("100000012").as_deref(), Some("100000013"));
        assert_eq!(next_account_number("0000000009").as_deref(), Some("0000000010"));
        assert_eq!(next_account_number("9999999999").as_deref(), Some("10000000000"));
    }

    #[test]
    fn test_next_account_number_rejects_garbage() {
        assert!(next_account_number("abc").is_none());
        assert!(next_account_number("").is_none());
        assert!(next_account_number("-5").is_none());
    }

    #[test]
    fn test_save_account_opening() {
        let draft = SaveAccount::opening(12, "1000000000", 1000);
        assert!(draft.id.is_none());
        assert_eq!(draft.account_status, AccountStatus::InUse);
        assert!(draft.unregistered_at.is_none());
    }
}
