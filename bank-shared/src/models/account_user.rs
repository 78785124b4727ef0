/// Account owner model and database operations
///
/// Account users are created outside of the lifecycle service. The services
/// only read them to resolve ownership.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE account_users (
///     id BIGSERIAL PRIMARY KEY,
///     name VARCHAR(255) NOT NULL,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// A person owning zero or more accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountUser {
    /// Store-assigned id
    pub id: i64,

    /// Display name
    pub name: String,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new account user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateAccountUser {
    pub name: String,
}

impl AccountUser {
    /// Inserts a new account user
    ///
    /// # Errors
    ///
    /// Returns an error if the database connection fails
    pub async fn create(pool: &PgPool, data: CreateAccountUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, AccountUser>(
            r#"
            INSERT INTO account_users (name)
            VALUES ($1)
            RETURNING id, name, created_at, updated_at
            "#,
        )
        .bind(data.name)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds an account user by id
    ///
    /// # Returns
    ///
    /// The user if found, None otherwise
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, AccountUser>(
            r#"
            SELECT id, name, created_at, updated_at
            FROM account_users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }
}
