/// Database migration runner
///
/// Migrations live in the workspace-level `migrations/` directory and are
/// embedded at compile time. Each migration is a reversible pair:
/// - `{timestamp}_{name}.up.sql`
/// - `{timestamp}_{name}.down.sql`
///
/// # Example
///
/// ```no_run
/// use bank_shared::db::pool::{create_pool, DatabaseConfig};
/// use bank_shared::db::migrations::{run_migrations, get_migration_status};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::new(std::env::var("DATABASE_URL")?)).await?;
///
/// run_migrations(&pool).await?;
///
/// let status = get_migration_status(&pool).await?;
/// println!("Applied {} migrations", status.applied_migrations);
/// # Ok(())
/// # }
/// ```

use sqlx::{migrate::MigrateDatabase, postgres::PgPool, Postgres};
use tracing::{debug, info, warn};

/// Migration status information
#[derive(Debug, Clone)]
pub struct MigrationStatus {
    /// Number of successfully applied migrations
    pub applied_migrations: usize,

    /// Latest applied migration version (timestamp)
    pub latest_version: Option<i64>,

    /// Whether every embedded migration has been applied
    pub is_up_to_date: bool,
}

/// Runs all pending migrations
///
/// # Errors
///
/// Returns an error if a migration fails or was modified after being applied
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    info!("Starting database migrations");

    match sqlx::migrate!("../migrations").run(pool).await {
        Ok(()) => {
            info!("All database migrations completed successfully");
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Migration failed");
            Err(e)
        }
    }
}

/// Number of up migrations embedded in this build
pub fn embedded_migration_count() -> usize {
    sqlx::migrate!("../migrations")
        .iter()
        .filter(|m| !m.migration_type.is_down_migration())
        .count()
}

/// Reads the applied-migration state from `_sqlx_migrations`
pub async fn get_migration_status(pool: &PgPool) -> Result<MigrationStatus, sqlx::Error> {
    debug!("Checking migration status");

    let table_exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (
            SELECT FROM information_schema.tables
            WHERE table_schema = 'public'
            AND table_name = '_sqlx_migrations'
        )",
    )
    .fetch_one(pool)
    .await?;

    if !table_exists {
        debug!("Migrations table does not exist yet");
        return Ok(MigrationStatus {
            applied_migrations: 0,
            latest_version: None,
            is_up_to_date: false,
        });
    }

    let (count, latest_version): (i64, Option<i64>) = sqlx::query_as(
        "SELECT COUNT(*), MAX(version) FROM _sqlx_migrations WHERE success = true",
    )
    .fetch_one(pool)
    .await?;

    debug!(
        applied_migrations = count,
        latest_version = ?latest_version,
        "Migration status retrieved"
    );

    let applied = count as usize;
    Ok(MigrationStatus {
        applied_migrations: applied,
        latest_version,
        is_up_to_date: applied >= embedded_migration_count(),
    })
}

/// Creates the database if it doesn't exist
///
/// Intended for development and tests; production databases are provisioned
/// separately.
pub async fn ensure_database_exists(database_url: &str) -> Result<(), sqlx::Error> {
    info!("Checking if database exists");

    if !Postgres::database_exists(database_url).await? {
        info!("Database does not exist, creating it");
        Postgres::create_database(database_url).await?;
        info!("Database created successfully");
    } else {
        debug!("Database already exists");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_migrations_present() {
        // account_users, accounts, transactions
        assert_eq!(embedded_migration_count(), 4);
    }
}
