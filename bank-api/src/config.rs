/// Configuration management for the API server
///
/// Configuration is read from environment variables (a `.env` file is loaded
/// first when present).
///
/// # Environment Variables
///
/// - `API_HOST`: Host to bind to (default: 0.0.0.0)
/// - `API_PORT`: Port to bind to (default: 8080)
/// - `CORS_ORIGINS`: Comma-separated allowed origins (default: `*`)
/// - `STORE_BACKEND`: `postgres` or `memory` (default: postgres)
/// - `DATABASE_URL`: PostgreSQL connection string (required for postgres)
/// - `DATABASE_MAX_CONNECTIONS`: Pool size (default: 10)
/// - `RUN_MIGRATIONS`: Apply embedded migrations on startup (default: true)
/// - `SEED_USERS`: Comma-separated user names created at startup (memory only)
/// - `MAX_ACCOUNTS_PER_USER`: Account limit per user (default: 10)
/// - `ACCOUNT_LIMIT_COUNTS`: `all` or `in_use` (default: all)
/// - `ACCOUNT_NUMBER_SEED`: First account number (default: 1000000000)
/// - `RUST_LOG`: Log filter
///
/// # Example
///
/// ```no_run
/// use bank_api::config::Config;
///
/// # fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// println!("Server will listen on {}", config.bind_address());
/// # Ok(())
/// # }
/// ```

use bank_shared::policy::{AccountPolicy, LimitScope, DEFAULT_SEED_ACCOUNT_NUMBER};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

/// Complete application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// API server configuration
    pub api: ApiConfig,

    /// Record store configuration
    pub store: StoreConfig,

    /// Account opening rules
    pub accounts: AccountPolicy,
}

/// API server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,

    /// Allowed CORS origins. `*` allows any.
    pub cors_origins: Vec<String>,
}

/// Which record store backs the services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Postgres,
    Memory,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" => Ok(StoreBackend::Postgres),
            "memory" => Ok(StoreBackend::Memory),
            other => anyhow::bail!("STORE_BACKEND must be 'postgres' or 'memory', got '{}'", other),
        }
    }
}

/// Record store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// PostgreSQL connection URL (postgres backend only)
    pub database_url: Option<String>,

    /// Maximum number of connections in pool
    pub max_connections: u32,

    /// Apply migrations on startup
    pub run_migrations: bool,

    /// Users created at startup on the memory backend
    pub seed_users: Vec<String>,
}

impl Config {
    /// Loads configuration from environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if a required variable is missing or a value does not
    /// parse
    pub fn from_env() -> anyhow::Result<Self> {
        // Load .env file if present (for development)
        dotenvy::dotenv().ok();

        Self::from_source(|key| env::var(key).ok())
    }

    /// Loads configuration from an arbitrary key lookup
    pub fn from_source<F>(get: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = get("API_HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        let port = get("API_PORT")
            .unwrap_or_else(|| "8080".to_string())
            .parse::<u16>()?;
        let cors_origins = split_list(&get("CORS_ORIGINS").unwrap_or_else(|| "*".to_string()));

        let backend: StoreBackend = get("STORE_BACKEND")
            .unwrap_or_else(|| "postgres".to_string())
            .parse()?;

        let database_url = get("DATABASE_URL");
        if backend == StoreBackend::Postgres && database_url.is_none() {
            anyhow::bail!("DATABASE_URL environment variable is required for the postgres backend");
        }

        let max_connections = get("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "10".to_string())
            .parse::<u32>()?;

        let run_migrations = get("RUN_MIGRATIONS")
            .unwrap_or_else(|| "true".to_string())
            .parse::<bool>()?;

        let seed_users = get("SEED_USERS").map(|v| split_list(&v)).unwrap_or_default();

        let max_accounts_per_user = get("MAX_ACCOUNTS_PER_USER")
            .unwrap_or_else(|| "10".to_string())
            .parse::<i64>()?;
        if max_accounts_per_user < 1 {
            anyhow::bail!("MAX_ACCOUNTS_PER_USER must be at least 1");
        }

        let limit_scope = get("ACCOUNT_LIMIT_COUNTS")
            .map(|v| v.parse::<LimitScope>())
            .transpose()
            .map_err(|e| anyhow::anyhow!(e))?
            .unwrap_or_default();

        let seed_account_number =
            get("ACCOUNT_NUMBER_SEED").unwrap_or_else(|| DEFAULT_SEED_ACCOUNT_NUMBER.to_string());
        if seed_account_number.is_empty() || !seed_account_number.chars().all(|c| c.is_ascii_digit()) {
            anyhow::bail!("ACCOUNT_NUMBER_SEED must be a non-empty string of digits");
        }

        Ok(Self {
            api: ApiConfig {
                host,
                port,
                cors_origins,
            },
            store: StoreConfig {
                backend,
                database_url,
                max_connections,
                run_migrations,
                seed_users,
            },
            accounts: AccountPolicy {
                max_accounts_per_user,
                limit_scope,
                seed_account_number,
            },
        })
    }

    /// Returns the server bind address
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.api.host, self.api.port)
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
