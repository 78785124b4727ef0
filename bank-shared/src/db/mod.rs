/// Database layer
///
/// - `pool`: PostgreSQL connection pool management with health checks
/// - `migrations`: embedded migration runner
///
/// Models live in the `models` module at crate root level.
///
/// # Example
///
/// ```no_run
/// use bank_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig::new(std::env::var("DATABASE_URL")?).with_max_connections(5);
///     let pool = create_pool(config).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
