/// Database layer for Daytask
///
/// This module provides the process-wide connection manager, pool
/// construction, and the migration runner.
///
/// # Modules
///
/// - `connection`: single-flight connection manager with one-time schema maintenance
/// - `pool`: PostgreSQL connection pool construction with health checks
/// - `migrations`: Database migration runner
///
/// # Example
///
/// ```no_run
/// use daytask_shared::db::connection::{ConnectionManager, PgConnector};
/// use daytask_shared::db::pool::DatabaseConfig;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let config = DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     };
///
///     let manager = ConnectionManager::new(PgConnector::new(config));
///     let pool = manager.ensure_connected().await?;
///     # let _ = pool;
///     Ok(())
/// }
/// ```

pub mod connection;
pub mod migrations;
pub mod pool;
