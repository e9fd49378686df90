/// Process-wide database connection management
///
/// This module owns the single shared database handle for the process. The
/// server does not connect at startup; the first request triggers a
/// connection attempt, and the [`ConnectionManager`] memoizes the
/// **in-flight attempt itself** so that every concurrent caller during the
/// connection window awaits the same attempt. At most one connection attempt
/// is outstanding per process at any time.
///
/// On success the resolved handle is cached for the process lifetime. On
/// failure the cached attempt is cleared so the next request retries from
/// scratch, and the error propagates to every waiter of the failed attempt.
///
/// The manager is generic over a [`Connect`] implementation so tests can
/// inject a deterministic fake instead of a real PostgreSQL pool. The
/// production implementation is [`PgConnector`], which also performs the
/// one-time post-connect schema maintenance: running migrations and dropping
/// the obsolete unique index left behind by username-based lookup.
///
/// # Example
///
/// ```no_run
/// use daytask_shared::db::connection::{ConnectionManager, PgConnector};
/// use daytask_shared::db::pool::DatabaseConfig;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = DatabaseConfig {
///     url: std::env::var("DATABASE_URL")?,
///     ..Default::default()
/// };
///
/// let manager = ConnectionManager::new(PgConnector::new(config));
///
/// // Every request path goes through here; concurrent first calls share
/// // one connection attempt.
/// let pool = manager.ensure_connected().await?;
/// # let _ = pool;
/// # Ok(())
/// # }
/// ```

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, FutureExt, Shared};
use sqlx::PgPool;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use crate::db::migrations::run_migrations;
use crate::db::pool::{create_pool, DatabaseConfig};

/// Name of the unique index that enforced username-based lookup before
/// email became the login identifier. Deployments created before that
/// change still carry it.
const LEGACY_USERNAME_INDEX: &str = "users_username_key";

/// Error type for connection establishment and post-connect maintenance
///
/// Cloneable because a single failed attempt is shared by every caller that
/// was awaiting it.
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The database could not be reached
    #[error("database unavailable: {0}")]
    Unavailable(String),

    /// The one-time schema maintenance step failed
    #[error("schema maintenance failed: {0}")]
    Maintenance(String),
}

/// Seam between the connection manager and the backing store
///
/// The manager calls [`Connect::connect`] at most once per attempt window and
/// runs [`Connect::after_first_connect`] exactly once per process after the
/// first successful connection.
#[async_trait]
pub trait Connect: Send + Sync + 'static {
    /// The ready-to-use database handle produced by a successful attempt
    type Handle: Clone + Send + Sync + 'static;

    /// Opens a connection to the backing store
    async fn connect(&self) -> Result<Self::Handle, StoreError>;

    /// One-time maintenance run after the first successful connection
    async fn after_first_connect(&self, _handle: &Self::Handle) -> Result<(), StoreError> {
        Ok(())
    }
}

type Attempt<H> = Shared<BoxFuture<'static, Result<H, StoreError>>>;

/// Owns the single shared database handle and its establishment state
///
/// The only shared mutable process-wide resource in the server. The slot
/// under the mutex holds the current attempt (finished or in flight); the
/// `OnceCell` guards the one-time post-connect step.
pub struct ConnectionManager<C: Connect> {
    connector: Arc<C>,
    attempt: Mutex<Option<Attempt<C::Handle>>>,
    first_connect: OnceCell<()>,
}

impl<C: Connect> ConnectionManager<C> {
    /// Creates a manager around the given connector; no connection is
    /// attempted until the first [`ensure_connected`](Self::ensure_connected)
    /// call.
    pub fn new(connector: C) -> Self {
        Self {
            connector: Arc::new(connector),
            attempt: Mutex::new(None),
            first_connect: OnceCell::new(),
        }
    }

    /// Returns the ready-to-use database handle, connecting if necessary
    ///
    /// Concurrent callers during the connection window all await the same
    /// attempt. A failed attempt is cleared from the slot (unless a newer
    /// attempt has already replaced it) so the next caller retries.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] when the store cannot be reached,
    /// or [`StoreError::Maintenance`] when the one-time post-connect step
    /// fails. In the latter case the connection itself stays cached and only
    /// the maintenance step is retried on the next call.
    pub async fn ensure_connected(&self) -> Result<C::Handle, StoreError> {
        let attempt = {
            let mut slot = self.attempt.lock().await;
            match slot.as_ref() {
                Some(attempt) => attempt.clone(),
                None => {
                    let connector = Arc::clone(&self.connector);
                    let attempt = async move { connector.connect().await }.boxed().shared();
                    *slot = Some(attempt.clone());
                    attempt
                }
            }
        };

        match attempt.clone().await {
            Ok(handle) => {
                self.first_connect
                    .get_or_try_init(|| async { self.connector.after_first_connect(&handle).await })
                    .await?;
                Ok(handle)
            }
            Err(err) => {
                let mut slot = self.attempt.lock().await;
                if slot.as_ref().is_some_and(|current| current.ptr_eq(&attempt)) {
                    *slot = None;
                }
                Err(err)
            }
        }
    }

    /// Discards the cached connection state so the next call starts a fresh
    /// attempt
    ///
    /// The one-time post-connect guard is process-lifetime and is not reset.
    pub async fn reset(&self) {
        let mut slot = self.attempt.lock().await;
        *slot = None;
    }
}

/// Production [`Connect`] implementation backed by a PostgreSQL pool
///
/// After the first successful connection it runs pending migrations and then
/// drops the legacy username index if an older deployment still carries it.
pub struct PgConnector {
    config: DatabaseConfig,
}

impl PgConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Connect for PgConnector {
    type Handle = PgPool;

    async fn connect(&self) -> Result<PgPool, StoreError> {
        create_pool(self.config.clone()).await.map_err(|e| {
            warn!(error = %e, "Database connection attempt failed");
            StoreError::Unavailable(e.to_string())
        })
    }

    async fn after_first_connect(&self, pool: &PgPool) -> Result<(), StoreError> {
        run_migrations(pool)
            .await
            .map_err(|e| StoreError::Maintenance(e.to_string()))?;
        drop_legacy_username_index(pool).await
    }
}

/// Drops the obsolete unique username index if it is still present
///
/// Idempotent: "index does not exist" and "namespace does not exist" are
/// benign races with another process instance that already removed it. Any
/// other error is re-raised.
pub async fn drop_legacy_username_index(pool: &PgPool) -> Result<(), StoreError> {
    let statement = format!("DROP INDEX {}", LEGACY_USERNAME_INDEX);

    match sqlx::query(&statement).execute(pool).await {
        Ok(_) => {
            info!(index = LEGACY_USERNAME_INDEX, "Dropped legacy username index");
            Ok(())
        }
        Err(sqlx::Error::Database(db_err)) if is_missing_object(db_err.code().as_deref()) => {
            debug!(
                index = LEGACY_USERNAME_INDEX,
                "Legacy username index already absent"
            );
            Ok(())
        }
        Err(e) => {
            warn!(error = %e, "Failed to drop legacy username index");
            Err(StoreError::Maintenance(e.to_string()))
        }
    }
}

/// True for the PostgreSQL error codes that mean the dropped object was
/// already gone: 42704 (undefined_object) and 42P01 (undefined_table).
fn is_missing_object(code: Option<&str>) -> bool {
    matches!(code, Some("42704") | Some("42P01"))
}
