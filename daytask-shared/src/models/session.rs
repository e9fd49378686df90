/// Session model and database operations
///
/// Session rows are the durable, server-side half of the login state: they
/// survive server restarts and are addressed only by their random token.
/// Each row is independent, so concurrent requests from different sessions
/// never contend. Lifetime policy (how long a session lives, how the token
/// travels) is in [`crate::auth::session`].
///
/// # Schema
///
/// ```sql
/// CREATE TABLE sessions (
///     token VARCHAR(64) PRIMARY KEY,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     remember BOOLEAN NOT NULL DEFAULT FALSE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     expires_at TIMESTAMPTZ NOT NULL
/// );
/// ```

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

/// Server-side session record
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// Unguessable random identifier; also the cookie value
    pub token: String,

    /// Identity this session authenticates
    pub user_id: Uuid,

    /// Whether the session was created with "remember me"
    pub remember: bool,

    /// When the session was created
    pub created_at: DateTime<Utc>,

    /// When the session stops being honored
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Inserts a new session row
    pub async fn insert(
        pool: &PgPool,
        token: &str,
        user_id: Uuid,
        remember: bool,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            INSERT INTO sessions (token, user_id, remember, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING token, user_id, remember, created_at, expires_at
            "#,
        )
        .bind(token)
        .bind(user_id)
        .bind(remember)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;

        Ok(session)
    }

    /// Finds a live (non-expired) session by token
    ///
    /// An expired row is treated as absent; it will be reaped by
    /// [`purge_expired`](Self::purge_expired).
    pub async fn find_valid(pool: &PgPool, token: &str) -> Result<Option<Self>, sqlx::Error> {
        let session = sqlx::query_as::<_, Session>(
            r#"
            SELECT token, user_id, remember, created_at, expires_at
            FROM sessions
            WHERE token = $1 AND expires_at > NOW()
            "#,
        )
        .bind(token)
        .fetch_optional(pool)
        .await?;

        Ok(session)
    }

    /// Deletes a session by token
    ///
    /// Returns `true` if a row was removed, `false` if it was already gone.
    pub async fn delete(pool: &PgPool, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token = $1")
            .bind(token)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Removes expired session rows
    ///
    /// Returns the number of rows reaped.
    pub async fn purge_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= NOW()")
            .execute(pool)
            .await?;

        let reaped = result.rows_affected();
        if reaped > 0 {
            debug!(reaped, "purged expired sessions");
        }
        Ok(reaped)
    }
}
