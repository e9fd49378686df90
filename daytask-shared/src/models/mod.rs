/// Database models for Daytask
///
/// This module contains all database models and their CRUD operations.
///
/// # Models
///
/// - `user`: registered identities and their settings
/// - `session`: server-side session records addressed by token
/// - `task`: owner-scoped tasks
///
/// # Example
///
/// ```no_run
/// use daytask_shared::models::user::{CreateUser, User};
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let new_user = CreateUser {
///     email: "user@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     first_name: "John".to_string(),
///     last_name: "Doe".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # let _ = user;
/// # Ok(())
/// # }
/// ```

pub mod session;
pub mod task;
pub mod user;
