/// Credential verification
///
/// Validates a submitted email/password pair against stored identities and
/// returns the matching [`User`] or a failure. This is an explicit function
/// composed into the login handler, not a strategy registration: callers get
/// a `Result` and decide how to respond.
///
/// Failure reasons are kept internal; the HTTP layer collapses
/// [`CredentialError::UnknownEmail`] and [`CredentialError::WrongPassword`]
/// into one generic 401 so a caller cannot probe which part was wrong.
///
/// # Example
///
/// ```no_run
/// use daytask_shared::auth::credentials::verify_credentials;
/// use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), Box<dyn std::error::Error>> {
/// let user = verify_credentials(&pool, " User@Example.com ", "secret").await?;
/// println!("authenticated {}", user.id);
/// # Ok(())
/// # }
/// ```

use sqlx::PgPool;
use tracing::warn;

use crate::auth::password::{self, PasswordError};
use crate::models::user::User;

/// Why a credential pair did not verify
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    /// No identity with the submitted email
    #[error("unknown email")]
    UnknownEmail,

    /// The identity exists but the password does not match
    #[error("incorrect password")]
    WrongPassword,

    /// The stored hash could not be processed
    #[error(transparent)]
    Hash(#[from] PasswordError),

    /// The identity lookup failed
    #[error(transparent)]
    Store(#[from] sqlx::Error),
}

/// Normalizes an email address for lookup and storage: trim, then lowercase
///
/// Applied to every email that crosses the API boundary so that
/// `"A@X.com"` and `"a@x.com "` address the same identity.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Verifies an email/password pair against the stored identity
///
/// The email is normalized before lookup. Argon2 verification is CPU-bound
/// and runs on the blocking thread pool so concurrent requests are not
/// starved.
///
/// # Errors
///
/// [`CredentialError::UnknownEmail`] or [`CredentialError::WrongPassword`]
/// on a mismatch; infrastructure failures pass through. The plaintext
/// password and the stored hash are never logged.
pub async fn verify_credentials(
    pool: &PgPool,
    email: &str,
    password: &str,
) -> Result<User, CredentialError> {
    let normalized = normalize_email(email);

    let user = User::find_by_email(pool, &normalized)
        .await?
        .ok_or(CredentialError::UnknownEmail)?;

    let hash = user.password_hash.clone();
    let candidate = password.to_owned();
    let matches = tokio::task::spawn_blocking(move || password::verify_password(&candidate, &hash))
        .await
        .map_err(|e| {
            warn!(error = %e, "password verification task failed");
            PasswordError::VerifyError(e.to_string())
        })??;

    if !matches {
        return Err(CredentialError::WrongPassword);
    }

    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        assert_eq!(normalize_email("  User@Example.COM  "), "user@example.com");
        assert_eq!(normalize_email("A@X.com"), "a@x.com");
        assert_eq!(normalize_email("already@lower.case"), "already@lower.case");
    }

    #[test]
    fn normalize_of_empty_input_is_empty() {
        assert_eq!(normalize_email("   "), "");
    }
}
