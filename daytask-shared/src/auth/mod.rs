/// Authentication primitives for Daytask
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and verification
/// - [`credentials`]: email/password verification against stored identities
/// - [`session`]: session lifetime policy, tokens, and cookie construction
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **Constant-time Comparison**: verification never short-circuits on a
///   partial match
/// - **Session Tokens**: 256 bits from the OS RNG, stored server-side only
/// - **Session Fixation Defense**: a fresh token is allocated on every login
///
/// # Example
///
/// ```no_run
/// use daytask_shared::auth::password::{hash_password, verify_password};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
/// # Ok(())
/// # }
/// ```

pub mod credentials;
pub mod password;
pub mod session;
