/// Session lifetime policy and cookie construction
///
/// Sessions are server-side rows (see [`crate::models::session`]) addressed
/// by an unguessable 256-bit token. The browser holds only the token, inside
/// a signed cookie, so a tampered cookie is rejected before any lookup.
///
/// # Policy
///
/// - Login always allocates a fresh token; a session id that existed before
///   authentication never becomes authenticated (session fixation defense).
/// - "Remember me" yields a 14-day expiry, otherwise 1 day. There is no
///   unbounded browser-session cookie: residual access from a shared device
///   is always capped.
/// - The cookie is `HttpOnly`, `SameSite=Lax`, `Path=/`, and `Secure` in
///   production.
/// - Logout deletes the server-side row and is idempotent: terminating an
///   absent or expired session is still a success.

use axum_extra::extract::cookie::{Cookie, SameSite};
use chrono::{Duration, Utc};
use rand::{rngs::OsRng, RngCore};
use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::models::session::Session;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "sid";

const REMEMBER_ME_DAYS: i64 = 14;
const DEFAULT_SESSION_DAYS: i64 = 1;

/// Maps the login-time "remember me" flag to a session lifetime
pub fn session_ttl(remember_me: bool) -> Duration {
    if remember_me {
        Duration::days(REMEMBER_ME_DAYS)
    } else {
        Duration::days(DEFAULT_SESSION_DAYS)
    }
}

/// Generates a fresh session token: 32 bytes from the OS RNG, hex-encoded
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Builds the session cookie carrying the given token
///
/// `secure` must be true in production (HTTPS) contexts.
pub fn session_cookie(token: &str, ttl: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token.to_owned()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(time::Duration::seconds(ttl.num_seconds()))
        .build()
}

/// Builds the cookie used to instruct the client to discard the session
///
/// Attributes must match the original cookie's path for browsers to remove
/// it.
pub fn removal_cookie() -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE).path("/").build()
}

/// Establishes a session for a verified identity
///
/// A fresh token is always allocated. If the request carried a pre-login
/// session cookie, that session row is deleted first so the pre-seeded id
/// can never become authenticated.
///
/// # Errors
///
/// Returns the underlying database error; the caller surfaces it as an
/// internal failure.
pub async fn establish(
    pool: &PgPool,
    user_id: Uuid,
    remember_me: bool,
    previous_token: Option<&str>,
) -> Result<Session, sqlx::Error> {
    if let Some(previous) = previous_token {
        Session::delete(pool, previous).await?;
    }

    let token = generate_token();
    let expires_at = Utc::now() + session_ttl(remember_me);
    let session = Session::insert(pool, &token, user_id, remember_me, expires_at).await?;

    debug!(user_id = %user_id, remember_me, "session established");
    Ok(session)
}

/// Tears down a session
///
/// Idempotent: terminating a session that is already gone (expired, never
/// existed, or terminated by another request) is a success.
pub async fn terminate(pool: &PgPool, token: &str) -> Result<(), sqlx::Error> {
    let removed = Session::delete(pool, token).await?;
    if !removed {
        debug!("logout for a session that was already gone");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remember_me_window_is_materially_longer() {
        let remembered = session_ttl(true);
        let short = session_ttl(false);

        assert_eq!(remembered, Duration::days(14));
        assert_eq!(short, Duration::days(1));
        assert!(remembered > short);
    }

    #[test]
    fn tokens_are_64_hex_chars_and_unique() {
        let a = generate_token();
        let b = generate_token();

        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, b);
    }

    #[test]
    fn session_cookie_attributes() {
        let cookie = session_cookie("deadbeef", session_ttl(true), false);

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "deadbeef");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(14)));
    }

    #[test]
    fn session_cookie_is_secure_in_production() {
        let cookie = session_cookie("deadbeef", session_ttl(false), true);

        assert_eq!(cookie.secure(), Some(true));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(1)));
    }

    #[test]
    fn cookie_lifetime_is_always_bounded() {
        // Neither policy branch may produce a browser-session cookie.
        for remember_me in [true, false] {
            let cookie = session_cookie("t", session_ttl(remember_me), false);
            assert!(cookie.max_age().is_some());
        }
    }

    #[test]
    fn removal_cookie_matches_session_cookie_path() {
        let cookie = removal_cookie();

        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.path(), Some("/"));
    }
}
