/// Authorization guard
///
/// Gates every protected route: resolves the caller's identity from the
/// signed session cookie and short-circuits with 401 before any handler
/// logic runs when there is none. Handlers receive the full [`User`] and
/// must scope every data operation to its id — the task store takes the
/// owner as part of its SQL filter, so a handler cannot forget the
/// narrowing.
///
/// # Extractors
///
/// - [`CurrentUser`]: rejects with 401 when the request carries no live
///   session
/// - [`OptionalUser`]: never rejects; yields `None` for anonymous or failed
///   resolution (used by `/auth-status`)
///
/// # Example
///
/// ```no_run
/// use daytask_api::middleware::auth::CurrentUser;
/// use axum::Json;
///
/// async fn handler(CurrentUser(user): CurrentUser) -> Json<String> {
///     Json(format!("Hello, {}!", user.first_name))
/// }
/// ```

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
};
use axum_extra::extract::cookie::SignedCookieJar;
use tracing::debug;

use daytask_shared::auth::session::SESSION_COOKIE;
use daytask_shared::models::{session::Session, user::User};

use crate::{app::AppState, error::ApiError};

/// The authenticated identity for this request
///
/// Extraction fails with 401 unless the request carries a validly signed
/// cookie referencing a live session for an existing user.
pub struct CurrentUser(pub User);

/// The authenticated identity, if any
///
/// Never rejects: a missing cookie, a dead session, or even an unreachable
/// store all resolve to `None`.
pub struct OptionalUser(pub Option<User>);

/// Resolves the session cookie to a user
///
/// A tampered cookie fails signature verification inside the jar and looks
/// identical to no cookie at all.
async fn resolve_user(parts: &mut Parts, state: &AppState) -> Result<Option<User>, ApiError> {
    let jar: SignedCookieJar = match SignedCookieJar::from_request_parts(parts, state).await {
        Ok(jar) => jar,
        Err(never) => match never {},
    };

    let Some(cookie) = jar.get(SESSION_COOKIE) else {
        return Ok(None);
    };

    let pool = state.db().await?;

    let Some(session) = Session::find_valid(&pool, cookie.value()).await? else {
        debug!("session cookie references no live session");
        return Ok(None);
    };

    let user = User::find_by_id(&pool, session.user_id).await?;
    Ok(user)
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        match resolve_user(parts, state).await? {
            Some(user) => Ok(CurrentUser(user)),
            None => Err(ApiError::Unauthorized(
                "Unauthorized - Please log in".to_string(),
            )),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for OptionalUser {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        // /auth-status must never error; treat any failure as anonymous.
        Ok(OptionalUser(
            resolve_user(parts, state).await.unwrap_or(None),
        ))
    }
}
