/// Authentication endpoints
///
/// This module provides the identity and session endpoints:
///
/// - `POST /register` - create an identity
/// - `POST /login` - verify credentials and establish a session
/// - `POST /logout` - tear the session down (idempotent)
/// - `GET /auth-status` - session probe, never errors
///
/// Request and response bodies use camelCase field names. The session
/// travels only in the signed `sid` cookie; no token ever appears in a
/// response body.

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::cookie::SignedCookieJar;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;
use validator::ValidateEmail;

use daytask_shared::auth::credentials::{normalize_email, verify_credentials};
use daytask_shared::auth::password::hash_password;
use daytask_shared::auth::session::{
    self, removal_cookie, session_cookie, session_ttl, SESSION_COOKIE,
};
use daytask_shared::models::session::Session;
use daytask_shared::models::user::{CreateUser, User};

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    middleware::auth::OptionalUser,
};

/// Register request
///
/// All fields are required; they are optional here so a missing field
/// produces the same 400 as an empty one instead of a body-level rejection.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Login request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,

    /// Extends the session from 1 day to 14 days
    #[serde(default)]
    pub remember_me: bool,
}

/// Identity summary safe to return to the client
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
        }
    }
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserSummary,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub message: String,
    pub user: UserSummary,
}

/// Plain acknowledgement
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

/// Auth status response
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatusResponse {
    pub logged_in: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

/// Registers a new identity
///
/// The email is normalized (trim, lowercase) before the duplicate check and
/// the insert. The check-then-insert race is closed by the unique index on
/// `LOWER(email)`: a concurrent duplicate insert surfaces as the same 400.
///
/// # Errors
///
/// - `400 Bad Request`: missing fields, invalid email, duplicate email
/// - `503 Service Unavailable`: database unreachable
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<RegisterResponse>)> {
    let pool = state.db().await?;

    let first_name = req.first_name.as_deref().unwrap_or("").trim().to_string();
    let last_name = req.last_name.as_deref().unwrap_or("").trim().to_string();
    let email = normalize_email(req.email.as_deref().unwrap_or(""));
    let password = req.password.unwrap_or_default();

    if first_name.is_empty() || last_name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::BadRequest("Missing required fields".to_string()));
    }

    if !email.validate_email() {
        return Err(ApiError::Validation(vec![ValidationErrorDetail {
            field: "email".to_string(),
            message: "Invalid email format".to_string(),
        }]));
    }

    if User::find_by_email(&pool, &email).await?.is_some() {
        warn!("registration attempt with existing email");
        return Err(ApiError::DuplicateEmail);
    }

    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("password hashing task failed: {}", e)))??;

    let user = User::create(
        &pool,
        CreateUser {
            email,
            password_hash,
            first_name,
            last_name,
        },
    )
    .await?;

    info!(user_id = %user.id, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully".to_string(),
            user: UserSummary::from(&user),
        }),
    ))
}

/// Verifies credentials and establishes a session
///
/// A fresh session token is always allocated; if the request carried a
/// pre-login session cookie, that session is destroyed first (session
/// fixation defense). The cookie lifetime follows the `rememberMe` flag.
///
/// # Errors
///
/// - `400 Bad Request`: missing credentials
/// - `401 Unauthorized`: invalid credentials (one generic message)
/// - `503 Service Unavailable`: database unreachable
pub async fn login(
    State(state): State<AppState>,
    jar: SignedCookieJar,
    Json(req): Json<LoginRequest>,
) -> ApiResult<(SignedCookieJar, Json<LoginResponse>)> {
    let pool = state.db().await?;

    let (Some(email), Some(password)) = (req.email, req.password) else {
        return Err(ApiError::BadRequest("Missing credentials".to_string()));
    };

    let user = verify_credentials(&pool, &email, &password).await?;

    let previous = jar.get(SESSION_COOKIE).map(|c| c.value().to_string());
    let session =
        session::establish(&pool, user.id, req.remember_me, previous.as_deref()).await?;

    User::update_last_login(&pool, user.id).await?;

    // Opportunistic reap; failure here must not fail the login.
    if let Err(e) = Session::purge_expired(&pool).await {
        warn!(error = %e, "expired session reap failed");
    }

    let cookie = session_cookie(
        &session.token,
        session_ttl(req.remember_me),
        state.config.api.production,
    );

    info!(user_id = %user.id, remember_me = req.remember_me, "user logged in");
    Ok((
        jar.add(cookie),
        Json(LoginResponse {
            message: "Logged in successfully".to_string(),
            user: UserSummary::from(&user),
        }),
    ))
}

/// Tears down the caller's session
///
/// Idempotent: logging out twice, or with an expired or unknown session,
/// still returns success, and the client is always instructed to discard
/// the cookie.
pub async fn logout(
    State(state): State<AppState>,
    jar: SignedCookieJar,
) -> ApiResult<(SignedCookieJar, Json<MessageResponse>)> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        let pool = state.db().await?;
        session::terminate(&pool, cookie.value()).await?;
    }

    Ok((
        jar.remove(removal_cookie()),
        Json(MessageResponse {
            message: "Logged out successfully".to_string(),
        }),
    ))
}

/// Reports whether the caller has a live session
///
/// Never errors; an anonymous caller gets `{"loggedIn": false}`.
pub async fn auth_status(OptionalUser(user): OptionalUser) -> Json<AuthStatusResponse> {
    match user {
        Some(user) => Json(AuthStatusResponse {
            logged_in: true,
            user: Some(UserSummary::from(&user)),
        }),
        None => Json(AuthStatusResponse {
            logged_in: false,
            user: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_summary_serializes_camel_case() {
        let summary = UserSummary {
            id: Uuid::new_v4(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
            email: "ada@example.com".to_string(),
        };

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["firstName"], "Ada");
        assert_eq!(json["lastName"], "Lovelace");
        assert!(json.get("first_name").is_none());
    }

    #[test]
    fn auth_status_omits_user_when_logged_out() {
        let response = AuthStatusResponse {
            logged_in: false,
            user: None,
        };

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["loggedIn"], false);
        assert!(json.get("user").is_none());
    }

    #[test]
    fn remember_me_defaults_to_false() {
        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"p1"}"#).unwrap();
        assert!(!req.remember_me);

        let req: LoginRequest =
            serde_json::from_str(r#"{"email":"a@x.com","password":"p1","rememberMe":true}"#)
                .unwrap();
        assert!(req.remember_me);
    }
}
