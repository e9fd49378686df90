/// Application state and router builder
///
/// This module defines the shared application state and provides a function
/// to build the Axum router with all routes and middleware.
///
/// The state owns the process-wide [`ConnectionManager`]; handlers reach the
/// database exclusively through [`AppState::db`], so every request path goes
/// through the single-flight connection guard before touching any data.
///
/// # Example
///
/// ```no_run
/// use daytask_api::{app::{build_router, AppState}, config::Config};
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let state = AppState::new(config);
/// let app = build_router(state);
/// # let _ = app;
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, middleware::security::SecurityHeadersLayer};
use axum::{
    extract::FromRef,
    http::{header, HeaderValue, Method},
    routing::{get, post, put},
    Router,
};
use axum_extra::extract::cookie::Key;
use daytask_shared::db::connection::{ConnectionManager, PgConnector};
use daytask_shared::db::pool::DatabaseConfig;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; the
/// expensive parts are behind `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Process-wide database connection manager
    pub connections: Arc<ConnectionManager<PgConnector>>,

    /// Application configuration
    pub config: Arc<Config>,

    /// Key for the signed session cookie jar
    key: Key,
}

impl AppState {
    /// Creates new application state
    ///
    /// No database connection is attempted here; the first request triggers
    /// it through the connection manager.
    ///
    /// # Panics
    ///
    /// Panics if the session secret is shorter than 32 bytes;
    /// [`Config::from_env`] rejects such secrets before this point.
    pub fn new(config: Config) -> Self {
        let key = Key::derive_from(config.session.secret.as_bytes());

        let connector = PgConnector::new(DatabaseConfig {
            url: config.database.url.clone(),
            max_connections: config.database.max_connections,
            ..Default::default()
        });

        Self {
            connections: Arc::new(ConnectionManager::new(connector)),
            config: Arc::new(config),
            key,
        }
    }

    /// Returns the ready database handle, connecting on first use
    ///
    /// # Errors
    ///
    /// Returns `ApiError::StoreUnavailable` (503) when the store cannot be
    /// reached; the next request retries from scratch.
    pub async fn db(&self) -> Result<PgPool, ApiError> {
        Ok(self.connections.ensure_connected().await?)
    }
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.key.clone()
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── GET  /health            # Health check (public)
/// ├── POST /register          # Create identity (public)
/// ├── POST /login             # Verify credentials, establish session (public)
/// ├── POST /logout            # Tear down session (idempotent)
/// ├── GET  /auth-status       # Session probe (never errors)
/// ├── GET  /tasks             # Owned tasks        (session required)
/// ├── POST /tasks             # Create task        (session required)
/// ├── PUT    /tasks/:id       # Partial update     (session required)
/// └── DELETE /tasks/:id       # Delete             (session required)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Security headers
///
/// Protected routes authenticate via the `CurrentUser` extractor rather than
/// a layer, so the guard runs before any handler logic and unauthenticated
/// requests short-circuit with 401.
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    let router = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/logout", post(routes::auth::logout))
        .route("/auth-status", get(routes::auth::auth_status))
        .route(
            "/tasks",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route(
            "/tasks/:id",
            put(routes::tasks::update_task).delete(routes::tasks::delete_task),
        );

    // Configure CORS based on environment
    let cors = if state.config.api.cors_origins.contains(&"*".to_string()) {
        // Development mode: permissive CORS
        CorsLayer::permissive()
    } else {
        // Production mode: explicit origins; credentials must be allowed for
        // the session cookie to travel
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
            .max_age(std::time::Duration::from_secs(3600))
    };

    router
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .layer(SecurityHeadersLayer::new(state.config.api.production))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::Service as _;

    fn test_app() -> Router {
        build_router(AppState::new(test_config()))
    }

    #[tokio::test]
    async fn protected_route_without_session_is_unauthorized() {
        let mut app = test_app();

        let response = app
            .call(
                Request::builder()
                    .method("GET")
                    .uri("/tasks")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn mutating_route_without_session_is_unauthorized() {
        let mut app = test_app();

        let response = app
            .call(
                Request::builder()
                    .method("DELETE")
                    .uri(format!("/tasks/{}", uuid::Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn auth_status_without_session_reports_logged_out() {
        let mut app = test_app();

        let response = app
            .call(
                Request::builder()
                    .method("GET")
                    .uri("/auth-status")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["loggedIn"], false);
        assert!(json.get("user").is_none() || json["user"].is_null());
    }

    #[tokio::test]
    async fn tampered_session_cookie_is_rejected() {
        let mut app = test_app();

        // A cookie that was not signed by our key never reaches the session
        // lookup.
        let response = app
            .call(
                Request::builder()
                    .method("GET")
                    .uri("/tasks")
                    .header("cookie", "sid=deadbeefdeadbeef")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
