//! Password login and session cookies
//!
//! A configured password gates the snapshot API. A successful login issues a
//! random session token carried in an HttpOnly cookie; the middleware checks
//! it on every gated request until it expires.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::AuthConfig;
use crate::state::AppState;

/// Name of the session cookie
pub const SESSION_COOKIE: &str = "stockpile_session";

/// Issued session tokens and their expiry
pub struct SessionStore {
    ttl: Duration,
    sessions: RwLock<HashMap<String, DateTime<Utc>>>,
}

impl SessionStore {
    pub fn new(ttl_secs: u64) -> Self {
        Self {
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
            sessions: RwLock::new(HashMap::new()),
        }
    }

    pub fn ttl_secs(&self) -> i64 {
        self.ttl.num_seconds()
    }

    /// Issue a fresh token, dropping any that have expired
    pub async fn issue(&self) -> String {
        let now = Utc::now();
        let token = Uuid::new_v4().simple().to_string();

        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, expires_at| *expires_at > now);
        let expires_at = now.checked_add_signed(self.ttl).unwrap_or(DateTime::<Utc>::MAX_UTC);
        sessions.insert(token.clone(), expires_at);
        token
    }

    /// Check if a token exists and has not expired
    pub async fn is_valid(&self, token: &str) -> bool {
        let now = Utc::now();
        self.sessions
            .read()
            .await
            .get(token)
            .is_some_and(|expires_at| *expires_at > now)
    }
}

/// Authentication state
pub struct AuthState {
    password: Option<String>,
    pub sessions: SessionStore,
}

impl AuthState {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            password: config.password.clone(),
            sessions: SessionStore::new(config.session_ttl_secs),
        }
    }

    /// Check if authentication is required
    pub fn is_required(&self) -> bool {
        self.password.is_some()
    }

    pub fn check_password(&self, candidate: &str) -> bool {
        self.password.as_deref().is_some_and(|p| p == candidate)
    }
}

/// `Set-Cookie` value for a session token
pub fn session_cookie(token: &str, max_age_secs: i64) -> String {
    format!(
        "{}={}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        SESSION_COOKIE, token, max_age_secs
    )
}

/// Pull the session token out of the `Cookie` headers
pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value)
}

/// Error response for authentication failures
#[derive(Serialize)]
struct AuthError {
    error: String,
}

fn unauthorized(message: &str) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(AuthError {
            error: message.to_string(),
        }),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub password: String,
}

/// Exchange the password for a session cookie
pub async fn login(State(state): State<Arc<AppState>>, Json(req): Json<LoginRequest>) -> Response {
    let auth = &state.auth;
    if !auth.is_required() {
        return Json(serde_json::json!({ "authenticated": true })).into_response();
    }

    if !auth.check_password(&req.password) {
        warn!("Rejected login with wrong password");
        return unauthorized("Wrong password");
    }

    let token = auth.sessions.issue().await;
    info!("Issued viewer session");
    (
        [(header::SET_COOKIE, session_cookie(&token, auth.sessions.ttl_secs()))],
        Json(serde_json::json!({ "authenticated": true })),
    )
        .into_response()
}

/// Authentication middleware
///
/// Passes through all requests when no password is configured.
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.auth.is_required() {
        return next.run(request).await;
    }

    let Some(token) = session_token(request.headers()) else {
        debug!(path = %request.uri().path(), "Missing session cookie");
        return unauthorized("Login required");
    };

    if !state.auth.sessions.is_valid(token).await {
        warn!("Invalid or expired session");
        return unauthorized("Session expired");
    }

    next.run(request).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[tokio::test]
    async fn test_issued_session_is_valid() {
        let store = SessionStore::new(3600);
        let token = store.issue().await;
        assert!(store.is_valid(&token).await);
        assert!(!store.is_valid("invalid").await);
    }

    #[tokio::test]
    async fn test_expired_session() {
        let store = SessionStore::new(0);
        let token = store.issue().await;
        assert!(!store.is_valid(&token).await);
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::new(3600);
        assert_ne!(store.issue().await, store.issue().await);
    }

    #[test]
    fn test_password_check() {
        let open = AuthState::new(&AuthConfig::default());
        assert!(!open.is_required());
        assert!(!open.check_password(""));

        let gated = AuthState::new(&AuthConfig {
            password: Some("hunter2".to_string()),
            session_ttl_secs: 60,
        });
        assert!(gated.is_required());
        assert!(gated.check_password("hunter2"));
        assert!(!gated.check_password("hunter3"));
    }

    #[test]
    fn test_cookie_attributes() {
        let cookie = session_cookie("abc", 604_800);
        assert!(cookie.starts_with("stockpile_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=Strict"));
        assert!(cookie.contains("Max-Age=604800"));
    }

    #[test]
    fn test_session_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);

        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; stockpile_session=abc123; other=1"),
        );
        assert_eq!(session_token(&headers), Some("abc123"));
    }
}
