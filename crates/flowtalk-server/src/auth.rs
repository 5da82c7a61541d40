//! Authentication: registration, login, and the request extractor.

use axum::extract::{FromRequestParts, State};
use axum::http::header::SET_COOKIE;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum::response::{AppendHeaders, IntoResponse};
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};

use flowtalk_shared::auth::{hash_password, verify_password};
use flowtalk_shared::constants::AUTH_COOKIE;
use flowtalk_shared::{Language, UserId};
use flowtalk_store::UserRecord;

use crate::api::AppState;
use crate::error::ServerError;

/// The authenticated caller, extracted from the bearer header or cookie.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: UserId,
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(ServerError::AuthRequired)?;
        let claims = state.token_key.verify(&token)?;
        Ok(AuthUser {
            user_id: claims.user_id,
            username: claims.username,
        })
    }
}

/// Pull the session token from `Authorization: Bearer …` or the auth cookie.
pub fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    if let Some(auth) = headers.get("authorization").and_then(|v| v.to_str().ok()) {
        if let Some(token) = auth.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get("cookie").and_then(|v| v.to_str().ok())?;
    for pair in cookies.split(';') {
        if let Some((name, value)) = pair.trim().split_once('=') {
            if name == AUTH_COOKIE {
                return Some(value.to_string());
            }
        }
    }
    None
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub username: String,
    pub primary_language: Language,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdateRequest {
    pub primary_language: Option<Language>,
    pub avatar: Option<String>,
    pub status: Option<String>,
}

/// The caller's own account as returned by the auth endpoints.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub id: UserId,
    pub email: String,
    pub username: String,
    pub primary_language: Language,
    pub avatar: Option<String>,
    pub status: Option<String>,
}

impl UserView {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            email: record.email.clone(),
            username: record.username.clone(),
            primary_language: record.primary_language,
            avatar: record.avatar.clone(),
            status: record.status.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub user: UserView,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let username = req.username.trim();
    let email = req.email.trim().to_lowercase();

    if username.is_empty() || !username.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(ServerError::InvalidContent(
            "username must be non-empty and alphanumeric".to_string(),
        ));
    }
    if !email.contains('@') {
        return Err(ServerError::InvalidContent("invalid email".to_string()));
    }
    if req.password.chars().count() < 8 {
        return Err(ServerError::InvalidContent(
            "password must be at least 8 characters".to_string(),
        ));
    }

    let user = UserRecord {
        id: UserId::new(),
        email,
        username: username.to_string(),
        password_hash: hash_password(&req.password),
        primary_language: req.primary_language,
        avatar: None,
        status: None,
        created_at: Utc::now(),
    };

    state.db.lock().await.create_user(&user)?;
    tracing::info!(id = %user.id, username = %user.username, "user registered");

    let token = state.token_key.issue(user.id, &user.username);
    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie(&token))]),
        Json(UserResponse {
            user: UserView::from_record(&user),
        }),
    ))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServerError> {
    let email = req.email.trim().to_lowercase();

    let user = match state.db.lock().await.get_user_by_email(&email) {
        Ok(user) => user,
        Err(flowtalk_store::StoreError::NotFound) => {
            return Err(ServerError::AuthInvalid("unknown email or password".to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    if !verify_password(&req.password, &user.password_hash) {
        return Err(ServerError::AuthInvalid(
            "unknown email or password".to_string(),
        ));
    }

    let token = state.token_key.issue(user.id, &user.username);
    Ok((
        AppendHeaders([(SET_COOKIE, session_cookie(&token))]),
        Json(UserResponse {
            user: UserView::from_record(&user),
        }),
    ))
}

/// Tokens are stateless MACs, so logout just clears the cookie.
pub async fn logout() -> impl IntoResponse {
    (
        AppendHeaders([(SET_COOKIE, expired_cookie())]),
        Json(serde_json::json!({})),
    )
}

pub async fn me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<UserResponse>, ServerError> {
    let user = state.db.lock().await.get_user(auth.user_id)?;
    Ok(Json(UserResponse {
        user: UserView::from_record(&user),
    }))
}

pub async fn update_profile(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ProfileUpdateRequest>,
) -> Result<Json<UserResponse>, ServerError> {
    let db = state.db.lock().await;
    db.update_profile(
        auth.user_id,
        req.primary_language,
        req.avatar.as_deref(),
        req.status.as_deref(),
    )?;

    let user = db.get_user(auth.user_id)?;
    Ok(Json(UserResponse {
        user: UserView::from_record(&user),
    }))
}

fn session_cookie(token: &str) -> String {
    // 7 days, matching the token expiry.
    format!("{AUTH_COOKIE}={token}; HttpOnly; Path=/; Max-Age=604800; SameSite=Lax")
}

fn expired_cookie() -> String {
    format!("{AUTH_COOKIE}=; HttpOnly; Path=/; Max-Age=0; SameSite=Lax")
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", HeaderValue::from_static("Bearer abc.def"));
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn token_from_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "cookie",
            HeaderValue::from_static("theme=dark; ft_token=abc.def; other=1"),
        );
        assert_eq!(token_from_headers(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn missing_token_is_none() {
        assert_eq!(token_from_headers(&HeaderMap::new()), None);
    }

    #[test]
    fn session_cookie_is_http_only() {
        let cookie = session_cookie("tok");
        assert!(cookie.starts_with("ft_token=tok"));
        assert!(cookie.contains("HttpOnly"));
    }
}
