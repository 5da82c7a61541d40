use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use flowtalk_shared::AuthError;
use flowtalk_store::StoreError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Invalid content: {0}")]
    InvalidContent(String),

    #[error("Authentication required")]
    AuthRequired,

    #[error("Invalid credentials: {0}")]
    AuthInvalid(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Upstream dependency unavailable: {0}")]
    DependencyUnavailable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for ServerError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound => ServerError::NotFound("record not found".to_string()),
            StoreError::Conflict(msg) => ServerError::Conflict(msg),
            // Store unreachable: the caller should retry later rather than
            // treat this as a server bug.
            StoreError::Sqlite(e) => ServerError::DependencyUnavailable(e.to_string()),
            StoreError::Io(e) => ServerError::DependencyUnavailable(e.to_string()),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ServerError {
    fn from(e: AuthError) -> Self {
        ServerError::AuthInvalid(e.to_string())
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            ServerError::InvalidContent(_) => (StatusCode::BAD_REQUEST, self.to_string()),
            ServerError::AuthRequired => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::AuthInvalid(_) => (StatusCode::UNAUTHORIZED, self.to_string()),
            ServerError::Forbidden(_) => (StatusCode::FORBIDDEN, self.to_string()),
            ServerError::NotFound(_) => (StatusCode::NOT_FOUND, self.to_string()),
            ServerError::Conflict(_) => (StatusCode::CONFLICT, self.to_string()),
            ServerError::DependencyUnavailable(_) => (StatusCode::BAD_GATEWAY, self.to_string()),
            ServerError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            ),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, axum::Json(body)).into_response()
    }
}
