//! Public user profiles.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use flowtalk_shared::{Language, UserId};
use flowtalk_store::UserRecord;

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ServerError;

/// What other members may see of a user: no email, no timestamps.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    pub id: UserId,
    pub username: String,
    pub primary_language: Language,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl PublicProfile {
    pub fn from_record(record: &UserRecord) -> Self {
        Self {
            id: record.id,
            username: record.username.clone(),
            primary_language: record.primary_language,
            avatar: record.avatar.clone(),
            status: record.status.clone(),
        }
    }
}

pub async fn public_profile(
    State(state): State<AppState>,
    _auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<PublicProfile>, ServerError> {
    let id = id
        .parse::<Uuid>()
        .map(UserId)
        .map_err(|_| ServerError::NotFound("user not found".to_string()))?;

    let user = state.db.lock().await.get_user(id)?;
    Ok(Json(PublicProfile::from_record(&user)))
}
