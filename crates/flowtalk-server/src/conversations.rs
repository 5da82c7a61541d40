//! Direct-message thread endpoints.

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flowtalk_shared::{ThreadId, UserId};
use flowtalk_store::{StoreError, ThreadRecord};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::users::PublicProfile;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationView {
    pub id: ThreadId,
    /// The other participant, resolved for the caller.
    pub participant: PublicProfile,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationView>,
}

pub async fn list_conversations(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<ConversationsResponse>, ServerError> {
    let db = state.db.lock().await;

    let mut conversations = Vec::new();
    for thread in db.list_threads_for_user(auth.user_id)? {
        let other = db.get_user(thread.other_participant(auth.user_id))?;
        conversations.push(view(&thread, PublicProfile::from_record(&other)));
    }

    Ok(Json(ConversationsResponse { conversations }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenConversationRequest {
    /// A username, or a user id for clients that already resolved one.
    pub target_username: String,
}

#[derive(Debug, Serialize)]
pub struct OpenConversationResponse {
    pub conversation: ConversationView,
}

/// Create the thread with the target user, or return the existing one (there
/// is at most one per pair).
pub async fn open_conversation(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<OpenConversationRequest>,
) -> Result<Json<OpenConversationResponse>, ServerError> {
    let db = state.db.lock().await;

    let target = match db.get_user_by_username(req.target_username.trim()) {
        Ok(user) => user,
        Err(StoreError::NotFound) => {
            // Fall back to treating the value as a user id.
            let id = req
                .target_username
                .trim()
                .parse::<Uuid>()
                .map(UserId)
                .map_err(|_| ServerError::NotFound("user not found".to_string()))?;
            db.get_user(id)?
        }
        Err(e) => return Err(e.into()),
    };

    if target.id == auth.user_id {
        return Err(ServerError::InvalidContent(
            "cannot open a conversation with yourself".to_string(),
        ));
    }

    let thread = db.get_or_create_thread(auth.user_id, target.id)?;

    Ok(Json(OpenConversationResponse {
        conversation: view(&thread, PublicProfile::from_record(&target)),
    }))
}

fn view(thread: &ThreadRecord, participant: PublicProfile) -> ConversationView {
    ConversationView {
        id: thread.id,
        participant,
        created_at: thread.created_at,
        last_message_at: thread.last_message_at,
    }
}
