//! Message endpoints: history, posting, clearing, and reactions.

use axum::extract::{Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flowtalk_shared::{ChannelId, Language, MessageId, ThreadId, UserId};
use flowtalk_store::{
    MessageRecord, MessageStatus, ReactionAction, ReactionRecord, StoreError, TranslationRecord,
};

use crate::api::AppState;
use crate::auth::AuthUser;
use crate::error::ServerError;
use crate::fanout;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TranslationView {
    pub target_language: Language,
    pub translated_content: String,
    pub created_at: DateTime<Utc>,
}

impl TranslationView {
    fn from_record(record: &TranslationRecord) -> Self {
        Self {
            target_language: record.target_language,
            translated_content: record.translated_content.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionView {
    pub user_id: UserId,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

impl ReactionView {
    fn from_record(record: &ReactionRecord) -> Self {
        Self {
            user_id: record.user_id,
            emoji: record.emoji.clone(),
            created_at: record.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub sender_id: UserId,
    pub content: String,
    pub source_language: Language,
    pub source_romanized: bool,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<String>,
    pub translations: Vec<TranslationView>,
    pub reactions: Vec<ReactionView>,
}

impl MessageView {
    pub fn from_record(record: &MessageRecord, reactions: &[ReactionRecord]) -> Self {
        Self {
            id: record.id,
            channel_id: record.channel_id,
            sender_id: record.sender_id,
            content: record.content.clone(),
            source_language: record.source_language,
            source_romanized: record.source_romanized,
            status: record.status,
            timestamp: record.timestamp,
            attachment: record.attachment.clone(),
            translations: record
                .translations
                .iter()
                .map(TranslationView::from_record)
                .collect(),
            reactions: reactions.iter().map(ReactionView::from_record).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryQuery {
    pub channel_id: String,
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub messages: Vec<MessageView>,
}

pub async fn channel_history(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ServerError> {
    let channel = parse_channel_id(&query.channel_id)?;
    let limit = query.limit.unwrap_or(50);

    let db = state.db.lock().await;
    require_channel_member(&db, channel, auth.user_id)?;

    let viewer_language = db.get_user(auth.user_id)?.primary_language;
    let records = db.channel_messages(channel, limit, auth.user_id, viewer_language)?;

    let mut messages = Vec::with_capacity(records.len());
    for record in &records {
        let reactions = db.reactions_for_message(record.id)?;
        messages.push(MessageView::from_record(record, &reactions));
    }

    Ok(Json(HistoryResponse { messages }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub channel_id: String,
    pub content: String,
    pub attachment: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PostMessageResponse {
    pub message: MessageView,
}

pub async fn post_message(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<PostMessageRequest>,
) -> Result<Json<PostMessageResponse>, ServerError> {
    let channel = parse_channel_id(&req.channel_id)?;

    let violations = state.pipeline.parser().validate(&req.content);
    if !violations.is_empty() {
        let joined = violations
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ServerError::InvalidContent(joined));
    }

    let detection = state.pipeline.detect_source(&req.content);

    let message = MessageRecord {
        id: MessageId::new(),
        channel_id: channel,
        sender_id: auth.user_id,
        content: req.content,
        source_language: detection.language,
        source_romanized: detection.is_romanized,
        status: MessageStatus::Sent,
        timestamp: Utc::now(),
        attachment: req.attachment,
        translations: Vec::new(),
    };

    {
        let db = state.db.lock().await;
        require_channel_member(&db, channel, auth.user_id)?;
        db.create_message(&message)?;

        // Bump DM thread activity when the channel is a conversation.
        if db.get_channel(channel).is_err() {
            let _ = db.touch_thread_last_message(ThreadId(channel.0), message.timestamp);
        }
    }

    tracing::info!(
        id = %message.id,
        channel = %channel,
        language = detection.language.code(),
        romanized = detection.is_romanized,
        confidence = detection.confidence,
        "message stored, queueing translation"
    );

    fanout::spawn_translation(state.clone(), message.id);

    Ok(Json(PostMessageResponse {
        message: MessageView::from_record(&message, &[]),
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearQuery {
    pub channel_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearResponse {
    pub deleted_count: usize,
}

pub async fn clear_channel(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<ClearQuery>,
) -> Result<Json<ClearResponse>, ServerError> {
    let channel = parse_channel_id(&query.channel_id)?;

    let db = state.db.lock().await;
    require_channel_member(&db, channel, auth.user_id)?;

    let deleted_count = db.delete_channel_messages(channel)?;
    tracing::info!(channel = %channel, deleted = deleted_count, "channel cleared");

    Ok(Json(ClearResponse { deleted_count }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionRequest {
    pub message_id: String,
    pub emoji: String,
}

#[derive(Debug, Serialize)]
pub struct ReactionResponse {
    pub action: ReactionAction,
}

pub async fn set_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(req): Json<ReactionRequest>,
) -> Result<Json<ReactionResponse>, ServerError> {
    let message_id = parse_message_id(&req.message_id)?;
    if req.emoji.trim().is_empty() {
        return Err(ServerError::InvalidContent("emoji is required".to_string()));
    }

    let db = state.db.lock().await;
    let message = db.get_message(message_id)?;
    require_channel_member(&db, message.channel_id, auth.user_id)?;

    let action = db.set_reaction(message_id, auth.user_id, &req.emoji)?;
    Ok(Json(ReactionResponse { action }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveReactionQuery {
    pub message_id: String,
    pub emoji: String,
}

pub async fn remove_reaction(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(query): Query<RemoveReactionQuery>,
) -> Result<Json<ReactionResponse>, ServerError> {
    let message_id = parse_message_id(&query.message_id)?;

    let db = state.db.lock().await;
    let message = db.get_message(message_id)?;
    require_channel_member(&db, message.channel_id, auth.user_id)?;

    db.remove_reaction(message_id, auth.user_id, &query.emoji)?;

    Ok(Json(ReactionResponse {
        action: ReactionAction::Removed,
    }))
}

pub fn parse_channel_id(value: &str) -> Result<ChannelId, ServerError> {
    value
        .parse::<Uuid>()
        .map(ChannelId)
        .map_err(|_| ServerError::InvalidContent(format!("invalid channel id '{value}'")))
}

fn parse_message_id(value: &str) -> Result<MessageId, ServerError> {
    value
        .parse::<Uuid>()
        .map(MessageId)
        .map_err(|_| ServerError::InvalidContent(format!("invalid message id '{value}'")))
}

/// Channel access: community membership, or being a participant of the DM
/// thread the channel id refers to.
pub fn require_channel_member(
    db: &flowtalk_store::Database,
    channel: ChannelId,
    user: UserId,
) -> Result<(), ServerError> {
    match db.is_channel_member(channel, user) {
        Ok(true) => Ok(()),
        Ok(false) => Err(ServerError::Forbidden(
            "not a member of this channel".to_string(),
        )),
        Err(StoreError::NotFound) => Err(ServerError::NotFound("channel not found".to_string())),
        Err(e) => Err(e.into()),
    }
}
