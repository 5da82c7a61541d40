use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use flowtalk_shared::{ChannelId, CommunityId, Language, MessageId, ThreadId, UserId};

/// Message lifecycle. Transitions only ever move forward:
/// `sent -> translating -> translated` or `sent -> translating -> failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Sent,
    Translating,
    Translated,
    Failed,
}

impl MessageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageStatus::Sent => "sent",
            MessageStatus::Translating => "translating",
            MessageStatus::Translated => "translated",
            MessageStatus::Failed => "failed",
        }
    }

    pub fn parse(value: &str) -> Option<MessageStatus> {
        match value {
            "sent" => Some(MessageStatus::Sent),
            "translating" => Some(MessageStatus::Translating),
            "translated" => Some(MessageStatus::Translated),
            "failed" => Some(MessageStatus::Failed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserRecord {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub primary_language: Language,
    pub avatar: Option<String>,
    pub status: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CommunityRecord {
    pub id: CommunityId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChannelRecord {
    pub id: ChannelId,
    pub community_id: CommunityId,
    pub name: String,
    pub description: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ThreadRecord {
    pub id: ThreadId,
    /// Participants sorted by id, so (a, b) and (b, a) are the same thread.
    pub user_a: UserId,
    pub user_b: UserId,
    pub created_at: DateTime<Utc>,
    pub last_message_at: DateTime<Utc>,
}

impl ThreadRecord {
    pub fn participants(&self) -> [UserId; 2] {
        [self.user_a, self.user_b]
    }

    pub fn other_participant(&self, user: UserId) -> UserId {
        if self.user_a == user {
            self.user_b
        } else {
            self.user_a
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: MessageId,
    pub channel_id: ChannelId,
    pub sender_id: UserId,
    /// Original text; never rewritten after creation.
    pub content: String,
    pub source_language: Language,
    pub source_romanized: bool,
    pub status: MessageStatus,
    pub timestamp: DateTime<Utc>,
    pub attachment: Option<String>,
    /// Accumulated translations, ordered by insertion.
    pub translations: Vec<TranslationRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TranslationRecord {
    pub target_language: Language,
    pub translated_content: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReactionRecord {
    pub id: Uuid,
    pub message_id: MessageId,
    pub user_id: UserId,
    pub emoji: String,
    pub created_at: DateTime<Utc>,
}

/// Outcome of [`crate::Database::set_reaction`].
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Added,
    Replaced,
    Removed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GlossaryCategory {
    Technical,
    Brand,
    ProperNoun,
    Custom,
}

impl GlossaryCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            GlossaryCategory::Technical => "technical",
            GlossaryCategory::Brand => "brand",
            GlossaryCategory::ProperNoun => "proper_noun",
            GlossaryCategory::Custom => "custom",
        }
    }

    pub fn parse(value: &str) -> Option<GlossaryCategory> {
        match value {
            "technical" => Some(GlossaryCategory::Technical),
            "brand" => Some(GlossaryCategory::Brand),
            "proper_noun" => Some(GlossaryCategory::ProperNoun),
            "custom" => Some(GlossaryCategory::Custom),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GlossaryTermRecord {
    pub scope: String,
    pub term: String,
    pub category: GlossaryCategory,
    pub preserve_case: bool,
}
