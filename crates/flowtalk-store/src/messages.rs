use rusqlite::params;

use flowtalk_shared::constants::MAX_PAGE_SIZE;
use flowtalk_shared::{ChannelId, Language, MessageId, UserId};

use crate::database::{column_language, column_timestamp, column_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::{MessageRecord, MessageStatus, TranslationRecord};

/// The allowed status edges: `sent -> translating -> {translated, failed}`.
const ALLOWED_TRANSITIONS: [(MessageStatus, MessageStatus); 3] = [
    (MessageStatus::Sent, MessageStatus::Translating),
    (MessageStatus::Translating, MessageStatus::Translated),
    (MessageStatus::Translating, MessageStatus::Failed),
];

impl Database {
    pub fn create_message(&self, message: &MessageRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages
                 (id, channel_id, sender_id, content, source_language, source_romanized,
                  status, timestamp, attachment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                message.id.to_string(),
                message.channel_id.to_string(),
                message.sender_id.to_string(),
                message.content,
                message.source_language.code(),
                message.source_romanized as i64,
                message.status.as_str(),
                message.timestamp.to_rfc3339(),
                message.attachment,
            ],
        )?;
        Ok(())
    }

    pub fn get_message(&self, id: MessageId) -> Result<MessageRecord> {
        let mut message = self
            .conn()
            .query_row(
                "SELECT id, channel_id, sender_id, content, source_language, source_romanized,
                        status, timestamp, attachment
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })?;
        message.translations = self.translations_for_message(id, None)?;
        Ok(message)
    }

    /// Advance the message status, conditional on the current value.
    ///
    /// The UPDATE is guarded by the expected source state, which gives the
    /// compare-and-swap the orchestrator relies on: of two racing callers only
    /// one observes an affected row, the other gets [`StoreError::Conflict`].
    pub fn update_status(
        &self,
        id: MessageId,
        from: MessageStatus,
        to: MessageStatus,
    ) -> Result<()> {
        if !ALLOWED_TRANSITIONS.contains(&(from, to)) {
            return Err(StoreError::Conflict(format!(
                "illegal status transition {} -> {}",
                from.as_str(),
                to.as_str()
            )));
        }

        let affected = self.conn().execute(
            "UPDATE messages SET status = ?1 WHERE id = ?2 AND status = ?3",
            params![to.as_str(), id.to_string(), from.as_str()],
        )?;

        if affected == 0 {
            // Distinguish a missing message from a lost race.
            let _ = self.get_message(id)?;
            return Err(StoreError::Conflict(format!(
                "message {id} is not in status {}",
                from.as_str()
            )));
        }
        Ok(())
    }

    /// Append a translation if none exists for this target language yet.
    ///
    /// Returns `true` when the row was inserted, `false` when another writer
    /// got there first (the later value is silently dropped).
    pub fn append_translation(
        &self,
        id: MessageId,
        translation: &TranslationRecord,
    ) -> Result<bool> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO translations
                 (message_id, target_language, translated_content, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                id.to_string(),
                translation.target_language.code(),
                translation.translated_content,
                translation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(inserted > 0)
    }

    /// The most recent `min(limit, 100)` messages of a channel in timestamp
    /// order (ties broken by insertion order).
    ///
    /// Translations are filtered down to `viewer_language` to save bandwidth,
    /// except on the viewer's own messages, which carry the full set.
    pub fn channel_messages(
        &self,
        channel: ChannelId,
        limit: u32,
        viewer: UserId,
        viewer_language: Language,
    ) -> Result<Vec<MessageRecord>> {
        let limit = limit.min(MAX_PAGE_SIZE);

        let mut stmt = self.conn().prepare(
            "SELECT id, channel_id, sender_id, content, source_language, source_romanized,
                    status, timestamp, attachment
             FROM messages
             WHERE channel_id = ?1
             ORDER BY timestamp DESC, rowid DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(params![channel.to_string(), limit], row_to_message)?;

        let mut messages = rows
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)?;
        messages.reverse();

        for message in &mut messages {
            let filter = if message.sender_id == viewer {
                None
            } else {
                Some(viewer_language)
            };
            message.translations = self.translations_for_message(message.id, filter)?;
        }
        Ok(messages)
    }

    /// Remove every message in a channel ("clear chat"). Translations and
    /// reactions go with them via ON DELETE CASCADE.
    pub fn delete_channel_messages(&self, channel: ChannelId) -> Result<usize> {
        let deleted = self.conn().execute(
            "DELETE FROM messages WHERE channel_id = ?1",
            params![channel.to_string()],
        )?;
        Ok(deleted)
    }

    fn translations_for_message(
        &self,
        id: MessageId,
        only: Option<Language>,
    ) -> Result<Vec<TranslationRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT target_language, translated_content, created_at
             FROM translations WHERE message_id = ?1 ORDER BY rowid ASC",
        )?;
        let rows = stmt.query_map(params![id.to_string()], |row| {
            let lang_str: String = row.get(0)?;
            let translated_content: String = row.get(1)?;
            let created_str: String = row.get(2)?;
            Ok(TranslationRecord {
                target_language: column_language(0, &lang_str)?,
                translated_content,
                created_at: column_timestamp(2, &created_str)?,
            })
        })?;

        let mut translations = Vec::new();
        for row in rows {
            let record = row?;
            if only.map_or(true, |lang| record.target_language == lang) {
                translations.push(record);
            }
        }
        Ok(translations)
    }
}

fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRecord> {
    let id_str: String = row.get(0)?;
    let channel_str: String = row.get(1)?;
    let sender_str: String = row.get(2)?;
    let content: String = row.get(3)?;
    let lang_str: String = row.get(4)?;
    let romanized: i64 = row.get(5)?;
    let status_str: String = row.get(6)?;
    let ts_str: String = row.get(7)?;
    let attachment: Option<String> = row.get(8)?;

    let status = MessageStatus::parse(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("unknown message status '{status_str}'").into(),
        )
    })?;

    Ok(MessageRecord {
        id: MessageId(column_uuid(0, &id_str)?),
        channel_id: ChannelId(column_uuid(1, &channel_str)?),
        sender_id: UserId(column_uuid(2, &sender_str)?),
        content,
        source_language: column_language(4, &lang_str)?,
        source_romanized: romanized != 0,
        status,
        timestamp: column_timestamp(7, &ts_str)?,
        attachment,
        translations: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn sample_message(channel: ChannelId, sender: UserId, content: &str) -> MessageRecord {
        MessageRecord {
            id: MessageId::new(),
            channel_id: channel,
            sender_id: sender,
            content: content.to_string(),
            source_language: Language::En,
            source_romanized: false,
            status: MessageStatus::Sent,
            timestamp: Utc::now(),
            attachment: None,
            translations: Vec::new(),
        }
    }

    fn translation(lang: Language, text: &str) -> TranslationRecord {
        TranslationRecord {
            target_language: lang,
            translated_content: text.to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_get_round_trip() {
        let (_dir, db) = test_db();
        let message = sample_message(ChannelId::new(), UserId::new(), "Hello world");
        db.create_message(&message).unwrap();

        let loaded = db.get_message(message.id).unwrap();
        assert_eq!(loaded.content, "Hello world");
        assert_eq!(loaded.status, MessageStatus::Sent);
        assert!(loaded.translations.is_empty());
    }

    #[test]
    fn status_walks_the_happy_path() {
        let (_dir, db) = test_db();
        let message = sample_message(ChannelId::new(), UserId::new(), "hi");
        db.create_message(&message).unwrap();

        db.update_status(message.id, MessageStatus::Sent, MessageStatus::Translating)
            .unwrap();
        db.update_status(
            message.id,
            MessageStatus::Translating,
            MessageStatus::Translated,
        )
        .unwrap();

        assert_eq!(
            db.get_message(message.id).unwrap().status,
            MessageStatus::Translated
        );
    }

    #[test]
    fn status_cas_rejects_lost_race() {
        let (_dir, db) = test_db();
        let message = sample_message(ChannelId::new(), UserId::new(), "hi");
        db.create_message(&message).unwrap();

        db.update_status(message.id, MessageStatus::Sent, MessageStatus::Translating)
            .unwrap();

        // A second caller still expecting `sent` loses.
        assert!(matches!(
            db.update_status(message.id, MessageStatus::Sent, MessageStatus::Translating),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn status_rejects_edges_outside_the_graph() {
        let (_dir, db) = test_db();
        let message = sample_message(ChannelId::new(), UserId::new(), "hi");
        db.create_message(&message).unwrap();

        assert!(matches!(
            db.update_status(message.id, MessageStatus::Sent, MessageStatus::Translated),
            Err(StoreError::Conflict(_))
        ));
        assert!(matches!(
            db.update_status(message.id, MessageStatus::Translated, MessageStatus::Sent),
            Err(StoreError::Conflict(_))
        ));
    }

    #[test]
    fn status_update_on_missing_message_is_not_found() {
        let (_dir, db) = test_db();
        assert!(matches!(
            db.update_status(
                MessageId::new(),
                MessageStatus::Sent,
                MessageStatus::Translating
            ),
            Err(StoreError::NotFound)
        ));
    }

    #[test]
    fn append_translation_is_idempotent() {
        let (_dir, db) = test_db();
        let message = sample_message(ChannelId::new(), UserId::new(), "Hello");
        db.create_message(&message).unwrap();

        assert!(db
            .append_translation(message.id, &translation(Language::Es, "Hola"))
            .unwrap());
        assert!(!db
            .append_translation(message.id, &translation(Language::Es, "Hola otra vez"))
            .unwrap());

        let loaded = db.get_message(message.id).unwrap();
        assert_eq!(loaded.translations.len(), 1);
        assert_eq!(loaded.translations[0].translated_content, "Hola");
    }

    #[test]
    fn channel_messages_filters_to_viewer_language() {
        let (_dir, db) = test_db();
        let channel = ChannelId::new();
        let sender = UserId::new();
        let viewer = UserId::new();

        let message = sample_message(channel, sender, "Hello");
        db.create_message(&message).unwrap();
        db.append_translation(message.id, &translation(Language::Es, "Hola"))
            .unwrap();
        db.append_translation(message.id, &translation(Language::Fr, "Bonjour"))
            .unwrap();

        let seen = db
            .channel_messages(channel, 50, viewer, Language::Es)
            .unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].translations.len(), 1);
        assert_eq!(seen[0].translations[0].target_language, Language::Es);

        // The sender gets the full set.
        let own = db
            .channel_messages(channel, 50, sender, Language::Es)
            .unwrap();
        assert_eq!(own[0].translations.len(), 2);
    }

    #[test]
    fn channel_messages_ordering_and_limit() {
        let (_dir, db) = test_db();
        let channel = ChannelId::new();
        let sender = UserId::new();
        let base = Utc::now();

        for i in 0..5 {
            let mut message = sample_message(channel, sender, &format!("m{i}"));
            message.timestamp = base + Duration::seconds(i);
            db.create_message(&message).unwrap();
        }

        let seen = db
            .channel_messages(channel, 3, sender, Language::En)
            .unwrap();
        let contents: Vec<_> = seen.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[test]
    fn limit_is_capped_at_page_size() {
        let (_dir, db) = test_db();
        let channel = ChannelId::new();
        let sender = UserId::new();
        let base = Utc::now();

        for i in 0..110 {
            let mut message = sample_message(channel, sender, &format!("m{i}"));
            message.timestamp = base + Duration::milliseconds(i);
            db.create_message(&message).unwrap();
        }

        let seen = db
            .channel_messages(channel, 500, sender, Language::En)
            .unwrap();
        assert_eq!(seen.len(), MAX_PAGE_SIZE as usize);
    }

    #[test]
    fn equal_timestamps_keep_insertion_order() {
        let (_dir, db) = test_db();
        let channel = ChannelId::new();
        let sender = UserId::new();
        let at = Utc::now();

        for name in ["first", "second", "third"] {
            let mut message = sample_message(channel, sender, name);
            message.timestamp = at;
            db.create_message(&message).unwrap();
        }

        let seen = db
            .channel_messages(channel, 10, sender, Language::En)
            .unwrap();
        let contents: Vec<_> = seen.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second", "third"]);
    }

    #[test]
    fn delete_channel_messages_cascades() {
        let (_dir, db) = test_db();
        let channel = ChannelId::new();
        let sender = UserId::new();

        let message = sample_message(channel, sender, "Hello");
        db.create_message(&message).unwrap();
        db.append_translation(message.id, &translation(Language::Es, "Hola"))
            .unwrap();

        assert_eq!(db.delete_channel_messages(channel).unwrap(), 1);
        assert!(matches!(db.get_message(message.id), Err(StoreError::NotFound)));
    }
}
