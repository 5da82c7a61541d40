use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use flowtalk_shared::{MessageId, UserId};

use crate::database::{column_timestamp, column_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::{ReactionAction, ReactionRecord};

impl Database {
    /// Apply a reaction under the one-reaction-per-user invariant.
    ///
    /// Any existing reaction by this user on this message is removed first.
    /// If it carried the same emoji the call is a toggle-off; otherwise the
    /// new emoji is inserted in its place.
    pub fn set_reaction(
        &self,
        message_id: MessageId,
        user: UserId,
        emoji: &str,
    ) -> Result<ReactionAction> {
        let _ = self.get_message(message_id)?;

        let existing = self.reaction_by_user(message_id, user)?;

        if let Some(previous) = &existing {
            self.conn().execute(
                "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2",
                params![message_id.to_string(), user.to_string()],
            )?;
            if previous.emoji == emoji {
                return Ok(ReactionAction::Removed);
            }
        }

        self.conn().execute(
            "INSERT INTO reactions (id, message_id, user_id, emoji, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                Uuid::new_v4().to_string(),
                message_id.to_string(),
                user.to_string(),
                emoji,
                Utc::now().to_rfc3339(),
            ],
        )?;

        Ok(if existing.is_some() {
            ReactionAction::Replaced
        } else {
            ReactionAction::Added
        })
    }

    /// Explicit removal of a specific reaction.
    pub fn remove_reaction(
        &self,
        message_id: MessageId,
        user: UserId,
        emoji: &str,
    ) -> Result<bool> {
        let affected = self.conn().execute(
            "DELETE FROM reactions WHERE message_id = ?1 AND user_id = ?2 AND emoji = ?3",
            params![message_id.to_string(), user.to_string(), emoji],
        )?;
        Ok(affected > 0)
    }

    pub fn reactions_for_message(&self, message_id: MessageId) -> Result<Vec<ReactionRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, message_id, user_id, emoji, created_at
             FROM reactions WHERE message_id = ?1 ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map(params![message_id.to_string()], row_to_reaction)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    fn reaction_by_user(
        &self,
        message_id: MessageId,
        user: UserId,
    ) -> Result<Option<ReactionRecord>> {
        match self.conn().query_row(
            "SELECT id, message_id, user_id, emoji, created_at
             FROM reactions WHERE message_id = ?1 AND user_id = ?2",
            params![message_id.to_string(), user.to_string()],
            row_to_reaction,
        ) {
            Ok(reaction) => Ok(Some(reaction)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }
}

fn row_to_reaction(row: &rusqlite::Row<'_>) -> rusqlite::Result<ReactionRecord> {
    let id_str: String = row.get(0)?;
    let message_str: String = row.get(1)?;
    let user_str: String = row.get(2)?;
    let emoji: String = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(ReactionRecord {
        id: column_uuid(0, &id_str)?,
        message_id: MessageId(column_uuid(1, &message_str)?),
        user_id: UserId(column_uuid(2, &user_str)?),
        emoji,
        created_at: column_timestamp(4, &created_str)?,
    })
}
