use chrono::Utc;
use rusqlite::params;

use flowtalk_shared::{ChannelId, CommunityId, Language, UserId};

use crate::database::{column_timestamp, column_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::{ChannelRecord, CommunityRecord};

impl Database {
    pub fn create_community(&self, community: &CommunityRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO communities (id, name, description, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                community.id.to_string(),
                community.name,
                community.description,
                community.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_community(&self, id: CommunityId) -> Result<CommunityRecord> {
        self.conn()
            .query_row(
                "SELECT id, name, description, created_at FROM communities WHERE id = ?1",
                params![id.to_string()],
                row_to_community,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    pub fn list_all_communities(&self) -> Result<Vec<CommunityRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, name, description, created_at FROM communities ORDER BY created_at ASC",
        )?;
        let rows = stmt.query_map([], row_to_community)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn list_communities_for_user(&self, user: UserId) -> Result<Vec<CommunityRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT c.id, c.name, c.description, c.created_at
             FROM communities c
             JOIN community_members m ON m.community_id = c.id
             WHERE m.user_id = ?1
             ORDER BY c.created_at ASC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], row_to_community)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Add a user to a community. Joining twice is a no-op.
    pub fn add_member(&self, community: CommunityId, user: UserId) -> Result<()> {
        self.conn().execute(
            "INSERT OR IGNORE INTO community_members (community_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            params![
                community.to_string(),
                user.to_string(),
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    pub fn is_member(&self, community: CommunityId, user: UserId) -> Result<bool> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM community_members WHERE community_id = ?1 AND user_id = ?2",
            params![community.to_string(), user.to_string()],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    pub fn create_channel(&self, channel: &ChannelRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO channels (id, community_id, name, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                channel.id.to_string(),
                channel.community_id.to_string(),
                channel.name,
                channel.description,
                channel.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    pub fn get_channel(&self, id: ChannelId) -> Result<ChannelRecord> {
        self.conn()
            .query_row(
                "SELECT id, community_id, name, description, created_at
                 FROM channels WHERE id = ?1",
                params![id.to_string()],
                row_to_channel,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    pub fn list_channels_for_community(&self, community: CommunityId) -> Result<Vec<ChannelRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, community_id, name, description, created_at
             FROM channels WHERE community_id = ?1 ORDER BY name ASC",
        )?;
        let rows = stmt.query_map(params![community.to_string()], row_to_channel)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn list_channels_for_user(&self, user: UserId) -> Result<Vec<ChannelRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT ch.id, ch.community_id, ch.name, ch.description, ch.created_at
             FROM channels ch
             JOIN community_members m ON m.community_id = ch.community_id
             WHERE m.user_id = ?1
             ORDER BY ch.created_at ASC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], row_to_channel)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    /// Whether `user` may read and post into `channel`.
    ///
    /// A channel id refers either to a community channel (membership via the
    /// community) or to a DM thread (membership = the two participants).
    pub fn is_channel_member(&self, channel: ChannelId, user: UserId) -> Result<bool> {
        match self.get_channel(channel) {
            Ok(record) => self.is_member(record.community_id, user),
            Err(StoreError::NotFound) => {
                let thread = self.get_thread(flowtalk_shared::ThreadId(channel.0))?;
                Ok(thread.user_a == user || thread.user_b == user)
            }
            Err(e) => Err(e),
        }
    }

    /// Snapshot of the distinct primary languages of everyone who can see
    /// `channel`, taken at call time. Fan-out is computed from this snapshot;
    /// later preference changes only affect future messages.
    pub fn member_languages(&self, channel: ChannelId) -> Result<Vec<Language>> {
        match self.get_channel(channel) {
            Ok(record) => {
                let mut stmt = self.conn().prepare(
                    "SELECT DISTINCT u.primary_language
                     FROM users u
                     JOIN community_members m ON m.user_id = u.id
                     WHERE m.community_id = ?1",
                )?;
                let rows = stmt.query_map(params![record.community_id.to_string()], |row| {
                    let code: String = row.get(0)?;
                    crate::database::column_language(0, &code)
                })?;
                rows.collect::<std::result::Result<Vec<_>, _>>()
                    .map_err(StoreError::Sqlite)
            }
            Err(StoreError::NotFound) => {
                let thread = self.get_thread(flowtalk_shared::ThreadId(channel.0))?;
                let mut languages = Vec::with_capacity(2);
                for participant in thread.participants() {
                    let lang = self.get_user(participant)?.primary_language;
                    if !languages.contains(&lang) {
                        languages.push(lang);
                    }
                }
                Ok(languages)
            }
            Err(e) => Err(e),
        }
    }

    /// The glossary scope for messages in `channel`: the owning community id,
    /// or `None` for DM threads (which only use the default glossary).
    pub fn glossary_scope_for_channel(&self, channel: ChannelId) -> Result<Option<CommunityId>> {
        match self.get_channel(channel) {
            Ok(record) => Ok(Some(record.community_id)),
            Err(StoreError::NotFound) => {
                // Confirm the id refers to a thread before claiming default scope.
                let _ = self.get_thread(flowtalk_shared::ThreadId(channel.0))?;
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn row_to_community(row: &rusqlite::Row<'_>) -> rusqlite::Result<CommunityRecord> {
    let id_str: String = row.get(0)?;
    let name: String = row.get(1)?;
    let description: Option<String> = row.get(2)?;
    let created_str: String = row.get(3)?;

    Ok(CommunityRecord {
        id: CommunityId(column_uuid(0, &id_str)?),
        name,
        description,
        created_at: column_timestamp(3, &created_str)?,
    })
}

fn row_to_channel(row: &rusqlite::Row<'_>) -> rusqlite::Result<ChannelRecord> {
    let id_str: String = row.get(0)?;
    let community_str: String = row.get(1)?;
    let name: String = row.get(2)?;
    let description: Option<String> = row.get(3)?;
    let created_str: String = row.get(4)?;

    Ok(ChannelRecord {
        id: ChannelId(column_uuid(0, &id_str)?),
        community_id: CommunityId(column_uuid(1, &community_str)?),
        name,
        description,
        created_at: column_timestamp(4, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRecord;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn add_user(db: &Database, username: &str, lang: Language) -> UserId {
        let user = UserRecord {
            id: UserId::new(),
            email: format!("{username}@example.com"),
            username: username.to_string(),
            password_hash: "ab$cd".to_string(),
            primary_language: lang,
            avatar: None,
            status: None,
            created_at: Utc::now(),
        };
        db.create_user(&user).unwrap();
        user.id
    }

    fn add_community_with_channel(db: &Database) -> (CommunityId, ChannelId) {
        let community = CommunityRecord {
            id: CommunityId::new(),
            name: "rustaceans".to_string(),
            description: None,
            created_at: Utc::now(),
        };
        db.create_community(&community).unwrap();

        let channel = ChannelRecord {
            id: ChannelId::new(),
            community_id: community.id,
            name: "general".to_string(),
            description: None,
            created_at: Utc::now(),
        };
        db.create_channel(&channel).unwrap();
        (community.id, channel.id)
    }

    #[test]
    fn membership_and_language_snapshot() {
        let (_dir, db) = test_db();
        let (community, channel) = add_community_with_channel(&db);

        let en = add_user(&db, "erin", Language::En);
        let es = add_user(&db, "sofia", Language::Es);
        let fr = add_user(&db, "felix", Language::Fr);
        let outsider = add_user(&db, "olga", Language::Ru);

        for user in [en, es, fr] {
            db.add_member(community, user).unwrap();
        }

        assert!(db.is_channel_member(channel, en).unwrap());
        assert!(!db.is_channel_member(channel, outsider).unwrap());

        let mut languages = db.member_languages(channel).unwrap();
        languages.sort_by_key(|l| l.code());
        assert_eq!(languages, vec![Language::En, Language::Es, Language::Fr]);
    }

    #[test]
    fn duplicate_join_is_noop() {
        let (_dir, db) = test_db();
        let (community, _) = add_community_with_channel(&db);
        let user = add_user(&db, "erin", Language::En);

        db.add_member(community, user).unwrap();
        db.add_member(community, user).unwrap();
        assert!(db.is_member(community, user).unwrap());
    }

    #[test]
    fn thread_counts_as_channel() {
        let (_dir, db) = test_db();
        let a = add_user(&db, "erin", Language::En);
        let b = add_user(&db, "sofia", Language::Es);
        let stranger = add_user(&db, "olga", Language::Ru);

        let thread = db.get_or_create_thread(a, b).unwrap();
        let as_channel = ChannelId(thread.id.0);

        assert!(db.is_channel_member(as_channel, a).unwrap());
        assert!(db.is_channel_member(as_channel, b).unwrap());
        assert!(!db.is_channel_member(as_channel, stranger).unwrap());

        let languages = db.member_languages(as_channel).unwrap();
        assert_eq!(languages.len(), 2);
        assert!(db.glossary_scope_for_channel(as_channel).unwrap().is_none());
    }

    #[test]
    fn unknown_channel_is_not_found() {
        let (_dir, db) = test_db();
        let user = add_user(&db, "erin", Language::En);
        assert!(matches!(
            db.is_channel_member(ChannelId::new(), user),
            Err(StoreError::NotFound)
        ));
    }
}
