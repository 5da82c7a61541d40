use chrono::{DateTime, Utc};
use rusqlite::params;

use flowtalk_shared::{ThreadId, UserId};

use crate::database::{column_timestamp, column_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::ThreadRecord;

impl Database {
    /// Return the DM thread between two users, creating it if absent.
    ///
    /// Participants are stored sorted so the `(user_a, user_b)` uniqueness
    /// constraint holds regardless of argument order.
    pub fn get_or_create_thread(&self, a: UserId, b: UserId) -> Result<ThreadRecord> {
        let (user_a, user_b) = sort_pair(a, b);

        if let Some(existing) = self.find_thread(user_a, user_b)? {
            return Ok(existing);
        }

        let now = Utc::now();
        let thread = ThreadRecord {
            id: ThreadId::new(),
            user_a,
            user_b,
            created_at: now,
            last_message_at: now,
        };

        // A concurrent creator may win the race; the unique index makes the
        // second insert a no-op and the re-read returns the winner's row.
        self.conn().execute(
            "INSERT OR IGNORE INTO threads (id, user_a, user_b, created_at, last_message_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                thread.id.to_string(),
                user_a.to_string(),
                user_b.to_string(),
                now.to_rfc3339(),
                now.to_rfc3339(),
            ],
        )?;

        self.find_thread(user_a, user_b)?.ok_or(StoreError::NotFound)
    }

    pub fn get_thread(&self, id: ThreadId) -> Result<ThreadRecord> {
        self.conn()
            .query_row(
                "SELECT id, user_a, user_b, created_at, last_message_at
                 FROM threads WHERE id = ?1",
                params![id.to_string()],
                row_to_thread,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    pub fn list_threads_for_user(&self, user: UserId) -> Result<Vec<ThreadRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, user_a, user_b, created_at, last_message_at
             FROM threads
             WHERE user_a = ?1 OR user_b = ?1
             ORDER BY last_message_at DESC",
        )?;
        let rows = stmt.query_map(params![user.to_string()], row_to_thread)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }

    pub fn touch_thread_last_message(&self, id: ThreadId, at: DateTime<Utc>) -> Result<()> {
        self.conn().execute(
            "UPDATE threads SET last_message_at = ?1 WHERE id = ?2",
            params![at.to_rfc3339(), id.to_string()],
        )?;
        Ok(())
    }

    fn find_thread(&self, user_a: UserId, user_b: UserId) -> Result<Option<ThreadRecord>> {
        match self.conn().query_row(
            "SELECT id, user_a, user_b, created_at, last_message_at
             FROM threads WHERE user_a = ?1 AND user_b = ?2",
            params![user_a.to_string(), user_b.to_string()],
            row_to_thread,
        ) {
            Ok(thread) => Ok(Some(thread)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StoreError::Sqlite(e)),
        }
    }
}

fn sort_pair(a: UserId, b: UserId) -> (UserId, UserId) {
    if a.to_string() <= b.to_string() {
        (a, b)
    } else {
        (b, a)
    }
}

fn row_to_thread(row: &rusqlite::Row<'_>) -> rusqlite::Result<ThreadRecord> {
    let id_str: String = row.get(0)?;
    let a_str: String = row.get(1)?;
    let b_str: String = row.get(2)?;
    let created_str: String = row.get(3)?;
    let last_str: String = row.get(4)?;

    Ok(ThreadRecord {
        id: ThreadId(column_uuid(0, &id_str)?),
        user_a: UserId(column_uuid(1, &a_str)?),
        user_b: UserId(column_uuid(2, &b_str)?),
        created_at: column_timestamp(3, &created_str)?,
        last_message_at: column_timestamp(4, &last_str)?,
    })
}
