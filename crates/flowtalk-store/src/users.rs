use rusqlite::params;

use flowtalk_shared::{Language, UserId};

use crate::database::{column_language, column_timestamp, column_uuid, Database};
use crate::error::{Result, StoreError};
use crate::models::UserRecord;

impl Database {
    pub fn create_user(&self, user: &UserRecord) -> Result<()> {
        let inserted = self.conn().execute(
            "INSERT OR IGNORE INTO users
                 (id, email, username, password_hash, primary_language, avatar, status, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                user.id.to_string(),
                user.email,
                user.username,
                user.password_hash,
                user.primary_language.code(),
                user.avatar,
                user.status,
                user.created_at.to_rfc3339(),
            ],
        )?;
        if inserted == 0 {
            return Err(StoreError::Conflict(
                "email or username already registered".into(),
            ));
        }
        Ok(())
    }

    pub fn get_user(&self, id: UserId) -> Result<UserRecord> {
        self.user_query("SELECT id, email, username, password_hash, primary_language, avatar, status, created_at
                         FROM users WHERE id = ?1", &id.to_string())
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<UserRecord> {
        self.user_query("SELECT id, email, username, password_hash, primary_language, avatar, status, created_at
                         FROM users WHERE email = ?1", email)
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<UserRecord> {
        self.user_query("SELECT id, email, username, password_hash, primary_language, avatar, status, created_at
                         FROM users WHERE username = ?1", username)
    }

    /// Apply a partial profile update; `None` fields are left untouched.
    pub fn update_profile(
        &self,
        id: UserId,
        primary_language: Option<Language>,
        avatar: Option<&str>,
        status: Option<&str>,
    ) -> Result<()> {
        if let Some(lang) = primary_language {
            self.conn().execute(
                "UPDATE users SET primary_language = ?1 WHERE id = ?2",
                params![lang.code(), id.to_string()],
            )?;
        }
        if let Some(avatar) = avatar {
            self.conn().execute(
                "UPDATE users SET avatar = ?1 WHERE id = ?2",
                params![avatar, id.to_string()],
            )?;
        }
        if let Some(status) = status {
            self.conn().execute(
                "UPDATE users SET status = ?1 WHERE id = ?2",
                params![status, id.to_string()],
            )?;
        }
        let _ = self.get_user(id)?;
        Ok(())
    }

    fn user_query(&self, sql: &str, key: &str) -> Result<UserRecord> {
        self.conn()
            .query_row(sql, params![key], row_to_user)
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }
}

fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<UserRecord> {
    let id_str: String = row.get(0)?;
    let email: String = row.get(1)?;
    let username: String = row.get(2)?;
    let password_hash: String = row.get(3)?;
    let lang_str: String = row.get(4)?;
    let avatar: Option<String> = row.get(5)?;
    let status: Option<String> = row.get(6)?;
    let created_str: String = row.get(7)?;

    Ok(UserRecord {
        id: UserId(column_uuid(0, &id_str)?),
        email,
        username,
        password_hash,
        primary_language: column_language(4, &lang_str)?,
        avatar,
        status,
        created_at: column_timestamp(7, &created_str)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::UserRecord;
    use chrono::Utc;

    fn test_db() -> (tempfile::TempDir, Database) {
        let dir = tempfile::tempdir().unwrap();
        let db = Database::open_at(&dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn sample_user(email: &str, username: &str, lang: Language) -> UserRecord {
        UserRecord {
            id: UserId::new(),
            email: email.to_string(),
            username: username.to_string(),
            password_hash: "ab$cd".to_string(),
            primary_language: lang,
            avatar: None,
            status: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_fetch_user() {
        let (_dir, db) = test_db();
        let user = sample_user("a@example.com", "amara", Language::Es);
        db.create_user(&user).unwrap();

        assert_eq!(db.get_user(user.id).unwrap(), user);
        assert_eq!(db.get_user_by_email("a@example.com").unwrap().id, user.id);
        assert_eq!(db.get_user_by_username("amara").unwrap().id, user.id);
    }

    #[test]
    fn duplicate_email_is_conflict() {
        let (_dir, db) = test_db();
        db.create_user(&sample_user("a@example.com", "amara", Language::Es))
            .unwrap();

        let dup = sample_user("a@example.com", "other", Language::En);
        assert!(matches!(db.create_user(&dup), Err(StoreError::Conflict(_))));
    }

    #[test]
    fn missing_user_is_not_found() {
        let (_dir, db) = test_db();
        assert!(matches!(db.get_user(UserId::new()), Err(StoreError::NotFound)));
    }

    #[test]
    fn partial_profile_update() {
        let (_dir, db) = test_db();
        let user = sample_user("a@example.com", "amara", Language::Es);
        db.create_user(&user).unwrap();

        db.update_profile(user.id, Some(Language::Fr), None, Some("away"))
            .unwrap();

        let updated = db.get_user(user.id).unwrap();
        assert_eq!(updated.primary_language, Language::Fr);
        assert_eq!(updated.status.as_deref(), Some("away"));
        assert_eq!(updated.avatar, None);
    }
}
