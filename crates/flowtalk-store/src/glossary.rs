use chrono::Utc;
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{GlossaryCategory, GlossaryTermRecord};

/// Scope key for the bundled terms shared by every community.
pub const DEFAULT_SCOPE: &str = "default";

impl Database {
    /// Insert or replace a protected term in a scope.
    pub fn upsert_glossary_term(&self, term: &GlossaryTermRecord) -> Result<()> {
        self.conn().execute(
            "INSERT INTO glossary_terms (id, scope, term, category, preserve_case, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT (scope, term) DO UPDATE SET
                 category = excluded.category,
                 preserve_case = excluded.preserve_case",
            params![
                Uuid::new_v4().to_string(),
                term.scope,
                term.term,
                term.category.as_str(),
                term.preserve_case as i64,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// The merged glossary for a scope: the scope's own terms layered over
    /// the defaults. A community term shadows a default term on
    /// case-insensitive equality; no term appears twice.
    pub fn glossary_terms_for_scope(&self, scope: Option<&str>) -> Result<Vec<GlossaryTermRecord>> {
        let mut merged = match scope {
            Some(scope) if scope != DEFAULT_SCOPE => self.terms_in_scope(scope)?,
            _ => Vec::new(),
        };

        for term in self.terms_in_scope(DEFAULT_SCOPE)? {
            let shadowed = merged
                .iter()
                .any(|t| t.term.eq_ignore_ascii_case(&term.term));
            if !shadowed {
                merged.push(term);
            }
        }
        Ok(merged)
    }

    fn terms_in_scope(&self, scope: &str) -> Result<Vec<GlossaryTermRecord>> {
        let mut stmt = self.conn().prepare(
            "SELECT scope, term, category, preserve_case
             FROM glossary_terms WHERE scope = ?1 ORDER BY term ASC",
        )?;
        let rows = stmt.query_map(params![scope], |row| {
            let scope: String = row.get(0)?;
            let term: String = row.get(1)?;
            let category_str: String = row.get(2)?;
            let preserve_case: i64 = row.get(3)?;

            let category = GlossaryCategory::parse(&category_str).ok_or_else(|| {
                rusqlite::Error::FromSqlConversionFailure(
                    2,
                    rusqlite::types::Type::Text,
                    format!("unknown glossary category '{category_str}'").into(),
                )
            })?;

            Ok(GlossaryTermRecord {
                scope,
                term,
                category,
                preserve_case: preserve_case != 0,
            })
        })?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(StoreError::Sqlite)
    }
}
