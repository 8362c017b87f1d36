//! # Search Terms Module
//!
//! ## Purpose
//! CRUD operations for user-maintained search terms: the named, optionally
//! categorized substring patterns whose document mentions the dashboard tracks.
//!
//! ## Key Features
//! - Terms ordered by creation time, newest first
//! - Empty-after-trim terms rejected with a validation error
//! - Duplicate term text (case-insensitive) rejected, never silently coalesced
//! - Updates return the full record with the original `created_date`

use crate::errors::{DashboardError, Result};
use crate::store::Store;
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};

/// A user-defined search term tracked for mention frequency
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchTerm {
    pub id: i64,
    pub term: String,
    pub category: Option<String>,
    pub created_date: DateTime<Utc>,
}

impl Store {
    /// Get all search terms, newest first
    pub fn list_terms(&self) -> Result<Vec<SearchTerm>> {
        self.with_connection(list_terms_impl)
    }

    /// Create a new search term
    pub fn create_term(&self, term: &str, category: Option<&str>) -> Result<SearchTerm> {
        let term = validate_term_text(term)?;
        let category = normalize_category(category);
        self.with_connection(|conn| create_term_impl(conn, &term, category.as_deref()))
    }

    /// Get a search term by id
    pub fn get_term(&self, id: i64) -> Result<SearchTerm> {
        self.with_connection(|conn| get_term_impl(conn, id))
    }

    /// Update an existing search term, keeping its creation timestamp
    pub fn update_term(&self, id: i64, term: &str, category: Option<&str>) -> Result<SearchTerm> {
        let term = validate_term_text(term)?;
        let category = normalize_category(category);
        self.with_connection(|conn| update_term_impl(conn, id, &term, category.as_deref()))
    }

    /// Delete a search term
    pub fn delete_term(&self, id: i64) -> Result<()> {
        self.with_connection(|conn| delete_term_impl(conn, id))
    }
}

/// Reject terms that are empty after trimming
fn validate_term_text(term: &str) -> Result<String> {
    let trimmed = term.trim();
    if trimmed.is_empty() {
        return Err(DashboardError::validation("term", "term is required"));
    }
    Ok(trimmed.to_string())
}

/// Blank categories normalize to none
fn normalize_category(category: Option<&str>) -> Option<String> {
    category
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .map(str::to_string)
}

fn row_to_term(row: &Row<'_>) -> rusqlite::Result<SearchTerm> {
    Ok(SearchTerm {
        id: row.get(0)?,
        term: row.get(1)?,
        category: row.get(2)?,
        created_date: row.get(3)?,
    })
}

/// Map a unique-index violation on the term column to a validation error
fn map_term_conflict(err: rusqlite::Error) -> DashboardError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if e.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            DashboardError::validation("term", "a term with this text already exists")
        }
        _ => DashboardError::Database(err),
    }
}

fn list_terms_impl(conn: &Connection) -> Result<Vec<SearchTerm>> {
    let mut stmt = conn.prepare(
        "SELECT id, term, category, created_date
         FROM search_terms
         ORDER BY created_date DESC, id DESC",
    )?;
    let terms = stmt
        .query_map([], row_to_term)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(terms)
}

fn create_term_impl(conn: &Connection, term: &str, category: Option<&str>) -> Result<SearchTerm> {
    conn.query_row(
        "INSERT INTO search_terms (term, category, created_date)
         VALUES (?1, ?2, ?3)
         RETURNING id, term, category, created_date",
        params![term, category, Utc::now()],
        row_to_term,
    )
    .map_err(map_term_conflict)
}

fn get_term_impl(conn: &Connection, id: i64) -> Result<SearchTerm> {
    conn.query_row(
        "SELECT id, term, category, created_date FROM search_terms WHERE id = ?1",
        params![id],
        row_to_term,
    )
    .optional()?
    .ok_or_else(|| DashboardError::not_found(format!("search term {}", id)))
}

fn update_term_impl(
    conn: &Connection,
    id: i64,
    term: &str,
    category: Option<&str>,
) -> Result<SearchTerm> {
    conn.query_row(
        "UPDATE search_terms
         SET term = ?1, category = ?2
         WHERE id = ?3
         RETURNING id, term, category, created_date",
        params![term, category, id],
        row_to_term,
    )
    .optional()
    .map_err(map_term_conflict)?
    .ok_or_else(|| DashboardError::not_found(format!("search term {}", id)))
}

fn delete_term_impl(conn: &Connection, id: i64) -> Result<()> {
    let deleted = conn.execute("DELETE FROM search_terms WHERE id = ?1", params![id])?;
    if deleted == 0 {
        return Err(DashboardError::not_found(format!("search term {}", id)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::DashboardError;

    fn store() -> Store {
        Store::in_memory().unwrap()
    }

    #[test]
    fn test_create_trims_and_returns_row() {
        let store = store();
        let created = store.create_term("  compliance  ", Some(" regulatory ")).unwrap();
        assert_eq!(created.term, "compliance");
        assert_eq!(created.category.as_deref(), Some("regulatory"));
        assert!(created.id > 0);
    }

    #[test]
    fn test_create_rejects_empty_term() {
        let store = store();
        let err = store.create_term("   ", None).unwrap_err();
        assert!(matches!(err, DashboardError::Validation { .. }));
    }

    #[test]
    fn test_create_rejects_duplicate_term() {
        let store = store();
        store.create_term("audit", None).unwrap();
        let err = store.create_term("  AUDIT ", Some("other")).unwrap_err();
        assert!(matches!(err, DashboardError::Validation { .. }));
    }

    #[test]
    fn test_blank_category_normalizes_to_none() {
        let store = store();
        let created = store.create_term("recall", Some("   ")).unwrap();
        assert_eq!(created.category, None);
    }

    #[test]
    fn test_list_orders_newest_first() {
        let store = store();
        store.create_term("first", None).unwrap();
        store.create_term("second", None).unwrap();
        let terms = store.list_terms().unwrap();
        assert_eq!(terms.len(), 2);
        assert_eq!(terms[0].term, "second");
        assert_eq!(terms[1].term, "first");
    }

    #[test]
    fn test_update_keeps_created_date() {
        let store = store();
        let created = store.create_term("audit", Some("quality")).unwrap();
        let updated = store
            .update_term(created.id, "audit trail", None)
            .unwrap();
        assert_eq!(updated.id, created.id);
        assert_eq!(updated.term, "audit trail");
        assert_eq!(updated.category, None);
        assert_eq!(updated.created_date, created.created_date);
    }

    #[test]
    fn test_update_missing_id_is_not_found() {
        let store = store();
        let err = store.update_term(999, "anything", None).unwrap_err();
        assert!(matches!(err, DashboardError::NotFound { .. }));
    }

    #[test]
    fn test_delete_then_delete_again() {
        let store = store();
        let created = store.create_term("obsolete", None).unwrap();
        store.delete_term(created.id).unwrap();
        let err = store.delete_term(created.id).unwrap_err();
        assert!(matches!(err, DashboardError::NotFound { .. }));
    }

    #[test]
    fn test_get_roundtrip() {
        let store = store();
        let created = store.create_term("sterilization", Some("process")).unwrap();
        let fetched = store.get_term(created.id).unwrap();
        assert_eq!(fetched.term, "sterilization");
        assert_eq!(fetched.category.as_deref(), Some("process"));
        assert_eq!(fetched.created_date, created.created_date);
    }
}
