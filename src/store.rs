//! # Store Module
//!
//! ## Purpose
//! SQLite-backed persistence for the document insights service. Owns the
//! database connection and the schema for the `search_terms` table and the
//! externally populated `documents` table.
//!
//! ## Input/Output Specification
//! - **Input**: Database path (or in-memory for tests), SQL statements from
//!   the term and aggregation modules
//! - **Output**: Query results via the shared connection accessor
//! - **Schema**: Versioned migrations tracked with `PRAGMA user_version`
//!
//! ## Key Features
//! - Single connection behind a mutex; statement-level atomicity only
//! - Schema migrations run automatically at open
//! - In-memory variant for tests
//! - Health check used by the API and the CLI

use crate::errors::{DashboardError, Result};
use chrono::NaiveDate;
use rusqlite::{params, Connection};
use std::path::PathBuf;
use std::sync::Mutex;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// Store that owns the SQLite connection
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    /// Open (or create) the database at the given path and run migrations
    pub fn open(db_path: PathBuf) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(&db_path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        run_migrations(&conn)?;

        tracing::info!("Store initialized at {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open a fresh in-memory database, used by tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Execute a function with access to the database connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|e| DashboardError::Internal {
            message: format!("Failed to lock database connection: {}", e),
        })?;
        f(&conn)
    }

    /// Health check for the store
    pub fn health_check(&self) -> Result<()> {
        self.with_connection(|conn| {
            conn.query_row("SELECT 1", [], |_| Ok(()))?;
            Ok(())
        })
    }

    /// Insert a document row. The documents table is normally populated by an
    /// external pipeline; this is used by tests and the demo seeder.
    pub fn insert_document(
        &self,
        title: &str,
        text: &str,
        document_date: NaiveDate,
        folder_path: &str,
        file_link: &str,
    ) -> Result<i64> {
        self.with_connection(|conn| {
            conn.execute(
                "INSERT INTO documents (title, text, document_date, folder_path, file_link)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![title, text, document_date, folder_path, file_link],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }
}

/// Run all necessary migrations to bring the database up to date
fn run_migrations(conn: &Connection) -> Result<()> {
    let current_version: i32 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current_version < 1 {
        migrate_v1(conn)?;
    }

    if current_version < SCHEMA_VERSION {
        conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        tracing::info!(
            "Migrated store schema from version {} to {}",
            current_version,
            SCHEMA_VERSION
        );
    }

    Ok(())
}

/// Initial schema creation (version 1)
fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS search_terms (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            term         TEXT NOT NULL,
            category     TEXT,
            created_date TEXT NOT NULL
        );
        CREATE UNIQUE INDEX IF NOT EXISTS idx_search_terms_term
            ON search_terms (term COLLATE NOCASE);

        CREATE TABLE IF NOT EXISTS documents (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            title         TEXT NOT NULL,
            text          TEXT NOT NULL,
            document_date TEXT NOT NULL,
            folder_path   TEXT NOT NULL DEFAULT '',
            file_link     TEXT NOT NULL DEFAULT ''
        );
        CREATE INDEX IF NOT EXISTS idx_documents_date
            ON documents (document_date);",
    )?;
    Ok(())
}
