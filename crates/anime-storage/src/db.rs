//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use anime_core::error::AnimeError;

use crate::migrations;

/// Thread-safe SQLite database wrapper for the anime catalog.
///
/// The connection is wrapped in a Mutex since rusqlite Connection is not
/// Sync. Callers should hold it only inside blocking code, never across an
/// `.await`.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode, synchronous=NORMAL, foreign keys, a busy
    /// timeout, and runs all pending migrations.
    pub fn new(path: &Path) -> Result<Self, AnimeError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)
            .map_err(|e| AnimeError::Storage(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 1000;",
        )
        .map_err(|e| AnimeError::Storage(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());
        Self::from_connection(conn)
    }

    /// Open an in-memory database (for tests and dry runs).
    pub fn in_memory() -> Result<Self, AnimeError> {
        let conn = Connection::open_in_memory()
            .map_err(|e| AnimeError::Storage(format!("Failed to open in-memory db: {}", e)))?;

        conn.execute_batch("PRAGMA foreign_keys = ON;")
            .map_err(|e| AnimeError::Storage(format!("Failed to set pragmas: {}", e)))?;

        Self::from_connection(conn)
    }

    fn from_connection(conn: Connection) -> Result<Self, AnimeError> {
        let db = Self {
            conn: Mutex::new(conn),
        };
        db.with_conn(migrations::run_migrations)?;
        Ok(db)
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, AnimeError>
    where
        F: FnOnce(&Connection) -> Result<T, AnimeError>,
    {
        self.with_conn_as(f)
    }

    /// Like [`Database::with_conn`], for callers with their own error type.
    ///
    /// A poisoned lock is reported through `From<AnimeError>`.
    pub fn with_conn_as<F, T, E>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Connection) -> Result<T, E>,
        E: From<AnimeError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| AnimeError::Storage(format!("Database lock poisoned: {}", e)))?;
        f(&conn)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish()
    }
}
