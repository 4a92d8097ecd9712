//! Database schema migrations.
//!
//! Applies the catalog schema: the `anime` table plus the genre, theme and
//! studio link tables, tracked through `schema_migrations`.

use rusqlite::Connection;
use tracing::info;

use anime_core::error::AnimeError;

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<(), AnimeError> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| AnimeError::Storage(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| AnimeError::Storage(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: catalog_schema");
    }

    Ok(())
}

/// Version 1: catalog schema.
fn apply_v1(conn: &Connection) -> Result<(), AnimeError> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS anime (
            anime_id        INTEGER PRIMARY KEY NOT NULL,
            title           TEXT NOT NULL,
            title_english   TEXT,
            title_japanese  TEXT,
            type            TEXT,
            source          TEXT,
            episodes        INTEGER,
            status          TEXT,
            airing          INTEGER,
            aired_from      TEXT,
            aired_to        TEXT,
            duration        TEXT,
            rating          TEXT,
            score           REAL,
            scored_by       INTEGER,
            rank            INTEGER,
            popularity      INTEGER,
            members         INTEGER,
            favorites       INTEGER,
            synopsis        TEXT,
            season          TEXT,
            year            INTEGER,
            imported_at     INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );

        CREATE INDEX IF NOT EXISTS idx_anime_score
            ON anime (score DESC);

        CREATE INDEX IF NOT EXISTS idx_anime_year
            ON anime (year, score DESC);

        CREATE INDEX IF NOT EXISTS idx_anime_status
            ON anime (status);

        CREATE TABLE IF NOT EXISTS anime_genres (
            anime_id    INTEGER NOT NULL REFERENCES anime (anime_id) ON DELETE CASCADE,
            genre_name  TEXT NOT NULL,
            PRIMARY KEY (anime_id, genre_name)
        );

        CREATE INDEX IF NOT EXISTS idx_anime_genres_name
            ON anime_genres (genre_name);

        CREATE TABLE IF NOT EXISTS anime_themes (
            anime_id    INTEGER NOT NULL REFERENCES anime (anime_id) ON DELETE CASCADE,
            theme_name  TEXT NOT NULL,
            PRIMARY KEY (anime_id, theme_name)
        );

        CREATE TABLE IF NOT EXISTS anime_studios (
            anime_id     INTEGER NOT NULL REFERENCES anime (anime_id) ON DELETE CASCADE,
            studio_name  TEXT NOT NULL,
            PRIMARY KEY (anime_id, studio_name)
        );

        INSERT INTO schema_migrations (version, name) VALUES (1, 'catalog_schema');
        ",
    )
    .map_err(|e| AnimeError::Storage(format!("Migration v1 failed: {}", e)))?;

    Ok(())
}
