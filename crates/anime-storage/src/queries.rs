//! Catalog summary queries used by the `stats` command.

use std::sync::Arc;

use anime_core::error::AnimeError;

use crate::db::Database;

/// Counts describing the loaded catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogStats {
    pub anime_count: u64,
    pub scored_count: u64,
    pub airing_count: u64,
    pub genre_count: u64,
    pub studio_count: u64,
    pub db_size_bytes: u64,
}

/// Read-only summary queries over the catalog.
pub struct CatalogQueries {
    db: Arc<Database>,
}

impl CatalogQueries {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    pub fn stats(&self) -> Result<CatalogStats, AnimeError> {
        self.db.with_conn(|conn| {
            let count = |sql: &str| -> Result<u64, AnimeError> {
                conn.query_row(sql, [], |row| row.get::<_, i64>(0))
                    .map(|n| n.max(0) as u64)
                    .map_err(|e| AnimeError::Storage(e.to_string()))
            };

            let anime_count = count("SELECT COUNT(*) FROM anime")?;
            let scored_count = count("SELECT COUNT(*) FROM anime WHERE score IS NOT NULL")?;
            let airing_count =
                count("SELECT COUNT(*) FROM anime WHERE LOWER(status) = 'currently airing'")?;
            let genre_count = count("SELECT COUNT(DISTINCT genre_name) FROM anime_genres")?;
            let studio_count = count("SELECT COUNT(DISTINCT studio_name) FROM anime_studios")?;

            // page_count * page_size gives approximate DB size.
            let page_count = count("PRAGMA page_count")?;
            let page_size = count("PRAGMA page_size")?;

            Ok(CatalogStats {
                anime_count,
                scored_count,
                airing_count,
                genre_count,
                studio_count,
                db_size_bytes: page_count * page_size,
            })
        })
    }
}
