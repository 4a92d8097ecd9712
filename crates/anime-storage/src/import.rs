//! Catalog import from Jikan-style JSON exports.
//!
//! Flattens each record into the `anime` table and the genre, theme and
//! studio link tables. Re-importing a record replaces it.

use std::path::Path;
use std::sync::Arc;

use rusqlite::Connection;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use anime_core::error::AnimeError;

use crate::db::Database;

/// Outcome of one import call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub imported: usize,
    pub skipped: usize,
    pub genre_links: usize,
}

impl ImportReport {
    fn merge(&mut self, other: ImportReport) {
        self.imported += other.imported;
        self.skipped += other.skipped;
        self.genre_links += other.genre_links;
    }
}

#[derive(Debug, Deserialize)]
struct NamedEntry {
    name: String,
}

#[derive(Debug, Default, Deserialize)]
struct AiredRange {
    from: Option<String>,
    to: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnimeRecord {
    mal_id: Option<i64>,
    title: Option<String>,
    title_english: Option<String>,
    title_japanese: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    source: Option<String>,
    episodes: Option<i64>,
    status: Option<String>,
    airing: Option<bool>,
    aired: Option<AiredRange>,
    duration: Option<String>,
    rating: Option<String>,
    score: Option<f64>,
    scored_by: Option<i64>,
    rank: Option<i64>,
    popularity: Option<i64>,
    members: Option<i64>,
    favorites: Option<i64>,
    synopsis: Option<String>,
    season: Option<String>,
    year: Option<i64>,
    #[serde(default)]
    genres: Option<Vec<NamedEntry>>,
    #[serde(default)]
    themes: Option<Vec<NamedEntry>>,
    #[serde(default)]
    studios: Option<Vec<NamedEntry>>,
}

/// Loads catalog records into the database.
pub struct CatalogImporter {
    db: Arc<Database>,
}

impl CatalogImporter {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Import every file in order, summing the reports.
    pub fn import_files<P: AsRef<Path>>(&self, paths: &[P]) -> Result<ImportReport, AnimeError> {
        let mut total = ImportReport::default();
        for path in paths {
            total.merge(self.import_file(path.as_ref())?);
        }
        Ok(total)
    }

    pub fn import_file(&self, path: &Path) -> Result<ImportReport, AnimeError> {
        let content = std::fs::read_to_string(path)?;
        let report = self.import_str(&content)?;
        info!(
            "Imported {} records from {} ({} skipped)",
            report.imported,
            path.display(),
            report.skipped
        );
        Ok(report)
    }

    /// Import a JSON document: `{"data": [...]}`, `{"data": {...}}` or a
    /// bare array of records.
    pub fn import_str(&self, json: &str) -> Result<ImportReport, AnimeError> {
        let doc: Value = serde_json::from_str(json)?;
        let records = extract_records(doc)?;

        self.db.with_conn(|conn| {
            let tx = conn
                .unchecked_transaction()
                .map_err(|e| AnimeError::Storage(format!("Failed to begin import: {}", e)))?;

            let mut report = ImportReport::default();
            for value in records {
                let record = match serde_json::from_value::<AnimeRecord>(value) {
                    Ok(record) => record,
                    Err(e) => {
                        warn!("Skipping malformed record: {}", e);
                        report.skipped += 1;
                        continue;
                    }
                };
                match upsert_record(&tx, &record)? {
                    Some(genres) => {
                        report.imported += 1;
                        report.genre_links += genres;
                    }
                    None => report.skipped += 1,
                }
            }

            tx.commit()
                .map_err(|e| AnimeError::Storage(format!("Failed to commit import: {}", e)))?;
            Ok(report)
        })
    }
}

fn extract_records(doc: Value) -> Result<Vec<Value>, AnimeError> {
    match doc {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => match map.remove("data") {
            Some(Value::Array(items)) => Ok(items),
            Some(record @ Value::Object(_)) => Ok(vec![record]),
            _ => Err(AnimeError::Import(
                "expected a \"data\" array or object".to_string(),
            )),
        },
        _ => Err(AnimeError::Import(
            "expected a JSON object or array of records".to_string(),
        )),
    }
}

/// Write one record and its links. Returns the number of genre links, or
/// `None` when the record lacks an id or a title.
fn upsert_record(conn: &Connection, record: &AnimeRecord) -> Result<Option<usize>, AnimeError> {
    let (Some(id), Some(title)) = (record.mal_id, record.title.as_deref()) else {
        debug!("Skipping record without mal_id or title");
        return Ok(None);
    };
    if title.trim().is_empty() {
        return Ok(None);
    }

    let aired = record.aired.as_ref();
    conn.execute(
        "INSERT OR REPLACE INTO anime (
            anime_id, title, title_english, title_japanese, type, source, episodes,
            status, airing, aired_from, aired_to, duration, rating, score, scored_by,
            rank, popularity, members, favorites, synopsis, season, year)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15,
                 ?16, ?17, ?18, ?19, ?20, ?21, ?22)",
        rusqlite::params![
            id,
            title,
            record.title_english,
            record.title_japanese,
            record.kind,
            record.source,
            record.episodes,
            record.status,
            record.airing,
            aired.and_then(|a| a.from.clone()),
            aired.and_then(|a| a.to.clone()),
            record.duration,
            record.rating,
            record.score,
            record.scored_by,
            record.rank,
            record.popularity,
            record.members,
            record.favorites,
            record.synopsis,
            record.season,
            record.year,
        ],
    )
    .map_err(|e| AnimeError::Storage(format!("Failed to save anime {}: {}", id, e)))?;

    let genres = replace_links(conn, "anime_genres", id, record.genres.as_deref())?;
    replace_links(conn, "anime_themes", id, record.themes.as_deref())?;
    replace_links(conn, "anime_studios", id, record.studios.as_deref())?;

    Ok(Some(genres))
}

fn replace_links(
    conn: &Connection,
    table: &str,
    anime_id: i64,
    entries: Option<&[NamedEntry]>,
) -> Result<usize, AnimeError> {
    let (delete_sql, insert_sql) = match table {
        "anime_genres" => (
            "DELETE FROM anime_genres WHERE anime_id = ?1",
            "INSERT OR IGNORE INTO anime_genres (anime_id, genre_name) VALUES (?1, ?2)",
        ),
        "anime_themes" => (
            "DELETE FROM anime_themes WHERE anime_id = ?1",
            "INSERT OR IGNORE INTO anime_themes (anime_id, theme_name) VALUES (?1, ?2)",
        ),
        "anime_studios" => (
            "DELETE FROM anime_studios WHERE anime_id = ?1",
            "INSERT OR IGNORE INTO anime_studios (anime_id, studio_name) VALUES (?1, ?2)",
        ),
        other => {
            return Err(AnimeError::Storage(format!("Unknown link table: {}", other)));
        }
    };

    conn.execute(delete_sql, rusqlite::params![anime_id])
        .map_err(|e| AnimeError::Storage(format!("Failed to clear {}: {}", table, e)))?;

    let mut written = 0;
    for entry in entries.unwrap_or_default() {
        let name = entry.name.trim();
        if name.is_empty() {
            continue;
        }
        written += conn
            .execute(insert_sql, rusqlite::params![anime_id, name])
            .map_err(|e| AnimeError::Storage(format!("Failed to link {}: {}", table, e)))?;
    }
    Ok(written)
}
