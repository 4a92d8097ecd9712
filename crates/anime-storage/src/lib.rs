//! Anime Storage crate - SQLite catalog, import and the table-store backend.
//!
//! Provides a WAL-mode SQLite database with migrations, a JSON catalog
//! importer, summary queries, and the [`SqliteTableStore`] the retrieval
//! layer queries through.

pub mod db;
pub mod import;
pub mod migrations;
pub mod queries;
pub mod table_store;

pub use db::Database;
pub use import::{CatalogImporter, ImportReport};
pub use queries::{CatalogQueries, CatalogStats};
pub use table_store::SqliteTableStore;
