//! SQLite implementation of the table-store query interface.

use std::sync::Arc;

use async_trait::async_trait;
use rusqlite::types::{Value, ValueRef};
use rusqlite::{Connection, ErrorCode};
use tracing::debug;

use anime_core::store::{BoundQuery, StoreError, TableStore};
use anime_core::types::{Row, Scalar};

use crate::db::Database;

/// Executes bound catalog queries against the local SQLite database.
///
/// Each query runs on a blocking task so the connection mutex is never
/// held across an `.await`.
#[derive(Debug, Clone)]
pub struct SqliteTableStore {
    db: Arc<Database>,
}

impl SqliteTableStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl TableStore for SqliteTableStore {
    async fn query(&self, query: &BoundQuery) -> Result<Vec<Row>, StoreError> {
        let db = Arc::clone(&self.db);
        let bound = query.clone();

        let rows = tokio::task::spawn_blocking(move || {
            db.with_conn_as(|conn| run_query(conn, &bound))
        })
        .await
        .map_err(|e| StoreError::Transient(format!("query task failed: {}", e)))??;

        debug!(template = query.name, rows = rows.len(), "Catalog query finished");
        Ok(rows)
    }
}

/// Prepare, bind and drain one query, keeping row order.
fn run_query(conn: &Connection, query: &BoundQuery) -> Result<Vec<Row>, StoreError> {
    let mut stmt = conn.prepare(query.sql).map_err(classify_error)?;
    let columns: Vec<String> = stmt
        .column_names()
        .into_iter()
        .map(|c| c.to_string())
        .collect();

    let params = query.params.iter().map(to_sql_value);
    let mut rows = stmt
        .query(rusqlite::params_from_iter(params))
        .map_err(classify_error)?;

    let mut results = Vec::new();
    while let Some(row) = rows.next().map_err(classify_error)? {
        let mut record = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            let cell = row.get_ref(idx).map_err(classify_error)?;
            record.insert(name.clone(), from_value_ref(cell));
        }
        results.push(record);
    }
    Ok(results)
}

/// Busy and locked databases clear up on their own; everything else is a
/// problem with the query or the schema.
fn classify_error(err: rusqlite::Error) -> StoreError {
    match &err {
        rusqlite::Error::SqliteFailure(e, _)
            if matches!(e.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
        {
            StoreError::Transient(err.to_string())
        }
        _ => StoreError::Permanent(err.to_string()),
    }
}

fn to_sql_value(scalar: &Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Integer(i) => Value::Integer(*i),
        Scalar::Real(f) => Value::Real(*f),
        Scalar::Text(s) => Value::Text(s.clone()),
    }
}

fn from_value_ref(value: ValueRef<'_>) -> Scalar {
    match value {
        ValueRef::Null => Scalar::Null,
        ValueRef::Integer(i) => Scalar::Integer(i),
        ValueRef::Real(f) => Scalar::Real(f),
        ValueRef::Text(bytes) => Scalar::Text(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => Scalar::Text(format!("<{} bytes>", bytes.len())),
    }
}
