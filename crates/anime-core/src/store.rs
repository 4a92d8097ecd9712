//! Table-store query interface.
//!
//! The Retrieval Agent talks to the table store only through [`TableStore`].
//! SQL text is always a `'static` template; user-influenced values travel
//! separately as bound parameters.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::AnimeError;
use crate::types::{Row, Scalar};

/// A parameterized query: fixed SQL text plus positional bound values.
#[derive(Clone, Debug, PartialEq)]
pub struct BoundQuery {
    /// Template name, for logs.
    pub name: &'static str,
    /// SQL with `?1`, `?2`, ... placeholders.
    pub sql: &'static str,
    /// Values bound to the placeholders, in order.
    pub params: Vec<Scalar>,
}

impl BoundQuery {
    pub fn new(name: &'static str, sql: &'static str, params: Vec<Scalar>) -> Self {
        Self { name, sql, params }
    }
}

/// Failure reported by a table store.
///
/// The split drives the retry policy: only `Transient` is retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    /// Timeout, busy database, dropped connection.
    #[error("transient store failure: {0}")]
    Transient(String),
    /// Malformed template, schema mismatch, bad parameter type.
    #[error("permanent store failure: {0}")]
    Permanent(String),
}

impl StoreError {
    pub fn is_transient(&self) -> bool {
        matches!(self, StoreError::Transient(_))
    }
}

impl From<AnimeError> for StoreError {
    fn from(err: AnimeError) -> Self {
        StoreError::Permanent(err.to_string())
    }
}

/// Anything that can execute a [`BoundQuery`] and return ordered rows.
#[async_trait]
pub trait TableStore: Send + Sync {
    /// Execute the query, returning rows in the order the query specifies.
    async fn query(&self, query: &BoundQuery) -> Result<Vec<Row>, StoreError>;
}
