use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// =============================================================================
// Scalars
// =============================================================================

/// A single scalar value: a query parameter or a result cell.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Scalar {
    /// Interpret the value as an integer.
    ///
    /// Whole reals and numeric text are accepted, since language models
    /// frequently quote numbers.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Scalar::Integer(i) => Some(*i),
            Scalar::Real(f) if f.fract() == 0.0 => Some(*f as i64),
            Scalar::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Interpret the value as a float.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Scalar::Integer(i) => Some(*i as f64),
            Scalar::Real(f) => Some(*f),
            Scalar::Text(s) => s.trim().parse().ok(),
            Scalar::Null => None,
        }
    }

    /// Borrow the value as text, if it is text.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Scalar::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// True for `Null` and for blank text.
    pub fn is_blank(&self) -> bool {
        match self {
            Scalar::Null => true,
            Scalar::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for Scalar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scalar::Null => write!(f, "n/a"),
            Scalar::Integer(i) => write!(f, "{}", i),
            Scalar::Real(r) => write!(f, "{}", r),
            Scalar::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for Scalar {
    fn from(s: &str) -> Self {
        Scalar::Text(s.to_string())
    }
}

impl From<String> for Scalar {
    fn from(s: String) -> Self {
        Scalar::Text(s)
    }
}

impl From<i64> for Scalar {
    fn from(i: i64) -> Self {
        Scalar::Integer(i)
    }
}

impl From<i32> for Scalar {
    fn from(i: i32) -> Self {
        Scalar::Integer(i64::from(i))
    }
}

impl From<u32> for Scalar {
    fn from(i: u32) -> Self {
        Scalar::Integer(i64::from(i))
    }
}

impl From<f64> for Scalar {
    fn from(f: f64) -> Self {
        Scalar::Real(f)
    }
}

/// Named query parameters, e.g. `genre -> "action"`.
pub type Parameters = BTreeMap<String, Scalar>;

/// One result row: column name to cell value.
pub type Row = BTreeMap<String, Scalar>;

// =============================================================================
// Intent
// =============================================================================

/// The closed set of things a user can ask for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryIntent {
    #[serde(alias = "search_title")]
    SearchByTitle,
    #[serde(alias = "genre_filter")]
    FilterByGenre,
    #[serde(alias = "top_rated")]
    TopRated,
    #[serde(alias = "currently_airing")]
    CurrentlyAiring,
    #[serde(alias = "statistics")]
    StatisticsLookup,
    Unknown,
}

impl QueryIntent {
    /// Every intent, in declaration order.
    pub const ALL: [QueryIntent; 6] = [
        QueryIntent::SearchByTitle,
        QueryIntent::FilterByGenre,
        QueryIntent::TopRated,
        QueryIntent::CurrentlyAiring,
        QueryIntent::StatisticsLookup,
        QueryIntent::Unknown,
    ];

    /// Canonical kebab-case name.
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryIntent::SearchByTitle => "search-by-title",
            QueryIntent::FilterByGenre => "filter-by-genre",
            QueryIntent::TopRated => "top-rated",
            QueryIntent::CurrentlyAiring => "currently-airing",
            QueryIntent::StatisticsLookup => "statistics-lookup",
            QueryIntent::Unknown => "unknown",
        }
    }

    /// Parse a canonical or legacy snake_case intent name.
    ///
    /// Returns `None` for anything outside the enumeration; callers map that
    /// to [`QueryIntent::Unknown`].
    pub fn parse(name: &str) -> Option<Self> {
        let normalized = name.trim().to_ascii_lowercase().replace('_', "-");
        match normalized.as_str() {
            "search-by-title" | "search-title" => Some(QueryIntent::SearchByTitle),
            "filter-by-genre" | "genre-filter" => Some(QueryIntent::FilterByGenre),
            "top-rated" => Some(QueryIntent::TopRated),
            "currently-airing" => Some(QueryIntent::CurrentlyAiring),
            "statistics-lookup" | "statistics" => Some(QueryIntent::StatisticsLookup),
            "unknown" => Some(QueryIntent::Unknown),
            _ => None,
        }
    }

    /// Parameters that must be present for this intent to be answerable.
    pub fn required_parameters(&self) -> &'static [&'static str] {
        match self {
            QueryIntent::SearchByTitle => &["title"],
            QueryIntent::FilterByGenre => &["genre"],
            QueryIntent::TopRated
            | QueryIntent::CurrentlyAiring
            | QueryIntent::StatisticsLookup
            | QueryIntent::Unknown => &[],
        }
    }
}

impl fmt::Display for QueryIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// QueryEnvelope
// =============================================================================

/// Structured request derived from one user utterance.
///
/// Immutable once built. An intent whose required parameters are missing is
/// downgraded to [`QueryIntent::Unknown`] at construction, so a
/// `FilterByGenre` envelope always carries a `genre`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct QueryEnvelope {
    intent: QueryIntent,
    parameters: Parameters,
    raw_text: String,
}

impl QueryEnvelope {
    pub fn new(intent: QueryIntent, parameters: Parameters, raw_text: impl Into<String>) -> Self {
        let raw_text = raw_text.into();
        let missing = intent
            .required_parameters()
            .iter()
            .any(|name| parameters.get(*name).map_or(true, Scalar::is_blank));

        if missing || intent == QueryIntent::Unknown {
            return Self::unknown(raw_text);
        }

        Self {
            intent,
            parameters,
            raw_text,
        }
    }

    /// An envelope for text that could not be classified.
    pub fn unknown(raw_text: impl Into<String>) -> Self {
        Self {
            intent: QueryIntent::Unknown,
            parameters: Parameters::new(),
            raw_text: raw_text.into(),
        }
    }

    pub fn intent(&self) -> QueryIntent {
        self.intent
    }

    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    pub fn param(&self, name: &str) -> Option<&Scalar> {
        self.parameters.get(name)
    }

    pub fn raw_text(&self) -> &str {
        &self.raw_text
    }

    pub fn is_unknown(&self) -> bool {
        self.intent == QueryIntent::Unknown
    }
}

// =============================================================================
// ResultEnvelope
// =============================================================================

/// Outcome category of a retrieval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultStatus {
    /// At least one row was returned.
    Ok,
    /// The query ran and matched nothing.
    Empty,
    /// The query could not be executed.
    Error,
}

/// Structured outcome of executing a [`QueryEnvelope`].
///
/// `Ok` always holds at least one row, `Empty` holds none, and `Error`
/// holds no rows but an internal detail string.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResultEnvelope {
    status: ResultStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    rows: Option<Vec<Row>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_detail: Option<String>,
}

impl ResultEnvelope {
    /// Build from a successful query. Zero rows yields `Empty`.
    pub fn from_rows(rows: Vec<Row>) -> Self {
        let status = if rows.is_empty() {
            ResultStatus::Empty
        } else {
            ResultStatus::Ok
        };
        Self {
            status,
            rows: Some(rows),
            error_detail: None,
        }
    }

    pub fn empty() -> Self {
        Self::from_rows(Vec::new())
    }

    pub fn error(detail: impl Into<String>) -> Self {
        Self {
            status: ResultStatus::Error,
            rows: None,
            error_detail: Some(detail.into()),
        }
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    /// Rows in query order. Empty for `Empty` and `Error`.
    pub fn rows(&self) -> &[Row] {
        self.rows.as_deref().unwrap_or(&[])
    }

    pub fn row_count(&self) -> usize {
        self.rows().len()
    }

    pub fn error_detail(&self) -> Option<&str> {
        self.error_detail.as_deref()
    }
}
