//! Intent to SQL template mapping.
//!
//! Every template is fixed SQL text. Values from the envelope are passed as
//! positional parameters; nothing from user input is spliced into SQL.

use anime_core::config::RetrievalConfig;
use anime_core::store::BoundQuery;
use anime_core::types::{QueryEnvelope, QueryIntent, Scalar};

/// Shared select list for anime listings, with a comma-joined, sorted `genres`.
macro_rules! anime_listing {
    ($where:literal, $limit:literal) => {
        concat!(
            "SELECT a.anime_id, a.title, a.title_english, a.score, a.year, a.type, ",
            "a.episodes, a.status, ",
            "(SELECT GROUP_CONCAT(g.genre_name, ', ' ORDER BY g.genre_name) FROM anime_genres g ",
            "WHERE g.anime_id = a.anime_id) AS genres ",
            "FROM anime a ",
            $where,
            " ORDER BY a.score DESC NULLS LAST, a.anime_id ASC LIMIT ",
            $limit
        )
    };
}

pub const SEARCH_BY_TITLE: &str = anime_listing!(
    "WHERE LOWER(a.title) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\' \
     OR LOWER(COALESCE(a.title_english, '')) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\'",
    "?2"
);

pub const FILTER_BY_GENRE: &str = anime_listing!(
    "WHERE EXISTS (SELECT 1 FROM anime_genres eg WHERE eg.anime_id = a.anime_id \
     AND LOWER(eg.genre_name) LIKE '%' || LOWER(?1) || '%' ESCAPE '\\')",
    "?2"
);

pub const TOP_RATED: &str = anime_listing!("WHERE a.score IS NOT NULL AND a.score >= ?1", "?2");

pub const TOP_RATED_FOR_YEAR: &str =
    anime_listing!("WHERE a.score IS NOT NULL AND a.year = ?1", "?2");

pub const CURRENTLY_AIRING: &str =
    anime_listing!("WHERE LOWER(COALESCE(a.status, '')) = 'currently airing'", "?1");

pub const STATISTICS_OVERVIEW: &str = "SELECT COUNT(*) AS anime_count, \
     ROUND(AVG(score), 2) AS average_score, \
     COUNT(score) AS scored_count, \
     MIN(year) AS earliest_year, \
     MAX(year) AS latest_year \
     FROM anime";

pub const GENRE_DISTRIBUTION: &str = "SELECT genre_name AS genre, COUNT(*) AS anime_count \
     FROM anime_genres \
     GROUP BY genre_name \
     ORDER BY anime_count DESC, genre_name ASC \
     LIMIT ?1";

/// Build the bound query for an envelope. `None` for `unknown`.
pub fn plan(envelope: &QueryEnvelope, config: &RetrievalConfig) -> Option<BoundQuery> {
    let limit = Scalar::Integer(resolve_limit(envelope, config));

    let query = match envelope.intent() {
        QueryIntent::SearchByTitle => BoundQuery::new(
            "search_by_title",
            SEARCH_BY_TITLE,
            vec![like_param(envelope, "title")?, limit],
        ),
        QueryIntent::FilterByGenre => BoundQuery::new(
            "filter_by_genre",
            FILTER_BY_GENRE,
            vec![like_param(envelope, "genre")?, limit],
        ),
        QueryIntent::TopRated => match envelope.param("year").and_then(Scalar::as_i64) {
            Some(year) => BoundQuery::new(
                "top_rated_for_year",
                TOP_RATED_FOR_YEAR,
                vec![Scalar::Integer(year), limit],
            ),
            None => {
                let min_score = envelope
                    .param("min_score")
                    .and_then(Scalar::as_f64)
                    .unwrap_or(config.min_top_score);
                BoundQuery::new("top_rated", TOP_RATED, vec![Scalar::Real(min_score), limit])
            }
        },
        QueryIntent::CurrentlyAiring => {
            BoundQuery::new("currently_airing", CURRENTLY_AIRING, vec![limit])
        }
        QueryIntent::StatisticsLookup => {
            let topic = envelope
                .param("topic")
                .and_then(Scalar::as_text)
                .map(|t| t.trim().to_ascii_lowercase());
            match topic.as_deref() {
                Some("genres") | Some("genre") => {
                    BoundQuery::new("genre_distribution", GENRE_DISTRIBUTION, vec![limit])
                }
                _ => BoundQuery::new("statistics_overview", STATISTICS_OVERVIEW, vec![]),
            }
        }
        QueryIntent::Unknown => return None,
    };
    Some(query)
}

/// Requested limit clamped to `1..=max_limit`; the default when absent or
/// not a number.
pub fn resolve_limit(envelope: &QueryEnvelope, config: &RetrievalConfig) -> i64 {
    let max = i64::from(config.max_limit.max(1));
    envelope
        .param("limit")
        .and_then(Scalar::as_i64)
        .unwrap_or_else(|| i64::from(config.default_limit))
        .clamp(1, max)
}

/// A required text parameter for a `LIKE ... ESCAPE '\'` clause, matched
/// literally. Numbers are accepted as text ("86").
fn like_param(envelope: &QueryEnvelope, name: &str) -> Option<Scalar> {
    envelope
        .param(name)
        .filter(|v| !v.is_blank())
        .map(|v| Scalar::Text(escape_like(v.to_string().trim())))
}

/// Escape the `LIKE` wildcards `%` and `_` and the escape character itself.
fn escape_like(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
