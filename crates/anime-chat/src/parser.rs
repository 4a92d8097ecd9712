//! Rule-based intent classifier.
//!
//! Classifies intent and extracts titles, genres, years and limits from raw
//! user input with compiled regex sets. Runs fully offline and is the
//! default classifier when no language model is configured.

use async_trait::async_trait;
use regex::Regex;
use std::sync::LazyLock;

use anime_core::types::QueryIntent;

use crate::classifier::{Classification, IntentClassifier};
use crate::error::ClassifyError;

// =============================================================================
// Compiled regex sets (compiled once, reused across calls)
// =============================================================================

struct IntentPatterns {
    statistics: Vec<Regex>,
    airing: Vec<Regex>,
    top_rated: Vec<Regex>,
    title: Vec<Regex>,
}

static INTENT_PATTERNS: LazyLock<IntentPatterns> = LazyLock::new(|| {
    let mk = |pats: &[&str]| -> Vec<Regex> {
        pats.iter()
            .map(|p| Regex::new(p).expect("Invalid intent regex"))
            .collect()
    };

    IntentPatterns {
        // Statistics patterns (checked first so "how many action anime" is a count)
        statistics: mk(&[
            r"(?i)\bstatistics\b",
            r"(?i)\bstats\b",
            r"(?i)\boverview\b",
            r"(?i)\bhow\s+many\s+(?:anime|titles|shows|series|entries)\b",
            r"(?i)\baverage\s+score\b",
            r"(?i)\bgenre\s+(?:distribution|breakdown|counts?)\b",
            r"(?i)\bmost\s+common\s+genres?\b",
        ]),
        airing: mk(&[
            r"(?i)\bcurrently\s+airing\b",
            r"(?i)\bnow\s+airing\b",
            r"(?i)\bairing\s+(?:now|right\s+now|currently|this\s+season)\b",
            r"(?i)\bwhat'?s\s+airing\b",
            r"(?i)\bstill\s+airing\b",
            r"(?i)\bon\s+air\b",
        ]),
        top_rated: mk(&[
            r"(?i)\btop[\s-]+rated\b",
            r"(?i)\bhighest[\s-]+(?:rated|scor\w*)\b",
            r"(?i)\bbest[\s-]+rated\b",
            r"(?i)\bbest\s+anime\b",
            r"(?i)\btop\s+\d{1,3}\b",
            r"(?i)\btop\s+anime\b",
        ]),
        // Each title pattern captures the title in group 1.
        title: mk(&[
            r#""([^"]+)""#,
            r"(?i)\btell\s+me\s+about\s+(.+)",
            r"(?i)\bwhat\s+is\s+(.+?)\s+about\b",
            r"(?i)\b(?:search\s+for|look\s+up|find|info(?:rmation)?\s+(?:on|about))\s+(.+)",
        ]),
    }
});

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").expect("Invalid year regex"));

static LIMIT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:top|first|show\s+me|list|give\s+me)\s+(\d{1,3})\b")
        .expect("Invalid limit regex")
});

static GENRE_TOPIC_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bgenres?\b").expect("Invalid topic regex"));

// Genre extraction: case-insensitive match for known genres
static KNOWN_GENRES: &[&str] = &[
    "Action",
    "Adventure",
    "Avant Garde",
    "Award Winning",
    "Comedy",
    "Drama",
    "Ecchi",
    "Fantasy",
    "Gourmet",
    "Historical",
    "Horror",
    "Isekai",
    "Mecha",
    "Military",
    "Music",
    "Mystery",
    "Psychological",
    "Romance",
    "School",
    "Sci-Fi",
    "Science Fiction",
    "Slice of Life",
    "Sports",
    "Supernatural",
    "Suspense",
];

static GENRE_RE: LazyLock<Regex> = LazyLock::new(|| {
    let alts: Vec<String> = KNOWN_GENRES.iter().map(|g| regex::escape(g)).collect();
    Regex::new(&format!(r"(?i)\b(?:{})\b", alts.join("|"))).expect("Invalid genre regex")
});

// =============================================================================
// RuleClassifier
// =============================================================================

/// Offline classifier built on keyword patterns.
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Classify a message. Unmatched text yields [`QueryIntent::Unknown`].
    pub fn classify_text(&self, raw: &str) -> Classification {
        let text = raw.trim();
        if text.is_empty() {
            return Classification::unknown();
        }
        let p = &*INTENT_PATTERNS;

        if p.statistics.iter().any(|re| re.is_match(text)) {
            let topic = if GENRE_TOPIC_RE.is_match(text) {
                "genres"
            } else {
                "overview"
            };
            return self.with_limit(
                Classification::new(QueryIntent::StatisticsLookup).with("topic", topic),
                text,
            );
        }

        if p.airing.iter().any(|re| re.is_match(text)) {
            return self.with_limit(Classification::new(QueryIntent::CurrentlyAiring), text);
        }

        if p.top_rated.iter().any(|re| re.is_match(text)) {
            let mut c = Classification::new(QueryIntent::TopRated);
            if let Some(year) = self.extract_year(text) {
                c = c.with("year", year);
            }
            return self.with_limit(c, text);
        }

        if let Some(title) = self.extract_title(text) {
            // "find action anime" names a genre, not a title.
            if let Some(genre) = genre_only(&title) {
                return self.with_limit(
                    Classification::new(QueryIntent::FilterByGenre).with("genre", genre),
                    text,
                );
            }
            return self.with_limit(
                Classification::new(QueryIntent::SearchByTitle).with("title", title),
                text,
            );
        }

        if let Some(genre) = self.extract_genre(text) {
            return self.with_limit(
                Classification::new(QueryIntent::FilterByGenre).with("genre", genre),
                text,
            );
        }

        Classification::unknown()
    }

    /// Extract a four-digit year between 1900 and 2099.
    pub fn extract_year(&self, text: &str) -> Option<i64> {
        YEAR_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }

    /// Extract an explicit result count ("top 5", "show me 20").
    pub fn extract_limit(&self, text: &str) -> Option<i64> {
        LIMIT_RE
            .captures(text)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
            .filter(|n: &i64| *n > 0)
    }

    /// Extract the first known genre, lowercased ("Sci-Fi" -> "sci-fi").
    pub fn extract_genre(&self, text: &str) -> Option<String> {
        GENRE_RE.find(text).map(|m| normalize_genre(m.as_str()))
    }

    /// Extract a title from phrasing like "tell me about X" or a quoted name.
    pub fn extract_title(&self, text: &str) -> Option<String> {
        INTENT_PATTERNS
            .title
            .iter()
            .filter_map(|re| re.captures(text))
            .filter_map(|c| c.get(1))
            .map(|m| clean_title(m.as_str()))
            .find(|t| !t.is_empty())
    }

    fn with_limit(&self, c: Classification, text: &str) -> Classification {
        match self.extract_limit(text) {
            Some(limit) => c.with("limit", limit),
            None => c,
        }
    }
}

#[async_trait]
impl IntentClassifier for RuleClassifier {
    fn name(&self) -> &'static str {
        "rules"
    }

    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        Ok(self.classify_text(text))
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn normalize_genre(matched: &str) -> String {
    let lower = matched.to_lowercase();
    match lower.as_str() {
        "science fiction" => "sci-fi".to_string(),
        _ => lower,
    }
}

/// Strip filler around a captured title.
fn clean_title(raw: &str) -> String {
    let mut title = raw
        .trim()
        .trim_end_matches(|c: char| matches!(c, '?' | '.' | '!'))
        .trim()
        .trim_matches(|c: char| matches!(c, '"' | '\''))
        .to_string();

    for prefix in ["the anime ", "anime "] {
        if let Some(head) = title.get(..prefix.len()) {
            if head.eq_ignore_ascii_case(prefix) {
                title = title[prefix.len()..].to_string();
            }
        }
    }
    for suffix in [" anime", " series", " show"] {
        let cut = title.len().saturating_sub(suffix.len());
        if let Some(tail) = title.get(cut..) {
            if tail.eq_ignore_ascii_case(suffix) {
                title.truncate(cut);
            }
        }
    }
    title.trim().to_string()
}

/// Returns the genre when the whole phrase is a genre name.
fn genre_only(phrase: &str) -> Option<String> {
    let m = GENRE_RE.find(phrase)?;
    (m.start() == 0 && m.end() == phrase.len()).then(|| normalize_genre(m.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anime_core::types::Scalar;

    fn classify(text: &str) -> Classification {
        RuleClassifier::new().classify_text(text)
    }

    // --- Intent classification ---

    #[test]
    fn test_top_rated_plain() {
        let c = classify("What are the top rated anime?");
        assert_eq!(c.intent, QueryIntent::TopRated);
        assert!(c.parameters.is_empty());
    }

    #[test]
    fn test_top_rated_with_year_and_limit() {
        let c = classify("top 5 anime from 2019");
        assert_eq!(c.intent, QueryIntent::TopRated);
        assert_eq!(c.parameters.get("year"), Some(&Scalar::Integer(2019)));
        assert_eq!(c.parameters.get("limit"), Some(&Scalar::Integer(5)));
    }

    #[test]
    fn test_highest_scored() {
        assert_eq!(classify("highest scored shows").intent, QueryIntent::TopRated);
    }

    #[test]
    fn test_genre_show_me() {
        let c = classify("Show me action anime");
        assert_eq!(c.intent, QueryIntent::FilterByGenre);
        assert_eq!(c.parameters.get("genre"), Some(&Scalar::from("action")));
    }

    #[test]
    fn test_genre_with_limit() {
        let c = classify("show me 3 romance anime");
        assert_eq!(c.intent, QueryIntent::FilterByGenre);
        assert_eq!(c.parameters.get("genre"), Some(&Scalar::from("romance")));
        assert_eq!(c.parameters.get("limit"), Some(&Scalar::Integer(3)));
    }

    #[test]
    fn test_genre_science_fiction_normalized() {
        let c = classify("any good science fiction?");
        assert_eq!(c.parameters.get("genre"), Some(&Scalar::from("sci-fi")));
    }

    #[test]
    fn test_find_genre_is_not_a_title() {
        let c = classify("find slice of life anime");
        assert_eq!(c.intent, QueryIntent::FilterByGenre);
        assert_eq!(c.parameters.get("genre"), Some(&Scalar::from("slice of life")));
    }

    #[test]
    fn test_title_tell_me_about() {
        let c = classify("Tell me about Cowboy Bebop");
        assert_eq!(c.intent, QueryIntent::SearchByTitle);
        assert_eq!(c.parameters.get("title"), Some(&Scalar::from("Cowboy Bebop")));
    }

    #[test]
    fn test_title_what_is_about() {
        let c = classify("What is Steins;Gate about?");
        assert_eq!(c.intent, QueryIntent::SearchByTitle);
        assert_eq!(c.parameters.get("title"), Some(&Scalar::from("Steins;Gate")));
    }

    #[test]
    fn test_title_quoted() {
        let c = classify(r#"anything on "Mob Psycho 100"?"#);
        assert_eq!(c.intent, QueryIntent::SearchByTitle);
        assert_eq!(c.parameters.get("title"), Some(&Scalar::from("Mob Psycho 100")));
    }

    #[test]
    fn test_title_strips_anime_suffix() {
        let c = classify("look up the anime Frieren");
        assert_eq!(c.parameters.get("title"), Some(&Scalar::from("Frieren")));
    }

    #[test]
    fn test_currently_airing() {
        assert_eq!(
            classify("What's currently airing?").intent,
            QueryIntent::CurrentlyAiring
        );
        assert_eq!(
            classify("anything airing this season").intent,
            QueryIntent::CurrentlyAiring
        );
    }

    #[test]
    fn test_statistics_overview() {
        let c = classify("Give me some stats about the catalog");
        assert_eq!(c.intent, QueryIntent::StatisticsLookup);
        assert_eq!(c.parameters.get("topic"), Some(&Scalar::from("overview")));
    }

    #[test]
    fn test_statistics_genres() {
        let c = classify("What's the genre distribution?");
        assert_eq!(c.intent, QueryIntent::StatisticsLookup);
        assert_eq!(c.parameters.get("topic"), Some(&Scalar::from("genres")));
    }

    #[test]
    fn test_statistics_beats_genre() {
        let c = classify("how many anime are there");
        assert_eq!(c.intent, QueryIntent::StatisticsLookup);
    }

    #[test]
    fn test_gibberish_is_unknown() {
        let c = classify("asdkjasdj");
        assert_eq!(c.intent, QueryIntent::Unknown);
        assert!(c.parameters.is_empty());
    }

    #[test]
    fn test_empty_is_unknown() {
        assert_eq!(classify("   ").intent, QueryIntent::Unknown);
    }

    #[test]
    fn test_case_insensitive() {
        assert_eq!(classify("TOP RATED").intent, QueryIntent::TopRated);
        assert_eq!(classify("SHOW ME HORROR").intent, QueryIntent::FilterByGenre);
    }

    // --- Extraction helpers ---

    #[test]
    fn test_extract_year_ignores_other_numbers() {
        let p = RuleClassifier::new();
        assert_eq!(p.extract_year("top 10"), None);
        assert_eq!(p.extract_year("best of 1998"), Some(1998));
        assert_eq!(p.extract_year("year 3000"), None);
    }

    #[test]
    fn test_extract_limit_rejects_zero() {
        let p = RuleClassifier::new();
        assert_eq!(p.extract_limit("top 0 anime"), None);
        assert_eq!(p.extract_limit("list 25 comedies"), Some(25));
    }

    #[tokio::test]
    async fn test_trait_classify_never_fails() {
        let c = RuleClassifier::new().classify("asdkjasdj").await.unwrap();
        assert_eq!(c.intent, QueryIntent::Unknown);
    }
}
