//! Response generation for chat turns.
//!
//! Composes human-readable answers from result envelopes without an LLM.
//! Output depends only on the envelope and the original text.

use anime_core::types::{ResultEnvelope, ResultStatus, Row, Scalar};

/// Columns rendered in the headline part of a row, in display order.
const HEADLINE_COLUMNS: &[&str] = &[
    "title",
    "title_english",
    "score",
    "year",
    "type",
    "episodes",
    "status",
    "genres",
];

/// Internal keys that are never shown.
const HIDDEN_COLUMNS: &[&str] = &["anime_id"];

const APOLOGY: &str =
    "Sorry, something went wrong while looking that up. Please try again in a moment.";

/// Generates chat prose from result envelopes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseGenerator;

impl ResponseGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Render a result envelope. Only rows present in the envelope appear.
    pub fn present(&self, result: &ResultEnvelope, original_text: &str) -> String {
        match result.status() {
            ResultStatus::Ok => self.list_rows(result.rows(), original_text),
            ResultStatus::Empty => format!(
                "I found 0 matches for {}. Try a different title, genre or year.",
                quote(original_text)
            ),
            ResultStatus::Error => APOLOGY.to_string(),
        }
    }

    /// Prompt shown when the message could not be understood.
    pub fn clarify(&self, original_text: &str) -> String {
        let opener = if original_text.trim().is_empty() {
            "I didn't catch a question there.".to_string()
        } else {
            format!("I'm not sure what you mean by {}.", quote(original_text))
        };
        format!(
            "{} I can help with:\n\
             - a specific show: \"Tell me about Cowboy Bebop\"\n\
             - a genre: \"Show me action anime\"\n\
             - the best rated: \"What are the top rated anime from 2019?\"\n\
             - what's on now: \"What's currently airing?\"\n\
             - catalog statistics: \"Show me genre stats\"",
            opener
        )
    }

    fn list_rows(&self, rows: &[Row], original_text: &str) -> String {
        let noun = if rows.len() == 1 { "result" } else { "results" };
        let mut out = format!("Found {} {} for {}:", rows.len(), noun, quote(original_text));
        for (idx, row) in rows.iter().enumerate() {
            out.push('\n');
            out.push_str(&format!("{}. {}", idx + 1, describe_row(row)));
        }
        out
    }
}

/// One line per row: title first, then known details, then other columns.
fn describe_row(row: &Row) -> String {
    let mut details = Vec::new();

    if let Some(score) = present_value(row, "score") {
        details.push(format!("score {}", format_scalar(score)));
    }
    if let Some(year) = present_value(row, "year") {
        details.push(year.to_string());
    }
    if let Some(kind) = present_value(row, "type") {
        details.push(kind.to_string());
    }
    if let Some(episodes) = present_value(row, "episodes") {
        let n = episodes.as_i64();
        details.push(match n {
            Some(1) => "1 episode".to_string(),
            _ => format!("{} episodes", episodes),
        });
    }
    if let Some(status) = present_value(row, "status") {
        details.push(status.to_string());
    }
    if let Some(genres) = present_value(row, "genres") {
        details.push(format!("genres: {}", genres));
    }
    for (name, value) in row {
        if HEADLINE_COLUMNS.contains(&name.as_str()) || HIDDEN_COLUMNS.contains(&name.as_str()) {
            continue;
        }
        details.push(format!("{}: {}", name, format_scalar(value)));
    }

    let title = present_value(row, "title").map(|t| {
        match present_value(row, "title_english") {
            Some(english) if english != t => format!("{} ({})", t, english),
            _ => t.to_string(),
        }
    });

    match (title, details.is_empty()) {
        (Some(title), true) => title,
        (Some(title), false) => format!("{} - {}", title, details.join(", ")),
        (None, _) => details.join(", "),
    }
}

fn present_value<'a>(row: &'a Row, column: &str) -> Option<&'a Scalar> {
    row.get(column).filter(|v| !v.is_blank())
}

fn format_scalar(value: &Scalar) -> String {
    match value {
        Scalar::Real(r) => format!("{:.2}", r),
        other => other.to_string(),
    }
}

fn quote(text: &str) -> String {
    format!("\"{}\"", text.trim())
}
