//! Language-understanding seam used by the Interpreting Agent.

use async_trait::async_trait;

use anime_core::types::{Parameters, QueryEnvelope, QueryIntent};

use crate::error::ClassifyError;

/// An intent with the parameters extracted for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub intent: QueryIntent,
    pub parameters: Parameters,
}

impl Classification {
    pub fn new(intent: QueryIntent) -> Self {
        Self {
            intent,
            parameters: Parameters::new(),
        }
    }

    pub fn unknown() -> Self {
        Self::new(QueryIntent::Unknown)
    }

    /// Builder-style parameter setter.
    pub fn with(mut self, name: &str, value: impl Into<anime_core::types::Scalar>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    /// Wrap into an envelope; missing required parameters downgrade to
    /// `unknown`.
    pub fn into_envelope(self, raw_text: &str) -> QueryEnvelope {
        QueryEnvelope::new(self.intent, self.parameters, raw_text)
    }
}

/// Turns free text into a [`Classification`].
#[async_trait]
pub trait IntentClassifier: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use anime_core::types::Scalar;

    #[test]
    fn test_into_envelope_keeps_parameters() {
        let env = Classification::new(QueryIntent::FilterByGenre)
            .with("genre", "action")
            .with("limit", 5)
            .into_envelope("Show me 5 action anime");
        assert_eq!(env.intent(), QueryIntent::FilterByGenre);
        assert_eq!(env.param("genre"), Some(&Scalar::from("action")));
        assert_eq!(env.param("limit"), Some(&Scalar::Integer(5)));
    }

    #[test]
    fn test_into_envelope_downgrades_missing_genre() {
        let env = Classification::new(QueryIntent::FilterByGenre).into_envelope("show me anime");
        assert!(env.is_unknown());
        assert_eq!(env.raw_text(), "show me anime");
    }
}
