//! Interpreting Agent: user text to query envelope, result envelope to prose.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use anime_core::config::{AnimeConfig, LlmConfig};
use anime_core::types::{QueryEnvelope, ResultEnvelope};

use crate::classifier::IntentClassifier;
use crate::error::ChatError;
use crate::llm::LlmClassifier;
use crate::parser::RuleClassifier;
use crate::response::ResponseGenerator;

/// Pick the classifier the configuration asks for.
pub fn classifier_from_config(config: &LlmConfig) -> Result<Arc<dyn IntentClassifier>, ChatError> {
    if config.enabled {
        Ok(Arc::new(LlmClassifier::new(config)?))
    } else {
        Ok(Arc::new(RuleClassifier::new()))
    }
}

/// Translates between the user's words and structured envelopes.
///
/// Holds no per-turn state; `interpret` never fails. Messages longer than
/// `max_message_chars` are classified offline by the rule classifier and
/// never sent to the configured classifier.
pub struct InterpretingAgent {
    classifier: Arc<dyn IntentClassifier>,
    offline: RuleClassifier,
    responses: ResponseGenerator,
    timeout: Duration,
    max_message_chars: usize,
}

impl InterpretingAgent {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        timeout: Duration,
        max_message_chars: usize,
    ) -> Self {
        Self {
            classifier,
            offline: RuleClassifier::new(),
            responses: ResponseGenerator::new(),
            timeout,
            max_message_chars,
        }
    }

    pub fn from_config(classifier: Arc<dyn IntentClassifier>, config: &AnimeConfig) -> Self {
        Self::new(
            classifier,
            config.llm.timeout(),
            config.chat.max_message_chars,
        )
    }

    /// Reject blank and over-length messages before they reach the classifier.
    pub fn validate_message<'a>(&self, text: &'a str) -> Result<&'a str, ChatError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        if trimmed.chars().count() > self.max_message_chars {
            return Err(ChatError::MessageTooLong(self.max_message_chars));
        }
        Ok(trimmed)
    }

    /// Classify `user_text` into an envelope.
    ///
    /// Any classifier failure, including a timeout, yields `unknown` with
    /// the raw text preserved.
    pub async fn interpret(&self, user_text: &str) -> QueryEnvelope {
        let text = match self.validate_message(user_text) {
            Ok(text) => text,
            Err(ChatError::MessageTooLong(max)) => {
                debug!(max, "Long message, using offline classifier");
                return self
                    .offline
                    .classify_text(user_text.trim())
                    .into_envelope(user_text);
            }
            Err(e) => {
                debug!("Message not classified: {}", e);
                return QueryEnvelope::unknown(user_text);
            }
        };

        let classifier = self.classifier.name();
        match tokio::time::timeout(self.timeout, self.classifier.classify(text)).await {
            Ok(Ok(classification)) => {
                let envelope = classification.into_envelope(user_text);
                debug!(classifier, intent = %envelope.intent(), "Message classified");
                envelope
            }
            Ok(Err(e)) => {
                warn!(classifier, "Classification failed: {}", e);
                QueryEnvelope::unknown(user_text)
            }
            Err(_) => {
                warn!(classifier, timeout = ?self.timeout, "Classification timed out");
                QueryEnvelope::unknown(user_text)
            }
        }
    }

    pub fn present(&self, result: &ResultEnvelope, original_text: &str) -> String {
        self.responses.present(result, original_text)
    }

    pub fn clarify(&self, original_text: &str) -> String {
        self.responses.clarify(original_text)
    }
}
