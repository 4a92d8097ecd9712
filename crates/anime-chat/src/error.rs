//! Error types for the conversational interface.

use std::time::Duration;

/// Errors from setting up or validating chat input.
///
/// Turn handling itself never fails; these surface during construction and
/// inside the Interpreting Agent before they are folded into `unknown`.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("message cannot be empty")]
    EmptyMessage,
    #[error("message exceeds maximum length of {0} characters")]
    MessageTooLong(usize),
    #[error("LLM error: {0}")]
    LlmError(String),
}

/// Failure of the language-understanding service.
#[derive(Debug, thiserror::Error)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Transport(String),
    #[error("classifier timed out after {0:?}")]
    Timeout(Duration),
    #[error("classifier returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("unparseable classifier reply: {0}")]
    Malformed(String),
    #[error("intent outside the enumeration: {0}")]
    UnknownIntent(String),
}

impl From<reqwest::Error> for ClassifyError {
    fn from(err: reqwest::Error) -> Self {
        ClassifyError::Transport(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_error_display() {
        let err = ChatError::EmptyMessage;
        assert_eq!(err.to_string(), "message cannot be empty");

        let err = ChatError::MessageTooLong(2000);
        assert_eq!(
            err.to_string(),
            "message exceeds maximum length of 2000 characters"
        );

        let err = ChatError::LlmError("bad endpoint".to_string());
        assert_eq!(err.to_string(), "LLM error: bad endpoint");
    }

    #[test]
    fn test_classify_error_display() {
        let err = ClassifyError::Timeout(Duration::from_secs(10));
        assert_eq!(err.to_string(), "classifier timed out after 10s");

        let err = ClassifyError::Status {
            status: 429,
            body: "rate limited".to_string(),
        };
        assert_eq!(err.to_string(), "classifier returned HTTP 429: rate limited");

        let err = ClassifyError::UnknownIntent("watch_history".to_string());
        assert_eq!(
            err.to_string(),
            "intent outside the enumeration: watch_history"
        );
    }
}
