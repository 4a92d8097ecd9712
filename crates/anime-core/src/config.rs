use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AnimeError, Result};

/// Top-level configuration for the anime assistant.
///
/// Loaded from `~/.anime-assistant/config.toml` by default. The binary reads
/// it once at startup and hands the relevant sections to each agent; nothing
/// below the binary reads environment variables.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnimeConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

impl AnimeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnimeConfig = toml::from_str(&content)?;
        config.validate()?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Save the current configuration to a TOML file.
    ///
    /// The LLM API key is never written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content =
            toml::to_string_pretty(self).map_err(|e| AnimeError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Reject values the agents cannot operate with.
    pub fn validate(&self) -> Result<()> {
        let r = &self.retrieval;
        if r.max_attempts == 0 {
            return Err(AnimeError::Config(
                "retrieval.max_attempts must be at least 1".to_string(),
            ));
        }
        if r.default_limit == 0 || r.max_limit == 0 {
            return Err(AnimeError::Config(
                "retrieval limits must be greater than zero".to_string(),
            ));
        }
        if r.default_limit > r.max_limit {
            return Err(AnimeError::Config(format!(
                "retrieval.default_limit ({}) exceeds retrieval.max_limit ({})",
                r.default_limit, r.max_limit
            )));
        }
        if self.llm.timeout_secs == 0 || self.store.timeout_secs == 0 {
            return Err(AnimeError::Config(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.chat.max_message_chars == 0 {
            return Err(AnimeError::Config(
                "chat.max_message_chars must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Data directory holding the SQLite catalog.
    pub data_dir: String,
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: "~/.anime-assistant/data".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

/// Language-understanding service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Use the language model for classification. When false the offline
    /// rule-based classifier is used.
    pub enabled: bool,
    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Environment variable the binary reads the API key from.
    pub api_key_env: String,
    /// API key. Filled in by the binary; never serialized.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Per-call timeout in seconds.
    pub timeout_secs: u64,
    /// Completion token budget for a classification reply.
    pub max_tokens: u32,
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            api_key: None,
            timeout_secs: 10,
            max_tokens: 300,
        }
    }
}

/// Table store settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file name, relative to `general.data_dir` unless absolute.
    pub database_file: String,
    /// Per-query timeout in seconds.
    pub timeout_secs: u64,
}

impl StoreConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_file: "anime.db".to_string(),
            timeout_secs: 5,
        }
    }
}

/// Retrieval Agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Total attempts per query, including the first.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each further attempt.
    pub initial_backoff_ms: u64,
    /// Row limit when the request names none.
    pub default_limit: u32,
    /// Upper bound for any requested limit.
    pub max_limit: u32,
    /// Score floor for top-rated lists without a year.
    pub min_top_score: f64,
}

impl RetrievalConfig {
    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 200,
            default_limit: 10,
            max_limit: 50,
            min_top_score: 7.0,
        }
    }
}

/// Conversation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatConfig {
    /// Longer messages are not sent to the classifier.
    pub max_message_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            max_message_chars: 2000,
        }
    }
}
