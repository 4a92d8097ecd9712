//! Language-model intent classifier.
//!
//! Sends the user's message with a fixed instruction to an OpenAI-compatible
//! chat completions endpoint and parses the JSON object in the reply.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use anime_core::config::LlmConfig;
use anime_core::types::{Parameters, QueryIntent, Scalar};

use crate::classifier::{Classification, IntentClassifier};
use crate::error::{ChatError, ClassifyError};

const SYSTEM_PROMPT: &str = r#"You translate questions about anime into a structured request for a catalog database.

Reply with exactly one JSON object and nothing else:
{"intent": "<intent>", "parameters": {...}}

Intents and their parameters:
- "search-by-title": a specific show. parameters: "title" (required), "limit" (optional integer)
- "filter-by-genre": shows of a genre. parameters: "genre" (required, lowercase, e.g. "action"), "limit" (optional)
- "top-rated": best scored shows. parameters: "year" (optional integer), "min_score" (optional number), "limit" (optional)
- "currently-airing": shows airing now. parameters: "limit" (optional)
- "statistics-lookup": catalog statistics. parameters: "topic" ("overview" or "genres"), "limit" (optional)
- "unknown": anything else. parameters: {}

Never invent parameters the user did not mention."#;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<CompletionMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct CompletionMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: CompletionMessageOwned,
}

#[derive(Deserialize)]
struct CompletionMessageOwned {
    #[serde(default)]
    content: Option<String>,
}

/// Classifier backed by a hosted language model.
pub struct LlmClassifier {
    client: Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
    timeout: Duration,
}

impl LlmClassifier {
    pub fn new(config: &LlmConfig) -> Result<Self, ChatError> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ChatError::LlmError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|k| !k.trim().is_empty()),
            max_tokens: config.max_tokens,
            timeout: config.timeout(),
        })
    }

    async fn complete(&self, text: &str) -> Result<String, ClassifyError> {
        let req = CompletionRequest {
            model: &self.model,
            messages: vec![
                CompletionMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                CompletionMessage {
                    role: "user",
                    content: text,
                },
            ],
            temperature: 0.0,
            max_tokens: self.max_tokens,
        };

        let mut builder = self.client.post(&self.endpoint).json(&req);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let res = builder.send().await.map_err(|e| self.map_transport(e))?;
        let status = res.status();
        if !status.is_success() {
            return Err(ClassifyError::Status {
                status: status.as_u16(),
                body: res.text().await.unwrap_or_default(),
            });
        }

        let parsed: CompletionResponse = res.json().await.map_err(|e| self.map_transport(e))?;
        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| ClassifyError::Malformed("reply has no content".to_string()))
    }

    fn map_transport(&self, err: reqwest::Error) -> ClassifyError {
        if err.is_timeout() {
            ClassifyError::Timeout(self.timeout)
        } else {
            ClassifyError::from(err)
        }
    }
}

#[async_trait]
impl IntentClassifier for LlmClassifier {
    fn name(&self) -> &'static str {
        "llm"
    }

    async fn classify(&self, text: &str) -> Result<Classification, ClassifyError> {
        let reply = self.complete(text).await?;
        debug!(model = %self.model, reply_len = reply.len(), "Classifier reply received");
        parse_reply(&reply)
    }
}

/// Parse a model reply into a [`Classification`].
///
/// Accepts a bare JSON object, a fenced ```json block, or an object embedded
/// in surrounding prose. The intent key may be `intent` or `query_type`.
pub fn parse_reply(reply: &str) -> Result<Classification, ClassifyError> {
    let json = extract_json(reply)
        .ok_or_else(|| ClassifyError::Malformed("no JSON object in reply".to_string()))?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| ClassifyError::Malformed(e.to_string()))?;

    let name = value
        .get("intent")
        .or_else(|| value.get("query_type"))
        .and_then(Value::as_str)
        .ok_or_else(|| ClassifyError::Malformed("missing intent".to_string()))?;
    let intent =
        QueryIntent::parse(name).ok_or_else(|| ClassifyError::UnknownIntent(name.to_string()))?;

    let mut parameters = Parameters::new();
    if let Some(Value::Object(map)) = value.get("parameters") {
        for (key, raw) in map {
            if let Some(scalar) = json_to_scalar(raw) {
                parameters.insert(key.clone(), scalar);
            }
        }
    }

    Ok(Classification { intent, parameters })
}

fn extract_json(reply: &str) -> Option<&str> {
    if let Some(start) = reply.find("```json") {
        let body = &reply[start + "```json".len()..];
        let end = body.find("```").unwrap_or(body.len());
        return Some(body[..end].trim());
    }
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    (end > start).then(|| &reply[start..=end])
}

fn json_to_scalar(value: &Value) -> Option<Scalar> {
    match value {
        Value::String(s) => Some(Scalar::Text(s.trim().to_string())),
        Value::Number(n) => n
            .as_i64()
            .map(Scalar::Integer)
            .or_else(|| n.as_f64().map(Scalar::Real)),
        Value::Null | Value::Bool(_) | Value::Array(_) | Value::Object(_) => None,
    }
}
