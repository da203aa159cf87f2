//! HTTP client for generative classification backends.
//!
//! Speaks to Ollama (`/api/generate`), OpenAI chat completions, Anthropic
//! messages, or a custom endpoint returning `response`/`text`/`content`.
//! Transport failures are mapped to connection/timeout errors and retried per
//! the configured policy; a reply that cannot be used is a response error and
//! is returned immediately.

use crate::backend::ClassifierBackend;
use crate::config::BackendConfig;
use crate::retry::{retry_transient, RetryPolicy};
use async_trait::async_trait;
use serde_json::{json, Value};
use stage_shared::{parse_reply, BackendError, BackendReply, StageError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

const OLLAMA_URL: &str = "http://127.0.0.1:11434";
const OPENAI_URL: &str = "https://api.openai.com/v1/chat/completions";
const ANTHROPIC_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub(crate) const SYSTEM_PROMPT: &str = "You are a task navigation assistant.";
pub(crate) const MAX_TOKENS: u32 = 150;
pub(crate) const TEMPERATURE: f64 = 0.3;

/// Availability checks use a shorter deadline than real calls
const AVAILABILITY_TIMEOUT: Duration = Duration::from_secs(5);
const AVAILABILITY_PROMPT: &str = "Test connection. Respond with: HELLO: Service available";

/// Max characters of an error body kept in log/error text
pub(crate) const ERROR_BODY_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Ollama,
    OpenAi,
    Anthropic,
    Custom,
    /// AWS Bedrock; served by `BedrockClient`
    Bedrock,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ollama => "ollama",
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Custom => "custom",
            Self::Bedrock => "bedrock",
        };
        write!(f, "{}", s)
    }
}

/// Infer the provider from the endpoint, then the model name
pub fn detect_provider(model: &str, endpoint: Option<&str>) -> Provider {
    if let Some(endpoint) = endpoint {
        let e = endpoint.to_lowercase();
        if e.contains("bedrock") || e.contains("amazonaws.com") {
            return Provider::Bedrock;
        }
        if e.contains("anthropic") {
            return Provider::Anthropic;
        }
        if e.contains("openai") {
            return Provider::OpenAi;
        }
        if e.contains("11434") || e.contains("ollama") {
            return Provider::Ollama;
        }
        return Provider::Custom;
    }

    let m = model.to_lowercase();
    let bedrock_vendor = ["anthropic.", "amazon.", "ai21.", "cohere.", "meta."]
        .iter()
        .any(|v| m.starts_with(v) || m.contains(&format!(".{}", v)));
    if bedrock_vendor {
        Provider::Bedrock
    } else if m.contains("gpt") || m.contains("davinci") {
        Provider::OpenAi
    } else if m.contains("claude") {
        Provider::Anthropic
    } else {
        Provider::Ollama
    }
}

/// Generative backend reached over HTTP
pub struct LlmClient {
    http_client: reqwest::Client,
    provider: Provider,
    model: String,
    url: String,
    api_key: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    available: OnceCell<bool>,
}

impl LlmClient {
    /// Build a client from the `[backend]` configuration block
    pub fn from_config(config: &BackendConfig) -> Result<Self, StageError> {
        let endpoint = config.endpoint.as_deref().filter(|e| !e.trim().is_empty());
        let provider = detect_provider(&config.model, endpoint);

        if provider == Provider::Bedrock {
            return Err(StageError::Config(format!(
                "model '{}' targets AWS Bedrock; use BedrockClient",
                config.model
            )));
        }

        let api_key = config.api_key.clone().filter(|k| !k.trim().is_empty());
        if api_key.is_none() && provider != Provider::Ollama {
            return Err(StageError::Config(format!(
                "api_key is required for the {} provider",
                provider
            )));
        }

        let url = match (provider, endpoint) {
            (Provider::Ollama, Some(base)) if base.trim_end_matches('/').ends_with("/api/generate") => {
                base.to_string()
            }
            (Provider::Ollama, base) => format!(
                "{}/api/generate",
                base.unwrap_or(OLLAMA_URL).trim_end_matches('/')
            ),
            (_, Some(endpoint)) => endpoint.to_string(),
            (Provider::OpenAi, None) => OPENAI_URL.to_string(),
            (Provider::Anthropic, None) => ANTHROPIC_URL.to_string(),
            (Provider::Custom, None) | (Provider::Bedrock, None) => {
                return Err(StageError::Config(
                    "custom provider requires an endpoint".to_string(),
                ))
            }
        };

        let timeout = config.timeout();
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StageError::Config(format!("failed to build HTTP client: {}", e)))?;

        info!(
            "LLM client initialized: provider={}, model={}, timeout={:?}",
            provider, config.model, timeout
        );

        Ok(Self {
            http_client,
            provider,
            model: config.model.clone(),
            url,
            api_key,
            timeout,
            retry: RetryPolicy::new(config.max_retries, config.retry_delay()),
            available: OnceCell::new(),
        })
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self, StageError> {
        self.http_client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StageError::Config(format!("failed to build HTTP client: {}", e)))?;
        self.timeout = timeout;
        Ok(self)
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Provider-specific JSON body for `prompt`
    pub fn request_body(&self, prompt: &str) -> Value {
        match self.provider {
            Provider::Ollama => json!({
                "model": self.model,
                "prompt": prompt,
                "stream": false
            }),
            Provider::OpenAi => json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": SYSTEM_PROMPT},
                    {"role": "user", "content": prompt}
                ],
                "temperature": TEMPERATURE,
                "max_tokens": MAX_TOKENS
            }),
            Provider::Anthropic => json!({
                "model": self.model,
                "system": SYSTEM_PROMPT,
                "messages": [{"role": "user", "content": prompt}],
                "max_tokens": MAX_TOKENS,
                "temperature": TEMPERATURE
            }),
            Provider::Custom | Provider::Bedrock => json!({
                "model": self.model,
                "prompt": prompt,
                "max_tokens": MAX_TOKENS,
                "temperature": TEMPERATURE
            }),
        }
    }

    /// Whether the backend answers at all. Checked once, then cached.
    pub async fn is_available(&self) -> bool {
        *self
            .available
            .get_or_init(|| async {
                match tokio::time::timeout(AVAILABILITY_TIMEOUT, self.classify(AVAILABILITY_PROMPT))
                    .await
                {
                    Ok(Ok(_)) => {
                        info!("LLM service is available");
                        true
                    }
                    Ok(Err(e)) => {
                        warn!("LLM service is not available: {}", e);
                        false
                    }
                    Err(_) => {
                        warn!("LLM availability check timed out");
                        false
                    }
                }
            })
            .await
    }

    /// One request/response exchange, no retries
    async fn call_once(&self, prompt: &str) -> Result<BackendReply, BackendError> {
        debug!(
            "Calling {} model {} ({} byte prompt)",
            self.provider,
            self.model,
            prompt.len()
        );

        let mut request = self.http_client.post(&self.url).json(&self.request_body(prompt));
        request = match self.provider {
            Provider::Anthropic => request
                .header("x-api-key", self.api_key.as_deref().unwrap_or_default())
                .header("anthropic-version", ANTHROPIC_VERSION),
            _ => match &self.api_key {
                Some(key) => request.bearer_auth(key),
                None => request,
            },
        };

        let response = request
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Connection(format!(
                "{} returned status {}: {}",
                self.provider,
                status,
                truncate(&body, ERROR_BODY_CHARS)
            )));
        }

        let json: Value = response.json().await.map_err(|e| {
            if e.is_timeout() {
                self.transport_error(e)
            } else {
                BackendError::Response(format!("invalid JSON body: {}", e))
            }
        })?;

        let text = extract_text(self.provider, &json).ok_or_else(|| {
            BackendError::Response(format!(
                "no completion text in {} response: {}",
                self.provider,
                truncate(&json.to_string(), ERROR_BODY_CHARS)
            ))
        })?;

        parse_reply(&text)
    }

    fn transport_error(&self, e: reqwest::Error) -> BackendError {
        if e.is_timeout() {
            BackendError::Timeout(format!("no response within {:?}", self.timeout))
        } else {
            BackendError::Connection(format!("failed to reach {}: {}", self.url, e))
        }
    }
}

#[async_trait]
impl ClassifierBackend for LlmClient {
    async fn classify(&self, prompt: &str) -> Result<BackendReply, BackendError> {
        let reply = retry_transient(&self.retry, move || self.call_once(prompt)).await?;
        info!("LLM classification successful: status={}", reply.status);
        Ok(reply)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Pull the completion text out of a provider response
pub fn extract_text(provider: Provider, json: &Value) -> Option<String> {
    let text = match provider {
        Provider::Ollama => json.get("response").and_then(Value::as_str),
        Provider::OpenAi => json
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str),
        Provider::Anthropic => json.pointer("/content/0/text").and_then(Value::as_str),
        Provider::Custom | Provider::Bedrock => ["response", "text", "content"]
            .iter()
            .find_map(|k| json.get(*k).and_then(Value::as_str)),
    };
    text.map(str::to_string)
}

pub(crate) fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
