//! AWS Bedrock backend.
//!
//! Claude 3 and later models go through the Converse API. Claude v2, Titan
//! and every other model get a family-specific InvokeModel JSON body.
//! Credentials come from the default AWS chain. SDK retries are disabled;
//! `retry_transient` owns retrying, same as the HTTP client.

use crate::backend::ClassifierBackend;
use crate::config::BackendConfig;
use crate::llm_client::{
    detect_provider, truncate, Provider, ERROR_BODY_CHARS, MAX_TOKENS, SYSTEM_PROMPT, TEMPERATURE,
};
use crate::retry::{retry_transient, RetryPolicy};
use async_trait::async_trait;
use aws_config::retry::RetryConfig;
use aws_config::timeout::TimeoutConfig;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, SdkError};
use aws_sdk_bedrockruntime::primitives::Blob;
use aws_sdk_bedrockruntime::types::{
    ContentBlock, ConversationRole, ConverseOutput, InferenceConfiguration, Message,
    SystemContentBlock,
};
use aws_sdk_bedrockruntime::Client;
use serde_json::{json, Value};
use stage_shared::{parse_reply, BackendError, BackendReply, StageError};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

pub const DEFAULT_REGION: &str = "us-east-1";

/// `api_key` value that means "use the default AWS credentials"
const DEFAULT_CREDENTIALS_KEY: &str = "bedrock";

const TOP_P: f64 = 0.9;

/// Request shape a Bedrock model expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BedrockFamily {
    /// Claude 3+ through the Converse API
    Converse,
    /// Claude v2 text completion body
    AnthropicLegacy,
    Titan,
    Generic,
}

impl std::fmt::Display for BedrockFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Converse => "converse",
            Self::AnthropicLegacy => "anthropic-legacy",
            Self::Titan => "titan",
            Self::Generic => "generic",
        };
        write!(f, "{}", s)
    }
}

pub fn model_family(model: &str) -> BedrockFamily {
    let m = model.to_lowercase();
    if m.contains("anthropic") {
        if ["claude-3", "sonnet-4", "opus-4"].iter().any(|v| m.contains(v)) {
            BedrockFamily::Converse
        } else {
            BedrockFamily::AnthropicLegacy
        }
    } else if m.contains("amazon") {
        BedrockFamily::Titan
    } else {
        BedrockFamily::Generic
    }
}

/// InvokeModel body for `family`. Converse models are not sent through here.
pub fn invoke_body(family: BedrockFamily, prompt: &str) -> Value {
    match family {
        BedrockFamily::AnthropicLegacy | BedrockFamily::Converse => json!({
            "prompt": format!("\n\nHuman: {}\n\nAssistant:", prompt),
            "max_tokens_to_sample": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "top_p": TOP_P
        }),
        BedrockFamily::Titan => json!({
            "inputText": prompt,
            "textGenerationConfig": {
                "maxTokenCount": MAX_TOKENS,
                "temperature": TEMPERATURE,
                "topP": TOP_P
            }
        }),
        BedrockFamily::Generic => json!({
            "prompt": prompt,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE
        }),
    }
}

/// Completion text from an InvokeModel response body
pub fn invoke_text(family: BedrockFamily, body: &Value) -> Option<String> {
    let text = match family {
        BedrockFamily::AnthropicLegacy | BedrockFamily::Converse => {
            body.get("completion").and_then(Value::as_str).map(str::to_string)
        }
        BedrockFamily::Titan => body
            .pointer("/results/0/outputText")
            .and_then(Value::as_str)
            .map(str::to_string),
        // Unknown vendors: common fields, else the whole body
        BedrockFamily::Generic => Some(
            ["text", "completion"]
                .iter()
                .find_map(|k| body.get(*k).and_then(Value::as_str))
                .map(str::to_string)
                .unwrap_or_else(|| body.to_string()),
        ),
    };
    text.filter(|t| !t.trim().is_empty())
}

/// User turn for the Converse API
pub fn converse_message(prompt: &str) -> Result<Message, BackendError> {
    Message::builder()
        .role(ConversationRole::User)
        .content(ContentBlock::Text(prompt.to_string()))
        .build()
        .map_err(|e| BackendError::Response(format!("invalid converse message: {}", e)))
}

pub fn inference_config() -> InferenceConfiguration {
    InferenceConfiguration::builder()
        .max_tokens(MAX_TOKENS as i32)
        .temperature(TEMPERATURE as f32)
        .build()
}

/// First text block of the assistant message
pub fn converse_text(output: Option<&ConverseOutput>) -> Option<String> {
    let message = output?.as_message().ok()?;
    message
        .content()
        .iter()
        .find_map(|block| block.as_text().ok())
        .filter(|t| !t.trim().is_empty())
        .cloned()
}

fn sdk_error<E, R>(e: SdkError<E, R>, timeout: Duration) -> BackendError
where
    E: std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    match e {
        SdkError::TimeoutError(_) => {
            BackendError::Timeout(format!("no response from Bedrock within {:?}", timeout))
        }
        other => BackendError::Connection(format!(
            "AWS Bedrock error: {}",
            DisplayErrorContext(&other)
        )),
    }
}

/// Generative backend on AWS Bedrock
pub struct BedrockClient {
    model: String,
    family: BedrockFamily,
    region: String,
    endpoint: Option<String>,
    timeout: Duration,
    retry: RetryPolicy,
    client: OnceCell<Client>,
}

impl BedrockClient {
    /// Build from the `[backend]` block. The SDK client is created on first use.
    pub fn from_config(config: &BackendConfig) -> Result<Self, StageError> {
        let endpoint = config.endpoint.as_deref().filter(|e| !e.trim().is_empty());
        if detect_provider(&config.model, endpoint) != Provider::Bedrock {
            return Err(StageError::Config(format!(
                "model '{}' is not a Bedrock model",
                config.model
            )));
        }
        if config.model.trim().is_empty() {
            return Err(StageError::Config("Bedrock model id is empty".to_string()));
        }

        match config.api_key.as_deref().map(str::trim) {
            None | Some("") => {}
            Some(key) if key.eq_ignore_ascii_case(DEFAULT_CREDENTIALS_KEY) => {}
            Some(_) => warn!("backend.api_key is ignored for Bedrock; using AWS credentials"),
        }

        let region = config
            .region
            .clone()
            .filter(|r| !r.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        let family = model_family(&config.model);
        let timeout = config.timeout();

        info!(
            "LLM client initialized: provider=bedrock, model={}, family={}, region={}, timeout={:?}",
            config.model, family, region, timeout
        );

        Ok(Self {
            model: config.model.clone(),
            family,
            region,
            // Only a full URL overrides the regional endpoint
            endpoint: endpoint
                .filter(|e| e.starts_with("http://") || e.starts_with("https://"))
                .map(str::to_string),
            timeout,
            retry: RetryPolicy::new(config.max_retries, config.retry_delay()),
            client: OnceCell::new(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn family(&self) -> BedrockFamily {
        self.family
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    async fn client(&self) -> &Client {
        self.client
            .get_or_init(|| async {
                let mut loader = aws_config::defaults(BehaviorVersion::latest())
                    .region(Region::new(self.region.clone()))
                    .retry_config(RetryConfig::disabled())
                    .timeout_config(
                        TimeoutConfig::builder()
                            .operation_timeout(self.timeout)
                            .build(),
                    );
                if let Some(endpoint) = &self.endpoint {
                    loader = loader.endpoint_url(endpoint.clone());
                }
                Client::new(&loader.load().await)
            })
            .await
    }

    async fn call_once(&self, prompt: &str) -> Result<BackendReply, BackendError> {
        debug!(
            "Calling bedrock model {} via {} ({} byte prompt)",
            self.model,
            self.family,
            prompt.len()
        );

        let text = match self.family {
            BedrockFamily::Converse => self.converse(prompt).await?,
            family => self.invoke(family, prompt).await?,
        };
        parse_reply(&text)
    }

    async fn converse(&self, prompt: &str) -> Result<String, BackendError> {
        let output = self
            .client()
            .await
            .converse()
            .model_id(&self.model)
            .messages(converse_message(prompt)?)
            .system(SystemContentBlock::Text(SYSTEM_PROMPT.to_string()))
            .inference_config(inference_config())
            .send()
            .await
            .map_err(|e| sdk_error(e, self.timeout))?;

        converse_text(output.output()).ok_or_else(|| {
            BackendError::Response(format!(
                "no text in Converse response: {}",
                truncate(&format!("{:?}", output.output()), ERROR_BODY_CHARS)
            ))
        })
    }

    async fn invoke(&self, family: BedrockFamily, prompt: &str) -> Result<String, BackendError> {
        let body = serde_json::to_vec(&invoke_body(family, prompt))
            .map_err(|e| BackendError::Response(format!("failed to encode body: {}", e)))?;

        let output = self
            .client()
            .await
            .invoke_model()
            .model_id(&self.model)
            .content_type("application/json")
            .accept("application/json")
            .body(Blob::new(body))
            .send()
            .await
            .map_err(|e| sdk_error(e, self.timeout))?;

        let json: Value = serde_json::from_slice(output.body().as_ref())
            .map_err(|e| BackendError::Response(format!("invalid JSON body: {}", e)))?;

        invoke_text(family, &json).ok_or_else(|| {
            BackendError::Response(format!(
                "no completion text in Bedrock response: {}",
                truncate(&json.to_string(), ERROR_BODY_CHARS)
            ))
        })
    }
}

#[async_trait]
impl ClassifierBackend for BedrockClient {
    async fn classify(&self, prompt: &str) -> Result<BackendReply, BackendError> {
        let reply = retry_transient(&self.retry, move || self.call_once(prompt)).await?;
        info!("LLM classification successful: status={}", reply.status);
        Ok(reply)
    }

    fn name(&self) -> &str {
        &self.model
    }
}
