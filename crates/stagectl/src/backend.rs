//! Generative backend capability.
//!
//! The engine depends only on this trait. Production code plugs in
//! `LlmClient` or `BedrockClient`; tests plug in `FakeBackend` with scripted
//! replies, so no network is needed to exercise the fallback paths.

use crate::bedrock::BedrockClient;
use crate::config::BackendConfig;
use crate::llm_client::{detect_provider, LlmClient, Provider};
use async_trait::async_trait;
use stage_shared::{BackendError, BackendReply, IntentCode, StageError};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

// ============================================================================
// Backend Trait
// ============================================================================

/// Free-text classification delegate
#[async_trait]
pub trait ClassifierBackend: Send + Sync {
    /// Classify a fully built prompt.
    ///
    /// Implementations own their retry policy; an error returned here is final.
    async fn classify(&self, prompt: &str) -> Result<BackendReply, BackendError>;

    /// Name used in log lines
    fn name(&self) -> &str;
}

/// Pick the client for the configured provider
pub fn backend_from_config(config: &BackendConfig) -> Result<Arc<dyn ClassifierBackend>, StageError> {
    let endpoint = config.endpoint.as_deref().filter(|e| !e.trim().is_empty());
    match detect_provider(&config.model, endpoint) {
        Provider::Bedrock => Ok(Arc::new(BedrockClient::from_config(config)?)),
        _ => Ok(Arc::new(LlmClient::from_config(config)?)),
    }
}

// ============================================================================
// Fake Backend (Testing)
// ============================================================================

/// Scripted step for `FakeBackend`
#[derive(Debug, Clone)]
pub enum FakeStep {
    Reply(BackendReply),
    Fail(BackendError),
    /// Sleep before replying; lets tests trip deadlines
    Stall(Duration, BackendReply),
    /// Panic inside the backend call
    Panic,
}

/// Backend returning pre-configured results in order.
///
/// When the script runs out the last step repeats; an empty script fails
/// every call with a connection error.
pub struct FakeBackend {
    steps: Mutex<VecDeque<FakeStep>>,
    last: Mutex<Option<FakeStep>>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl FakeBackend {
    pub fn new(steps: Vec<FakeStep>) -> Self {
        Self {
            steps: Mutex::new(steps.into()),
            last: Mutex::new(None),
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `status`
    pub fn replying(status: IntentCode, message: &str) -> Self {
        Self::new(vec![FakeStep::Reply(BackendReply::new(status, message))])
    }

    /// Always fail with `error`
    pub fn failing(error: BackendError) -> Self {
        Self::new(vec![FakeStep::Fail(error)])
    }

    /// Number of `classify` calls so far
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().map(|p| p.clone()).unwrap_or_default()
    }

    fn next_step(&self) -> Option<FakeStep> {
        let mut steps = self.steps.lock().ok()?;
        let mut last = self.last.lock().ok()?;
        if let Some(step) = steps.pop_front() {
            *last = Some(step.clone());
            return Some(step);
        }
        last.clone()
    }
}

#[async_trait]
impl ClassifierBackend for FakeBackend {
    async fn classify(&self, prompt: &str) -> Result<BackendReply, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        match self.next_step() {
            Some(FakeStep::Reply(reply)) => Ok(reply),
            Some(FakeStep::Fail(err)) => Err(err),
            Some(FakeStep::Stall(delay, reply)) => {
                tokio::time::sleep(delay).await;
                Ok(reply)
            }
            Some(FakeStep::Panic) => panic!("fake backend panicked"),
            None => Err(BackendError::Connection("fake backend has no script".to_string())),
        }
    }

    fn name(&self) -> &str {
        "fake"
    }
}
