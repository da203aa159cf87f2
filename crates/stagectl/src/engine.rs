//! Classification engine.
//!
//! Order of decision:
//! 1. Empty input is UNKNOWN.
//! 2. If a backend is configured, ask it. Its answer is returned as-is; any
//!    failure, deadline or panic falls through to the pattern scan.
//! 3. Pattern scan over the trigger table, first match wins.
//! 4. Boundary suppression: PREVIOUS at the first stage and NEXT at the last
//!    stage become UNKNOWN. Backend answers are not suppressed.
//! 5. No match is UNKNOWN.
//!
//! The engine holds no mutable state; share it behind an `Arc`. Dropping a
//! classification future aborts its in-flight backend call.

use crate::backend::ClassifierBackend;
use crate::prompt::build_classification_prompt;
use stage_shared::{
    extract_current_stage, is_first_stage, is_last_stage, BackendReply, IntentCode, PatternTable,
    TaskContext,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Which path produced the final status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeSource {
    Backend,
    Patterns,
    /// Nothing matched (or the input was empty)
    Default,
}

/// Result of one classification call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationOutcome {
    pub status: IntentCode,
    /// Message from the backend when it produced the status
    pub raw_backend_message: Option<String>,
    pub source: OutcomeSource,
}

impl ClassificationOutcome {
    fn unknown() -> Self {
        Self {
            status: IntentCode::Unknown,
            raw_backend_message: None,
            source: OutcomeSource::Default,
        }
    }

    fn from_patterns(status: IntentCode) -> Self {
        Self {
            status,
            raw_backend_message: None,
            source: OutcomeSource::Patterns,
        }
    }
}

/// Aborts the spawned backend call when the classifying future is dropped
struct AbortOnDrop(tokio::task::AbortHandle);

impl Drop for AbortOnDrop {
    fn drop(&mut self) {
        self.0.abort();
    }
}

pub struct ClassificationEngine {
    patterns: PatternTable,
    backend: Option<Arc<dyn ClassifierBackend>>,
    backend_deadline: Option<Duration>,
}

impl Default for ClassificationEngine {
    fn default() -> Self {
        Self::new(PatternTable::default())
    }
}

impl ClassificationEngine {
    /// Pattern-only engine
    pub fn new(patterns: PatternTable) -> Self {
        Self {
            patterns,
            backend: None,
            backend_deadline: None,
        }
    }

    /// Delegate to a generative backend before falling back to patterns
    pub fn with_backend(mut self, backend: Arc<dyn ClassifierBackend>) -> Self {
        self.backend = Some(backend);
        self
    }

    /// Abort a backend call that runs longer than `deadline` (retries included)
    pub fn with_backend_deadline(mut self, deadline: Duration) -> Self {
        self.backend_deadline = Some(deadline);
        self
    }

    pub fn patterns(&self) -> &PatternTable {
        &self.patterns
    }

    pub fn has_backend(&self) -> bool {
        self.backend.is_some()
    }

    /// Classify input to an intent code. Never fails.
    pub async fn classify_intent(&self, input: &str, context: Option<&TaskContext>) -> IntentCode {
        self.classify_detailed(input, context).await.status
    }

    /// Classify and report which path decided
    pub async fn classify_detailed(
        &self,
        input: &str,
        context: Option<&TaskContext>,
    ) -> ClassificationOutcome {
        if input.trim().is_empty() {
            debug!("Empty input, returning UNKNOWN");
            return ClassificationOutcome::unknown();
        }

        let current_stage = extract_current_stage(input, context);

        if let Some(backend) = &self.backend {
            let prompt = build_classification_prompt(input, context, current_stage.as_deref());
            if let Some(reply) = self.delegate(backend, prompt).await {
                info!(
                    "Backend {} classified input as {}",
                    backend.name(),
                    reply.status
                );
                return ClassificationOutcome {
                    status: reply.status,
                    raw_backend_message: Some(reply.message),
                    source: OutcomeSource::Backend,
                };
            }
            info!("Falling back to pattern matching");
        }

        self.match_patterns(input, context, current_stage.as_deref())
    }

    /// Pattern path only; synchronous, ignores any configured backend
    pub fn classify_with_patterns(&self, input: &str, context: Option<&TaskContext>) -> IntentCode {
        if input.trim().is_empty() {
            return IntentCode::Unknown;
        }
        let current_stage = extract_current_stage(input, context);
        self.match_patterns(input, context, current_stage.as_deref())
            .status
    }

    pub fn extract_stage_info(&self, input: &str, context: Option<&TaskContext>) -> Option<String> {
        extract_current_stage(input, context)
    }

    pub fn is_at_first_stage(&self, context: Option<&TaskContext>, stage_id: &str) -> bool {
        is_first_stage(context, stage_id)
    }

    pub fn is_at_last_stage(&self, context: Option<&TaskContext>, stage_id: &str) -> bool {
        is_last_stage(context, stage_id)
    }

    fn match_patterns(
        &self,
        input: &str,
        context: Option<&TaskContext>,
        current_stage: Option<&str>,
    ) -> ClassificationOutcome {
        let normalized = input.trim().to_lowercase();

        let Some((code, trigger)) = self.patterns.first_match(&normalized) else {
            debug!("No trigger matched, returning UNKNOWN");
            return ClassificationOutcome::unknown();
        };
        debug!("Trigger '{}' matched {}", trigger, code);

        if let (Some(ctx), Some(stage)) = (context, current_stage) {
            if code == IntentCode::Previous && is_first_stage(Some(ctx), stage) {
                info!("PREVIOUS suppressed at first stage '{}'", stage);
                return ClassificationOutcome::from_patterns(IntentCode::Unknown);
            }
            if code == IntentCode::Next && is_last_stage(Some(ctx), stage) {
                info!("NEXT suppressed at last stage '{}'", stage);
                return ClassificationOutcome::from_patterns(IntentCode::Unknown);
            }
        }

        ClassificationOutcome::from_patterns(code)
    }

    /// Run the backend on its own task so a panic or deadline cannot take the
    /// caller down. The task never outlives this call. `None` means fall back
    /// to patterns.
    async fn delegate(
        &self,
        backend: &Arc<dyn ClassifierBackend>,
        prompt: String,
    ) -> Option<BackendReply> {
        let backend = Arc::clone(backend);
        let mut handle = tokio::spawn(async move { backend.classify(&prompt).await });
        let _abort = AbortOnDrop(handle.abort_handle());

        let joined = match self.backend_deadline {
            Some(deadline) => match tokio::time::timeout(deadline, &mut handle).await {
                Ok(joined) => joined,
                Err(_) => {
                    warn!("Backend call exceeded {:?}, aborted", deadline);
                    return None;
                }
            },
            None => handle.await,
        };

        match joined {
            Ok(Ok(reply)) => Some(reply),
            Ok(Err(e)) => {
                warn!("Backend {} failure: {}", e.kind(), e);
                None
            }
            Err(e) => {
                error!("Backend task failed: {}", e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sync_pattern_path() {
        let engine = ClassificationEngine::default();
        assert_eq!(engine.classify_with_patterns("let's continue", None), IntentCode::Next);
        assert_eq!(engine.classify_with_patterns("", None), IntentCode::Unknown);
        assert_eq!(engine.classify_with_patterns("   ", None), IntentCode::Unknown);
        assert_eq!(engine.classify_with_patterns("xyz", None), IntentCode::Unknown);
    }

    #[tokio::test]
    async fn test_no_backend_reports_source() {
        let engine = ClassificationEngine::default();
        let outcome = engine.classify_detailed("I'm scared", None).await;
        assert_eq!(outcome.status, IntentCode::Care);
        assert_eq!(outcome.source, OutcomeSource::Patterns);
        assert!(outcome.raw_backend_message.is_none());

        let outcome = engine.classify_detailed("xyz", None).await;
        assert_eq!(outcome.source, OutcomeSource::Default);
    }
}
