//! Stage manager: validation, classification, caregiver notification and
//! response formatting in one call.

use crate::config::StageConfig;
use crate::engine::ClassificationEngine;
use crate::backend::backend_from_config;
use crate::notifier::{CareNotifier, HttpCareNotifier};
use serde_json::Value;
use stage_shared::{
    format_response, is_valid_input, is_valid_task_context, parse_task_context,
    ClassificationResponse, IntentCode, PatternTable, ResponseExtra, ResponseStatus, TaskContext,
};
use std::sync::Arc;
use tracing::{error, info, warn};

const EMPTY_INPUT: &str = "Input cannot be empty or whitespace-only";
const INVALID_CONTEXT: &str = "Invalid task context structure";

pub struct StageManager {
    engine: ClassificationEngine,
    notifier: Option<Arc<dyn CareNotifier>>,
}

impl StageManager {
    pub fn new(engine: ClassificationEngine) -> Self {
        Self {
            engine,
            notifier: None,
        }
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn CareNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Build the full stack from configuration.
    ///
    /// A backend or caregiver block that cannot be used is logged and left
    /// out; the manager still works on patterns alone.
    pub fn from_config(config: &StageConfig) -> Self {
        let patterns = PatternTable::from_rules(config.classification_rules.as_ref());
        let mut engine = ClassificationEngine::new(patterns);

        if let Some(backend) = &config.backend {
            match backend_from_config(backend) {
                Ok(client) => engine = engine.with_backend(client),
                Err(e) => error!("Backend disabled, using patterns only: {}", e),
            }
        }

        let mut manager = Self::new(engine);

        if let Some(caregiver) = &config.caregiver {
            match HttpCareNotifier::from_config(caregiver) {
                Ok(notifier) => {
                    info!("Caregiver notifications go to {}", notifier.url());
                    manager = manager.with_notifier(Arc::new(notifier));
                }
                Err(e) => error!("Caregiver notifications disabled: {}", e),
            }
        }

        manager
    }

    pub fn engine(&self) -> &ClassificationEngine {
        &self.engine
    }

    pub fn has_notifier(&self) -> bool {
        self.notifier.is_some()
    }

    /// Classify `input` against an optional raw context and build the reply
    pub async fn classify(&self, input: &str, context: Option<&Value>) -> ClassificationResponse {
        if !is_valid_input(input) {
            return error_response(EMPTY_INPUT);
        }

        let context = match context {
            Some(raw) => {
                if !is_valid_task_context(raw) {
                    return error_response(INVALID_CONTEXT);
                }
                match TaskContext::from_value(raw) {
                    Ok(ctx) => Some(ctx),
                    Err(e) => {
                        warn!("Task context rejected: {}", e);
                        return error_response(INVALID_CONTEXT);
                    }
                }
            }
            None => None,
        };

        let status = self.engine.classify_intent(input, context.as_ref()).await;
        info!("Input classified as {}", status);

        if status == IntentCode::Care {
            let delivered = match &self.notifier {
                Some(notifier) => notifier.notify(input, context.as_ref()).await,
                None => {
                    warn!("CARE detected but no caregiver service is configured");
                    false
                }
            };
            if !delivered {
                return format_response(status, Some(&ResponseExtra::notification_failed()));
            }
        }

        format_response(status, None)
    }

    /// Like `classify`, with the context given as a JSON string
    pub async fn classify_json(&self, input: &str, context: Option<&str>) -> ClassificationResponse {
        match context {
            Some(json) => match parse_task_context(json) {
                Ok(value) => self.classify(input, Some(&value)).await,
                Err(e) => error_response(&format!("Invalid task context JSON: {}", e)),
            },
            None => self.classify(input, None).await,
        }
    }
}

fn error_response(message: &str) -> ClassificationResponse {
    format_response(ResponseStatus::Error, Some(&ResponseExtra::error(message)))
}
