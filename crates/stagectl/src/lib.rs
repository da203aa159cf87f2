//! Stagectl runtime: classification engine, generative backend client,
//! caregiver notifier and the stage manager that ties them together.

pub mod backend;
pub mod bedrock;
pub mod config;
pub mod engine;
pub mod llm_client;
pub mod manager;
pub mod notifier;
pub mod prompt;
pub mod retry;

pub use backend::{backend_from_config, ClassifierBackend, FakeBackend, FakeStep};
pub use bedrock::{model_family, BedrockClient, BedrockFamily};
pub use config::{BackendConfig, CaregiverConfig, StageConfig};
pub use engine::{ClassificationEngine, ClassificationOutcome, OutcomeSource};
pub use llm_client::{detect_provider, LlmClient, Provider};
pub use manager::StageManager;
pub use notifier::{CareNotification, CareNotifier, HttpCareNotifier, RecordingNotifier};
pub use prompt::build_classification_prompt;
pub use retry::{retry_transient, RetryPolicy};
