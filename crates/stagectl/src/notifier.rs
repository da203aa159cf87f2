//! Caregiver notification side-channel.
//!
//! Fired when input is classified as CARE. Delivery is best effort: a failed
//! notification changes the reply text, never the classification.

use crate::config::CaregiverConfig;
use async_trait::async_trait;
use chrono::Utc;
use serde::Serialize;
use stage_shared::{StageError, TaskContext};
use std::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

#[async_trait]
pub trait CareNotifier: Send + Sync {
    /// Returns true when the caregiver service accepted the notification
    async fn notify(&self, input: &str, context: Option<&TaskContext>) -> bool;
}

/// Body POSTed to the caregiver service
#[derive(Debug, Clone, Serialize)]
pub struct CareNotification {
    pub request_id: String,
    /// RFC 3339
    pub sent_at: String,
    pub input: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_stage: Option<String>,
}

impl CareNotification {
    pub fn new(input: &str, context: Option<&TaskContext>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            sent_at: Utc::now().to_rfc3339(),
            input: input.to_string(),
            task: context.map(|c| c.task_id.clone()),
            current_stage: context.and_then(|c| c.current_stage_id.clone()),
        }
    }
}

/// Notifier that POSTs JSON to a caregiver endpoint
pub struct HttpCareNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl HttpCareNotifier {
    pub fn from_config(config: &CaregiverConfig) -> Result<Self, StageError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| StageError::Config(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http_client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CareNotifier for HttpCareNotifier {
    async fn notify(&self, input: &str, context: Option<&TaskContext>) -> bool {
        let notification = CareNotification::new(input, context);

        match self.http_client.post(&self.url).json(&notification).send().await {
            Ok(resp) if resp.status().is_success() => {
                info!("Caregiver notified (request {})", notification.request_id);
                true
            }
            Ok(resp) => {
                warn!(
                    "Caregiver service at {} returned status {}",
                    self.url,
                    resp.status()
                );
                false
            }
            Err(e) => {
                warn!("Failed to reach caregiver service at {}: {}", self.url, e);
                false
            }
        }
    }
}

/// Notifier for tests: records every call and answers with a fixed result
pub struct RecordingNotifier {
    accept: bool,
    sent: Mutex<Vec<CareNotification>>,
}

impl RecordingNotifier {
    pub fn accepting() -> Self {
        Self {
            accept: true,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn rejecting() -> Self {
        Self {
            accept: false,
            sent: Mutex::new(Vec::new()),
        }
    }

    pub fn sent(&self) -> Vec<CareNotification> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl CareNotifier for RecordingNotifier {
    async fn notify(&self, input: &str, context: Option<&TaskContext>) -> bool {
        if let Ok(mut sent) = self.sent.lock() {
            sent.push(CareNotification::new(input, context));
        }
        self.accept
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_notification_payload() {
        let ctx = TaskContext::new("laundry", "Wash clothes", "in progress")
            .with_stage("wash", "Wash", 60.0)
            .with_current_stage("wash");
        let n = CareNotification::new("I'm scared", Some(&ctx));

        assert!(Uuid::parse_str(&n.request_id).is_ok());
        assert!(chrono::DateTime::parse_from_rfc3339(&n.sent_at).is_ok());

        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["input"], "I'm scared");
        assert_eq!(json["task"], "laundry");
        assert_eq!(json["current_stage"], "wash");
    }

    #[test]
    fn test_payload_without_context_omits_task() {
        let json = serde_json::to_value(CareNotification::new("help", None)).unwrap();
        assert!(json.get("task").is_none());
        assert!(json.get("current_stage").is_none());
    }

    #[tokio::test]
    async fn test_unreachable_caregiver_returns_false() {
        let notifier = HttpCareNotifier::from_config(&CaregiverConfig {
            url: "http://127.0.0.1:9/caregiver".to_string(),
            timeout_secs: 2.0,
        })
        .unwrap();
        assert!(!notifier.notify("I'm scared", None).await);
    }

    #[tokio::test]
    async fn test_recording_notifier() {
        let notifier = RecordingNotifier::rejecting();
        assert!(!notifier.notify("worried", None).await);
        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(notifier.sent()[0].input, "worried");
    }
}
