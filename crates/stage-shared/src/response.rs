//! User-facing response formatting.

use crate::intent::IntentCode;
use serde::{Deserialize, Serialize};

/// Status vocabulary at the response boundary: every intent plus ERROR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Next,
    Previous,
    Exit,
    Help,
    Care,
    Hello,
    Unknown,
    /// Input or context was rejected before classification
    Error,
}

impl From<IntentCode> for ResponseStatus {
    fn from(code: IntentCode) -> Self {
        match code {
            IntentCode::Next => Self::Next,
            IntentCode::Previous => Self::Previous,
            IntentCode::Exit => Self::Exit,
            IntentCode::Help => Self::Help,
            IntentCode::Care => Self::Care,
            IntentCode::Hello => Self::Hello,
            IntentCode::Unknown => Self::Unknown,
        }
    }
}

impl std::fmt::Display for ResponseStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Next => "NEXT",
            Self::Previous => "PREVIOUS",
            Self::Exit => "EXIT",
            Self::Help => "HELP",
            Self::Care => "CARE",
            Self::Hello => "HELLO",
            Self::Unknown => "UNKNOWN",
            Self::Error => "ERROR",
        };
        write!(f, "{}", s)
    }
}

/// Optional details that change the templated message
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseExtra {
    /// CARE only: the caregiver could not be reached
    pub notification_failed: bool,
    /// ERROR only: replaces the generic error text
    pub error_message: Option<String>,
}

impl ResponseExtra {
    pub fn notification_failed() -> Self {
        Self {
            notification_failed: true,
            error_message: None,
        }
    }

    pub fn error(message: &str) -> Self {
        Self {
            notification_failed: false,
            error_message: Some(message.to_string()),
        }
    }
}

/// `{status, message}` pair returned to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResponse {
    pub status: ResponseStatus,
    pub message: String,
}

impl ClassificationResponse {
    pub fn is_error(&self) -> bool {
        self.status == ResponseStatus::Error
    }
}

fn template(status: ResponseStatus) -> &'static str {
    match status {
        ResponseStatus::Next => "Moving forward to the next stage.",
        ResponseStatus::Previous => "Going back to the previous stage.",
        ResponseStatus::Exit => "Exiting the task flow.",
        ResponseStatus::Help => "Help is on the way. What do you need assistance with?",
        ResponseStatus::Care => "I understand you need support. A caregiver has been notified.",
        ResponseStatus::Hello => "Hello! How can I help you today?",
        ResponseStatus::Unknown => "I'm not sure what you mean. Could you rephrase that?",
        ResponseStatus::Error => "An error occurred while processing your request.",
    }
}

/// Build the response for a status. Pure; no side effects.
pub fn format_response(
    status: impl Into<ResponseStatus>,
    extra: Option<&ResponseExtra>,
) -> ClassificationResponse {
    let status = status.into();
    let mut message = template(status).to_string();

    if let Some(extra) = extra {
        match status {
            ResponseStatus::Care if extra.notification_failed => {
                message = "I understand you need support, but I couldn't reach the caregiver service."
                    .to_string();
            }
            ResponseStatus::Error => {
                if let Some(msg) = &extra.error_message {
                    message = msg.clone();
                }
            }
            _ => {}
        }
    }

    ClassificationResponse { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_intent_has_a_message() {
        for code in IntentCode::ALL {
            let resp = format_response(code, None);
            assert_eq!(resp.status.to_string(), code.to_string());
            assert!(!resp.message.is_empty());
        }
    }

    #[test]
    fn test_care_notification_failed() {
        let resp = format_response(IntentCode::Care, Some(&ResponseExtra::notification_failed()));
        assert!(resp.message.contains("couldn't reach the caregiver"));
        let resp = format_response(IntentCode::Care, None);
        assert!(resp.message.contains("caregiver has been notified"));
    }

    #[test]
    fn test_error_message_override() {
        let resp = format_response(ResponseStatus::Error, Some(&ResponseExtra::error("bad input")));
        assert!(resp.is_error());
        assert_eq!(resp.message, "bad input");
        // Extras for other statuses are ignored
        let resp = format_response(IntentCode::Next, Some(&ResponseExtra::error("ignored")));
        assert_eq!(resp.message, "Moving forward to the next stage.");
    }

    #[test]
    fn test_serializes_as_wire_json() {
        let resp = format_response(IntentCode::Hello, None);
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(
            json,
            r#"{"status":"HELLO","message":"Hello! How can I help you today?"}"#
        );
    }
}
