//! Parsing of generative backend replies.
//!
//! Accepts three shapes, in order:
//! - JSON object with string `status` and `message` fields
//! - `STATUS: message` text
//! - a bare leading status token followed by free text
//!
//! Unrecognised status tokens degrade to UNKNOWN. Text matching none of the
//! shapes is still a usable reply (UNKNOWN with the truncated text); only an
//! empty reply is an error.

use crate::error::BackendError;
use crate::intent::IntentCode;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

static STATUS_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^([A-Z]+)\s*:\s*(.+)$").expect("status line pattern is valid")
});

/// Max characters of unparseable text echoed back in the message
const UNPARSED_ECHO_CHARS: usize = 200;

/// Classification returned by a backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReply {
    pub status: IntentCode,
    pub message: String,
}

impl BackendReply {
    pub fn new(status: IntentCode, message: &str) -> Self {
        Self {
            status,
            message: message.to_string(),
        }
    }
}

/// Parse raw backend text into a reply
pub fn parse_reply(text: &str) -> Result<BackendReply, BackendError> {
    let t = text.trim();
    if t.is_empty() {
        return Err(BackendError::Response("reply is empty".to_string()));
    }

    if let Some(reply) = parse_json_reply(t) {
        return Ok(reply);
    }

    if let Some(caps) = STATUS_LINE.captures(t) {
        let token = &caps[1];
        let message = caps[2].trim();
        let status = IntentCode::parse(token).unwrap_or_else(|| {
            warn!("Invalid status code in text reply: {}", token);
            IntentCode::Unknown
        });
        return Ok(BackendReply::new(status, message));
    }

    let words: Vec<&str> = t.split_whitespace().collect();
    if let Some(first) = words.first() {
        let token = first.to_uppercase();
        let token = token.trim_end_matches([':', ',', '.']);
        if let Some(status) = IntentCode::parse(token) {
            let message = if words.len() > 1 {
                words[1..].join(" ")
            } else {
                t.to_string()
            };
            return Ok(BackendReply::new(status, message.trim()));
        }
    }

    warn!("Could not parse backend reply: {}", truncate_chars(t, 100));
    Ok(BackendReply {
        status: IntentCode::Unknown,
        message: format!(
            "Unable to parse LLM response: {}",
            truncate_chars(t, UNPARSED_ECHO_CHARS)
        ),
    })
}

fn parse_json_reply(t: &str) -> Option<BackendReply> {
    let value: Value = serde_json::from_str(t).ok()?;
    let obj = value.as_object()?;
    let status = obj.get("status")?.as_str()?;
    let message = obj.get("message")?.as_str()?;
    let code = IntentCode::parse(status).unwrap_or_else(|| {
        warn!("Invalid status code in JSON reply: {}", status);
        IntentCode::Unknown
    });
    Some(BackendReply::new(code, message))
}

fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
