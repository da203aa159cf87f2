//! Structural validation of user input and raw task context JSON.
//!
//! These checks run at the boundary, before a `TaskContext` is built. Every
//! rejection is logged with the reason; none of them panic or error.

use crate::error::StageError;
use serde_json::{Map, Value};
use tracing::{debug, warn};

const TASK_KEYS: &[&str] = &["task", "taskId", "task_id"];
const STAGE_ID_KEYS: &[&str] = &["stage", "id"];
const TIMEOUT_KEYS: &[&str] = &["timeout", "timeoutSeconds", "timeout_secs"];
const CURRENT_STAGE_KEYS: &[&str] = &["current_stage", "currentStageId", "current_stage_id"];

/// Input is usable when it has at least one non-whitespace character
pub fn is_valid_input(input: &str) -> bool {
    if input.trim().is_empty() {
        warn!("User input is empty or whitespace-only");
        return false;
    }
    debug!("User input validated ({} chars)", input.chars().count());
    true
}

fn field<'a>(obj: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
    keys.iter().find_map(|k| obj.get(*k))
}

/// More than one spelling of the same field present
fn has_alias_clash(obj: &Map<String, Value>, keys: &[&str]) -> bool {
    keys.iter().filter(|k| obj.contains_key(**k)).count() > 1
}

/// Check that a raw context has the shape `TaskContext` expects
pub fn is_valid_task_context(value: &Value) -> bool {
    let Some(obj) = value.as_object() else {
        warn!("Task context is not an object");
        return false;
    };

    for keys in [TASK_KEYS, CURRENT_STAGE_KEYS] {
        if has_alias_clash(obj, keys) {
            warn!("Task context sets '{}' more than once: {:?}", keys[0], keys);
            return false;
        }
    }

    for (name, keys) in [
        ("task", TASK_KEYS),
        ("description", &["description"][..]),
        ("status", &["status"][..]),
    ] {
        match field(obj, keys) {
            Some(Value::String(_)) => {}
            Some(_) => {
                warn!("Task context field '{}' must be a string", name);
                return false;
            }
            None => {
                warn!("Task context missing required field: {}", name);
                return false;
            }
        }
    }

    let Some(stages) = obj.get("stages") else {
        warn!("Task context missing required field: stages");
        return false;
    };
    let Some(stages) = stages.as_array() else {
        warn!("Task context 'stages' field must be a list");
        return false;
    };

    for (idx, stage) in stages.iter().enumerate() {
        let Some(stage) = stage.as_object() else {
            warn!("Stage at index {} is not an object", idx);
            return false;
        };

        for keys in [STAGE_ID_KEYS, TIMEOUT_KEYS] {
            if has_alias_clash(stage, keys) {
                warn!("Stage at index {} sets '{}' more than once", idx, keys[0]);
                return false;
            }
        }

        match field(stage, STAGE_ID_KEYS) {
            Some(Value::String(id)) if !id.trim().is_empty() => {}
            Some(Value::String(_)) => {
                warn!("Stage at index {} has an empty stage id", idx);
                return false;
            }
            _ => {
                warn!("Stage at index {} missing string field: stage", idx);
                return false;
            }
        }
        if !matches!(stage.get("description"), Some(Value::String(_))) {
            warn!("Stage at index {} missing string field: description", idx);
            return false;
        }
        match field(stage, TIMEOUT_KEYS).and_then(Value::as_f64) {
            Some(t) if t >= 0.0 => {}
            Some(t) => {
                warn!("Stage at index {} has negative timeout: {}", idx, t);
                return false;
            }
            None => {
                warn!("Stage at index {} has missing or non-numeric timeout", idx);
                return false;
            }
        }
    }

    if let Some(current) = field(obj, CURRENT_STAGE_KEYS) {
        if !current.is_string() && !current.is_null() {
            warn!("Task context 'current_stage' must be a string");
            return false;
        }
    }

    debug!("Task context validated ({} stages)", stages.len());
    true
}

/// Parse a JSON document into a raw context value
pub fn parse_task_context(json: &str) -> Result<Value, StageError> {
    if json.trim().is_empty() {
        return Err(StageError::InvalidContext(
            "task context JSON is empty".to_string(),
        ));
    }
    Ok(serde_json::from_str(json)?)
}
