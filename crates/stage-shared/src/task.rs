//! Task and stage model.
//!
//! A task is an ordered sequence of stages. Order is significant: the first
//! and last entries define the boundaries where backward and forward moves
//! are suppressed. Contexts are built once from validated JSON and passed by
//! shared reference; nothing downstream mutates them.

use crate::error::StageError;
use crate::validate::is_valid_task_context;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One stage of a task flow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageDescriptor {
    #[serde(rename = "stage", alias = "id")]
    pub id: String,

    pub description: String,

    /// Advisory only; nothing in this crate enforces it
    #[serde(rename = "timeout", alias = "timeoutSeconds", alias = "timeout_secs")]
    pub timeout_secs: f64,
}

impl StageDescriptor {
    pub fn new(id: &str, description: &str, timeout_secs: f64) -> Self {
        Self {
            id: id.to_string(),
            description: description.to_string(),
            timeout_secs,
        }
    }
}

/// Caller-supplied context for a single classification call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskContext {
    #[serde(rename = "task", alias = "taskId", alias = "task_id")]
    pub task_id: String,

    pub description: String,

    pub status: String,

    #[serde(default)]
    pub stages: Vec<StageDescriptor>,

    #[serde(
        rename = "current_stage",
        alias = "currentStageId",
        alias = "current_stage_id",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub current_stage_id: Option<String>,
}

impl TaskContext {
    pub fn new(task_id: &str, description: &str, status: &str) -> Self {
        Self {
            task_id: task_id.to_string(),
            description: description.to_string(),
            status: status.to_string(),
            stages: Vec::new(),
            current_stage_id: None,
        }
    }

    /// Append a stage (builder style)
    pub fn with_stage(mut self, id: &str, description: &str, timeout_secs: f64) -> Self {
        self.stages.push(StageDescriptor::new(id, description, timeout_secs));
        self
    }

    /// Set the stage the caller believes is current
    pub fn with_current_stage(mut self, id: &str) -> Self {
        self.current_stage_id = Some(id.to_string());
        self
    }

    pub fn first_stage(&self) -> Option<&StageDescriptor> {
        self.stages.first()
    }

    pub fn last_stage(&self) -> Option<&StageDescriptor> {
        self.stages.last()
    }

    /// Build a typed context from raw JSON, rejecting structurally invalid input
    pub fn from_value(value: &Value) -> Result<Self, StageError> {
        if !is_valid_task_context(value) {
            return Err(StageError::InvalidContext(
                "task context failed structural validation".to_string(),
            ));
        }
        serde_json::from_value(value.clone())
            .map_err(|e| StageError::InvalidContext(e.to_string()))
    }

    pub fn to_value(&self) -> Result<Value, StageError> {
        Ok(serde_json::to_value(self)?)
    }
}
