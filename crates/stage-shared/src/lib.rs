//! Shared types and pure logic for stage navigation.
//!
//! Everything here is free of I/O: intent vocabulary, the task/stage model,
//! the trigger pattern table, stage location, validators, response templates
//! and the parser for generative backend replies.

pub mod error;
pub mod intent;
pub mod locator;
pub mod patterns;
pub mod reply;
pub mod response;
pub mod task;
pub mod validate;

pub use error::{BackendError, StageError};
pub use intent::IntentCode;
pub use locator::{
    extract_current_stage, is_first_stage, is_last_stage, stage_position, StagePosition,
};
pub use patterns::PatternTable;
pub use reply::{parse_reply, BackendReply};
pub use response::{format_response, ClassificationResponse, ResponseExtra, ResponseStatus};
pub use task::{StageDescriptor, TaskContext};
pub use validate::{is_valid_input, is_valid_task_context, parse_task_context};
