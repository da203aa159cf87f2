//! Stage location.
//!
//! Resolves which stage the user is at, preferring an explicit mention in the
//! input ("at stage 2", "stage review") over the context's current stage, and
//! answers first/last boundary questions against the context's sequence.

use crate::task::TaskContext;
use once_cell::sync::Lazy;
use regex::Regex;

static STAGE_MENTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:at\s+)?stage\s+(\w+)").expect("stage mention pattern is valid")
});

/// Where a stage sits in its sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagePosition {
    /// Only stage: both first and last
    Only,
    First,
    Middle,
    Last,
}

impl std::fmt::Display for StagePosition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Only => "first and last",
            Self::First => "first",
            Self::Middle => "middle",
            Self::Last => "last",
        };
        write!(f, "{}", s)
    }
}

/// Stage mentioned in the text, else the context's current stage
pub fn extract_current_stage(text: &str, context: Option<&TaskContext>) -> Option<String> {
    let lowered = text.to_lowercase();
    if let Some(caps) = STAGE_MENTION.captures(&lowered) {
        return caps.get(1).map(|m| m.as_str().to_string());
    }
    context.and_then(|ctx| ctx.current_stage_id.clone())
}

pub fn is_first_stage(context: Option<&TaskContext>, stage_id: &str) -> bool {
    context
        .and_then(TaskContext::first_stage)
        .map(|s| s.id == stage_id)
        .unwrap_or(false)
}

pub fn is_last_stage(context: Option<&TaskContext>, stage_id: &str) -> bool {
    context
        .and_then(TaskContext::last_stage)
        .map(|s| s.id == stage_id)
        .unwrap_or(false)
}

/// Position of `stage_id` relative to the sequence boundaries.
///
/// Returns `None` when there is no context or no stages. A stage id that is
/// not at either end is reported as `Middle`, whether or not it appears in
/// the sequence.
pub fn stage_position(context: Option<&TaskContext>, stage_id: &str) -> Option<StagePosition> {
    let ctx = context?;
    if ctx.stages.is_empty() {
        return None;
    }
    let first = is_first_stage(Some(ctx), stage_id);
    let last = is_last_stage(Some(ctx), stage_id);
    Some(match (first, last) {
        (true, true) => StagePosition::Only,
        (true, false) => StagePosition::First,
        (false, true) => StagePosition::Last,
        (false, false) => StagePosition::Middle,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn abc() -> TaskContext {
        TaskContext::new("t", "d", "in progress")
            .with_stage("A", "first", 10.0)
            .with_stage("B", "middle", 10.0)
            .with_stage("C", "last", 10.0)
    }

    #[test]
    fn test_input_overrides_context() {
        let ctx = abc().with_current_stage("X");
        assert_eq!(
            extract_current_stage("I'm at stage 2", Some(&ctx)),
            Some("2".to_string())
        );
        assert_eq!(extract_current_stage("next please", Some(&ctx)), Some("X".to_string()));
        assert_eq!(extract_current_stage("help me", None), None);
    }

    #[test]
    fn test_mention_is_case_folded() {
        assert_eq!(
            extract_current_stage("AT STAGE Review now", None),
            Some("review".to_string())
        );
    }

    #[test]
    fn test_boundaries() {
        let ctx = abc();
        assert!(is_first_stage(Some(&ctx), "A"));
        assert!(!is_first_stage(Some(&ctx), "B"));
        assert!(is_last_stage(Some(&ctx), "C"));
        assert!(!is_last_stage(None, "C"));
        let empty = TaskContext::new("t", "d", "s");
        assert!(!is_first_stage(Some(&empty), "A"));
        assert!(!is_last_stage(Some(&empty), "A"));
    }

    #[test]
    fn test_positions() {
        let ctx = abc();
        assert_eq!(stage_position(Some(&ctx), "A"), Some(StagePosition::First));
        assert_eq!(stage_position(Some(&ctx), "B"), Some(StagePosition::Middle));
        assert_eq!(stage_position(Some(&ctx), "C"), Some(StagePosition::Last));
        let single = TaskContext::new("t", "d", "s").with_stage("only", "x", 0.0);
        assert_eq!(stage_position(Some(&single), "only"), Some(StagePosition::Only));
        assert_eq!(stage_position(None, "A"), None);
    }
}
