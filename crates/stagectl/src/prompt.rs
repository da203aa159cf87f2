//! Prompt construction for generative classification.

use stage_shared::{stage_position, IntentCode, TaskContext};

/// Fixed instruction block listing every code and its meaning
fn build_preamble() -> String {
    let codes = IntentCode::ALL
        .iter()
        .map(|c| format!("- {}: {}", c, c.meaning()))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are a task navigation assistant. Classify the user's message into exactly one status code.\n\
         Status codes:\n{}",
        codes
    )
}

/// Build the full classification prompt.
///
/// Includes task details and the stage position when a context is given.
pub fn build_classification_prompt(
    input: &str,
    context: Option<&TaskContext>,
    current_stage: Option<&str>,
) -> String {
    let mut prompt = build_preamble();

    if let Some(ctx) = context {
        prompt.push_str("\n\nTask context:");
        prompt.push_str(&format!("\nTask: {}", ctx.task_id));
        prompt.push_str(&format!("\nDescription: {}", ctx.description));
        if let Some(stage) = current_stage {
            prompt.push_str(&format!("\nCurrent stage: {}", stage));
            if let Some(position) = stage_position(Some(ctx), stage) {
                prompt.push_str(&format!(
                    "\nPosition: {} of {} stages",
                    position,
                    ctx.stages.len()
                ));
            }
        }
    }

    prompt.push_str(&format!("\n\nUser input: \"{}\"", input));
    prompt.push_str(
        "\n\nRespond with the status code followed by a short message, e.g. \"NEXT: Moving on\", \
         or JSON {\"status\": \"<CODE>\", \"message\": \"<text>\"}.",
    );
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_lists_every_code() {
        let prompt = build_classification_prompt("hello there", None, None);
        for code in IntentCode::ALL {
            assert!(prompt.contains(code.as_str()), "missing {}", code);
        }
        assert!(prompt.contains("User input: \"hello there\""));
        assert!(!prompt.contains("Task context"));
    }

    #[test]
    fn test_prompt_includes_task_and_position() {
        let ctx = TaskContext::new("laundry", "Wash clothes", "in progress")
            .with_stage("sort", "Sort", 60.0)
            .with_stage("wash", "Wash", 1800.0)
            .with_stage("dry", "Dry", 3600.0);

        let prompt = build_classification_prompt("next", Some(&ctx), Some("dry"));
        assert!(prompt.contains("Task: laundry"));
        assert!(prompt.contains("Description: Wash clothes"));
        assert!(prompt.contains("Current stage: dry"));
        assert!(prompt.contains("Position: last of 3 stages"));

        let prompt = build_classification_prompt("next", Some(&ctx), Some("wash"));
        assert!(prompt.contains("Position: middle of 3 stages"));

        let prompt = build_classification_prompt("next", Some(&ctx), None);
        assert!(!prompt.contains("Current stage"));
    }
}
