//! Command handlers for stagectl.

use anyhow::{bail, Context, Result};
use stage_shared::{
    extract_current_stage, is_valid_task_context, parse_task_context, PatternTable, TaskContext,
};
use stagectl::{ClassificationEngine, StageConfig, StageManager};
use std::fs;
use std::path::Path;

fn read_context(path: &Path) -> Result<String> {
    fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))
}

/// Handle classify command
pub async fn classify(
    input: &str,
    context: Option<&Path>,
    config: Option<&Path>,
    patterns_only: bool,
) -> Result<()> {
    let config = StageConfig::load(config)?;

    let manager = if patterns_only {
        let patterns = PatternTable::from_rules(config.classification_rules.as_ref());
        StageManager::new(ClassificationEngine::new(patterns))
    } else {
        StageManager::from_config(&config)
    };

    let context = context.map(read_context).transpose()?;
    let response = manager.classify_json(input, context.as_deref()).await;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

/// Handle stage command
pub fn stage(input: &str, context: Option<&Path>) -> Result<()> {
    let context = match context {
        Some(path) => {
            let value = parse_task_context(&read_context(path)?)?;
            Some(TaskContext::from_value(&value)?)
        }
        None => None,
    };

    match extract_current_stage(input, context.as_ref()) {
        Some(stage) => println!("{}", stage),
        None => println!("none"),
    }
    Ok(())
}

/// Handle rules command
pub fn rules(config: Option<&Path>) -> Result<()> {
    let config = StageConfig::load(config)?;
    let table = PatternTable::from_rules(config.classification_rules.as_ref());

    if table.is_default() {
        println!("# built-in rules");
    }
    for (code, triggers) in table.lookup() {
        println!("{:<9} {}", code.as_str(), triggers.join(", "));
    }
    Ok(())
}

/// Handle validate command
pub fn validate(context: &Path) -> Result<()> {
    let value = parse_task_context(&read_context(context)?)
        .with_context(|| format!("Failed to parse {}", context.display()))?;

    if !is_valid_task_context(&value) {
        bail!("{} is not a valid task context", context.display());
    }

    let ctx = TaskContext::from_value(&value)?;
    println!(
        "{}: valid ({} stages)",
        context.display(),
        ctx.stages.len()
    );
    Ok(())
}
