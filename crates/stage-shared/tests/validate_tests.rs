//! Tests for validate.rs and the typed task context

use serde_json::json;
use stage_shared::{
    is_first_stage, is_last_stage, is_valid_task_context, parse_task_context, TaskContext,
};

fn valid_context() -> serde_json::Value {
    json!({
        "task": "recipe",
        "description": "Bake bread",
        "status": "in progress",
        "stages": [
            {"stage": "mix", "description": "Mix flour", "timeout": 300},
            {"stage": "knead", "description": "Knead dough", "timeout": 600},
            {"stage": "bake", "description": "Bake", "timeout": 2400}
        ]
    })
}

#[test]
fn test_valid_context() {
    assert!(is_valid_task_context(&valid_context()));
}

#[test]
fn test_missing_top_level_fields() {
    for field in ["task", "description", "status", "stages"] {
        let mut ctx = valid_context();
        ctx.as_object_mut().unwrap().remove(field);
        assert!(!is_valid_task_context(&ctx), "missing {} accepted", field);
    }
}

#[test]
fn test_stage_shape_checks() {
    let mut ctx = valid_context();
    ctx["stages"][1]["timeout"] = json!(-1);
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["stages"][0]["timeout"] = json!("300");
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["stages"][2].as_object_mut().unwrap().remove("description");
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["stages"] = json!("mix,knead");
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["stages"] = json!([1, 2]);
    assert!(!is_valid_task_context(&ctx));
}

#[test]
fn test_non_object_context() {
    assert!(!is_valid_task_context(&json!([])));
    assert!(!is_valid_task_context(&json!(null)));
    assert!(!is_valid_task_context(&json!("task")));
}

#[test]
fn test_empty_stage_list_is_valid() {
    let mut ctx = valid_context();
    ctx["stages"] = json!([]);
    assert!(is_valid_task_context(&ctx));
    let typed = TaskContext::from_value(&ctx).unwrap();
    assert!(!is_first_stage(Some(&typed), "mix"));
}

#[test]
fn test_round_trip_preserves_boundaries() {
    let built = TaskContext::new("recipe", "Bake bread", "in progress")
        .with_stage("mix", "Mix flour", 300.0)
        .with_stage("knead", "Knead dough", 600.0)
        .with_stage("bake", "Bake", 2400.0)
        .with_current_stage("knead");

    let serialized = serde_json::to_string(&built).unwrap();
    let raw = parse_task_context(&serialized).unwrap();
    assert!(is_valid_task_context(&raw));
    let rebuilt = TaskContext::from_value(&raw).unwrap();

    assert_eq!(rebuilt, built);
    for id in ["mix", "knead", "bake", "other"] {
        assert_eq!(
            is_first_stage(Some(&built), id),
            is_first_stage(Some(&rebuilt), id)
        );
        assert_eq!(
            is_last_stage(Some(&built), id),
            is_last_stage(Some(&rebuilt), id)
        );
    }
}

#[test]
fn test_empty_stage_id_rejected() {
    let mut ctx = valid_context();
    ctx["stages"][1]["stage"] = json!("");
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["stages"][0]["stage"] = json!("   ");
    assert!(!is_valid_task_context(&ctx));
    assert!(TaskContext::from_value(&ctx).is_err());
}

#[test]
fn test_same_field_under_two_names_rejected() {
    let mut ctx = valid_context();
    ctx["stages"][0]["id"] = json!("other");
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["stages"][2]["timeoutSeconds"] = json!(10);
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["taskId"] = json!("recipe");
    assert!(!is_valid_task_context(&ctx));

    let mut ctx = valid_context();
    ctx["current_stage"] = json!("mix");
    ctx["currentStageId"] = json!("knead");
    assert!(!is_valid_task_context(&ctx));
}

#[test]
fn test_alias_spelling_alone_is_valid() {
    let ctx = json!({
        "taskId": "recipe",
        "description": "Bake bread",
        "status": "in progress",
        "stages": [{"id": "mix", "description": "Mix flour", "timeoutSeconds": 300}],
        "currentStageId": "mix"
    });
    assert!(is_valid_task_context(&ctx));
    let typed = TaskContext::from_value(&ctx).unwrap();
    assert_eq!(typed.current_stage_id.as_deref(), Some("mix"));
}
