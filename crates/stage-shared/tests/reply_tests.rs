//! Tests for reply.rs

use stage_shared::{parse_reply, BackendError, IntentCode};

#[test]
fn test_json_reply() {
    let reply = parse_reply(r#"{"status": "next", "message": "Moving on"}"#).unwrap();
    assert_eq!(reply.status, IntentCode::Next);
    assert_eq!(reply.message, "Moving on");
}

#[test]
fn test_json_reply_with_unknown_status() {
    let reply = parse_reply(r#"{"status": "TELEPORT", "message": "?"}"#).unwrap();
    assert_eq!(reply.status, IntentCode::Unknown);
    assert_eq!(reply.message, "?");
}

#[test]
fn test_json_without_message_falls_through_to_text() {
    // Not the structured form; the leading token is "{"status":" which is not a code
    let reply = parse_reply(r#"{"status": "NEXT"}"#).unwrap();
    assert_eq!(reply.status, IntentCode::Unknown);
    assert!(reply.message.starts_with("Unable to parse LLM response:"));
}

#[test]
fn test_status_colon_message() {
    let reply = parse_reply("CARE: The user sounds anxious").unwrap();
    assert_eq!(reply.status, IntentCode::Care);
    assert_eq!(reply.message, "The user sounds anxious");

    let reply = parse_reply("HELP :\nneeds a hand\nwith this").unwrap();
    assert_eq!(reply.status, IntentCode::Help);
    assert_eq!(reply.message, "needs a hand\nwith this");
}

#[test]
fn test_status_colon_unrecognised_code() {
    let reply = parse_reply("MAYBE: not sure").unwrap();
    assert_eq!(reply.status, IntentCode::Unknown);
    assert_eq!(reply.message, "not sure");
}

#[test]
fn test_bare_leading_token() {
    let reply = parse_reply("previous, the user wants to go back").unwrap();
    assert_eq!(reply.status, IntentCode::Previous);
    assert_eq!(reply.message, "the user wants to go back");

    let reply = parse_reply("Exit.").unwrap();
    assert_eq!(reply.status, IntentCode::Exit);
    assert_eq!(reply.message, "Exit.");
}

#[test]
fn test_unparseable_reply_is_recovered() {
    let long = "I think the user might want something else entirely ".repeat(10);
    let reply = parse_reply(&long).unwrap();
    assert_eq!(reply.status, IntentCode::Unknown);
    let echoed = reply
        .message
        .strip_prefix("Unable to parse LLM response: ")
        .unwrap();
    assert_eq!(echoed.chars().count(), 200);
}

#[test]
fn test_empty_reply_fails() {
    assert!(matches!(parse_reply(""), Err(BackendError::Response(_))));
}
