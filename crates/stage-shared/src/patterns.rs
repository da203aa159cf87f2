//! Trigger pattern table.
//!
//! Maps each intent code to an ordered list of lowercase substrings. Both the
//! order of codes and the order of triggers within a code matter: the first
//! trigger contained in the input wins, with no scoring.
//!
//! Construction never fails. A rules value that is not a mapping is replaced
//! by the built-in table; individual bad entries are dropped with a warning.

use crate::intent::IntentCode;
use serde_json::Value;
use tracing::{debug, warn};

/// Built-in triggers, in precedence order
pub const DEFAULT_RULES: &[(IntentCode, &[&str])] = &[
    (
        IntentCode::Next,
        &["next", "continue", "proceed", "forward", "go on"],
    ),
    (
        IntentCode::Previous,
        &["back", "previous", "return", "go back"],
    ),
    (IntentCode::Exit, &["exit", "quit", "leave", "stop", "end"]),
    (IntentCode::Help, &["help", "assist", "support", "call"]),
    (
        IntentCode::Care,
        &["worried", "anxious", "scared", "concerned", "upset"],
    ),
    (IntentCode::Hello, &["hello", "hi", "hey", "greetings"]),
];

/// Immutable ordered mapping from intent code to trigger substrings
#[derive(Debug, Clone, PartialEq)]
pub struct PatternTable {
    rules: Vec<(IntentCode, Vec<String>)>,
    is_default: bool,
}

impl Default for PatternTable {
    fn default() -> Self {
        Self {
            rules: DEFAULT_RULES
                .iter()
                .map(|(code, triggers)| (*code, triggers.iter().map(|t| t.to_string()).collect()))
                .collect(),
            is_default: true,
        }
    }
}

impl PatternTable {
    /// Build from an optional `classification_rules` value.
    ///
    /// Absent rules give the default table. Rules that are not a mapping also
    /// give the default table, with a warning.
    pub fn from_rules(rules: Option<&Value>) -> Self {
        let Some(rules) = rules else {
            debug!("No classification rules configured, using defaults");
            return Self::default();
        };

        let Some(map) = rules.as_object() else {
            warn!(
                "classification_rules must map intent codes to lists of strings, got {}; using defaults",
                json_kind(rules)
            );
            return Self::default();
        };

        let mut table: Vec<(IntentCode, Vec<String>)> = Vec::with_capacity(map.len());
        for (key, value) in map {
            let Some(code) = IntentCode::parse(key) else {
                warn!("Skipping classification rule for unknown intent code '{}'", key);
                continue;
            };
            let Some(items) = value.as_array() else {
                warn!(
                    "Skipping classification rule {}: expected a list, got {}",
                    code,
                    json_kind(value)
                );
                continue;
            };

            let mut triggers = Vec::with_capacity(items.len());
            for item in items {
                match item.as_str().map(|s| s.trim().to_lowercase()) {
                    Some(t) if !t.is_empty() => triggers.push(t),
                    Some(_) => warn!("Skipping empty trigger in rule {}", code),
                    None => warn!(
                        "Skipping non-string trigger in rule {}: {}",
                        code,
                        json_kind(item)
                    ),
                }
            }

            // A repeated code (e.g. NEXT and next) extends the earlier entry
            match table.iter_mut().find(|(c, _)| *c == code) {
                Some((_, existing)) => existing.extend(triggers),
                None => table.push((code, triggers)),
            }
        }

        if table.is_empty() && !map.is_empty() {
            warn!("No usable classification rules after validation; using defaults");
            return Self::default();
        }

        debug!("Loaded {} classification rules from configuration", table.len());
        Self {
            rules: table,
            is_default: false,
        }
    }

    /// The ordered rules
    pub fn lookup(&self) -> &[(IntentCode, Vec<String>)] {
        &self.rules
    }

    /// Triggers for one code, if it has an entry
    pub fn triggers(&self, code: IntentCode) -> Option<&[String]> {
        self.rules
            .iter()
            .find(|(c, _)| *c == code)
            .map(|(_, t)| t.as_slice())
    }

    /// True when the table is the built-in default
    pub fn is_default(&self) -> bool {
        self.is_default
    }

    /// First trigger contained in `normalized`, scanning codes then triggers in order.
    ///
    /// `normalized` must already be lowercased and trimmed.
    pub fn first_match(&self, normalized: &str) -> Option<(IntentCode, &str)> {
        self.rules.iter().find_map(|(code, triggers)| {
            triggers
                .iter()
                .find(|t| normalized.contains(t.as_str()))
                .map(|t| (*code, t.as_str()))
        })
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "a mapping",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_order() {
        let table = PatternTable::default();
        let codes: Vec<IntentCode> = table.lookup().iter().map(|(c, _)| *c).collect();
        assert_eq!(
            codes,
            vec![
                IntentCode::Next,
                IntentCode::Previous,
                IntentCode::Exit,
                IntentCode::Help,
                IntentCode::Care,
                IntentCode::Hello,
            ]
        );
        assert!(table.is_default());
    }

    #[test]
    fn test_first_match_wins() {
        let table = PatternTable::default();
        // "go back" contains "go back" (PREVIOUS) but NEXT is scanned first and has no hit
        assert_eq!(table.first_match("go back"), Some((IntentCode::Previous, "back")));
        // "hi" inside "this" is a literal substring hit
        assert_eq!(table.first_match("this"), Some((IntentCode::Hello, "hi")));
        assert_eq!(table.first_match("zzz"), None);
    }

    #[test]
    fn test_non_mapping_falls_back() {
        let table = PatternTable::from_rules(Some(&json!(["next"])));
        assert!(table.is_default());
        let table = PatternTable::from_rules(Some(&json!("oops")));
        assert!(table.is_default());
    }

    #[test]
    fn test_triggers_are_lowercased() {
        let table = PatternTable::from_rules(Some(&json!({"next": [" Onward "]})));
        assert_eq!(table.triggers(IntentCode::Next), Some(&["onward".to_string()][..]));
        assert!(!table.is_default());
    }
}
