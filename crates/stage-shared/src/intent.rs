//! Intent codes produced by classification.

use serde::{Deserialize, Serialize};

/// Closed set of navigation intents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntentCode {
    /// Advance to the following stage
    Next,
    /// Return to the preceding stage
    Previous,
    /// Leave the task flow
    Exit,
    /// User asks for assistance
    Help,
    /// User signals distress; a caregiver should be notified
    Care,
    /// Greeting
    Hello,
    /// Nothing recognised, or a transition that is not allowed here
    Unknown,
}

impl IntentCode {
    /// All codes, in the order the default pattern table lists them
    pub const ALL: [IntentCode; 7] = [
        IntentCode::Next,
        IntentCode::Previous,
        IntentCode::Exit,
        IntentCode::Help,
        IntentCode::Care,
        IntentCode::Hello,
        IntentCode::Unknown,
    ];

    /// Upper-case wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Next => "NEXT",
            Self::Previous => "PREVIOUS",
            Self::Exit => "EXIT",
            Self::Help => "HELP",
            Self::Care => "CARE",
            Self::Hello => "HELLO",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Parse a status token, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "NEXT" => Some(Self::Next),
            "PREVIOUS" => Some(Self::Previous),
            "EXIT" => Some(Self::Exit),
            "HELP" => Some(Self::Help),
            "CARE" => Some(Self::Care),
            "HELLO" => Some(Self::Hello),
            "UNKNOWN" => Some(Self::Unknown),
            _ => None,
        }
    }

    /// Parse a status token, degrading anything unrecognised to `Unknown`
    pub fn parse_or_unknown(s: &str) -> Self {
        Self::parse(s).unwrap_or(Self::Unknown)
    }

    /// What the code means, as explained to a generative backend
    pub fn meaning(&self) -> &'static str {
        match self {
            Self::Next => "the user wants to move forward to the next stage",
            Self::Previous => "the user wants to go back to the previous stage",
            Self::Exit => "the user wants to leave or stop the task",
            Self::Help => "the user is asking for help or assistance",
            Self::Care => "the user sounds worried, anxious, scared or upset",
            Self::Hello => "the user is greeting",
            Self::Unknown => "the intent is unclear or fits none of the above",
        }
    }
}

impl std::fmt::Display for IntentCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
