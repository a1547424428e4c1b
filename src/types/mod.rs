//! Core types (messages, errors).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============= Message Types =============

/// Who authored a message.
///
/// Only `Ai` messages are ever inspected for completion contracts; a
/// human message can never advance a plan step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    Human,
    Ai,
}

/// A single conversation message.
///
/// The conversation history is an append-only ordered sequence of these.
/// External representations (dicts, bare strings, message envelopes) are
/// normalized into this type at the agent invocation boundary and nowhere
/// else.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a human-authored message.
    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Human,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Create an AI-authored message.
    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Ai,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    /// Whether this message was authored by an agent.
    pub fn is_ai(&self) -> bool {
        self.role == MessageRole::Ai
    }
}

/// Returns the content of the first human message in a history, which by
/// convention is the original user request.
pub fn original_request(history: &[Message]) -> Option<&str> {
    history
        .iter()
        .find(|m| m.role == MessageRole::Human)
        .map(|m| m.content.as_str())
}

/// Returns the most recent AI-authored message, if any.
pub fn last_ai_message(history: &[Message]) -> Option<&Message> {
    history.iter().rev().find(|m| m.is_ai())
}

// ============= Error Types =============

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("LLM error: {0}")]
    LLM(String),

    /// The planning LLM call failed or returned an unparseable plan.
    /// Fatal for the request; planning is never retried.
    #[error("Planning failed: {0}")]
    Planning(String),

    /// A planned capability is missing from the available set, or the
    /// routing tables disagree. Indicates a discovery/planning bug.
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Discovery error: {0}")]
    Discovery(String),

    /// A downstream agent service could not be reached or timed out.
    #[error("Agent unavailable: {0}")]
    AgentUnavailable(String),

    /// An agent responded with a payload the adapter cannot normalize.
    #[error("Agent error: {0}")]
    Agent(String),

    /// Strict contract validation found text outside the JSON span.
    #[error("Contract violation: {0}")]
    ContractViolation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let human = Message::human("hello");
        assert_eq!(human.role, MessageRole::Human);
        assert!(!human.is_ai());

        let ai = Message::ai("done");
        assert_eq!(ai.role, MessageRole::Ai);
        assert!(ai.is_ai());
    }

    #[test]
    fn test_role_serialization() {
        let json = serde_json::to_string(&MessageRole::Human).unwrap();
        assert_eq!(json, "\"human\"");
        let json = serde_json::to_string(&MessageRole::Ai).unwrap();
        assert_eq!(json, "\"ai\"");
    }

    #[test]
    fn test_original_request_finds_first_human() {
        let history = vec![
            Message::human("first"),
            Message::ai("reply"),
            Message::human("second"),
        ];
        assert_eq!(original_request(&history), Some("first"));
        assert!(original_request(&[]).is_none());
    }

    #[test]
    fn test_last_ai_message() {
        let history = vec![
            Message::human("request"),
            Message::ai("one"),
            Message::ai("two"),
            Message::human("not this"),
        ];
        assert_eq!(last_ai_message(&history).unwrap().content, "two");

        let humans_only = vec![Message::human("request")];
        assert!(last_ai_message(&humans_only).is_none());
    }
}
