//! Completion-contract protocol.
//!
//! Agents signal that a unit of work is finished by embedding a JSON
//! object in their final message content:
//!
//! ```json
//! {"completed_capability": "research", "data": {"research_summary": {}}}
//! ```
//!
//! The contract is the single agreed completion signal between agents and
//! the Supervisor. Absence of a contract is a normal state while an agent
//! is still working, so [`parse`] returns `Option`, not an error.
//!
//! Agents are free-text LLM generators, so the parser accepts a contract
//! embedded anywhere in the message. Extraction uses a balanced-brace
//! scanner that understands JSON string and escape state, so nested braces
//! inside payload strings do not break it. Where exact-format compliance is
//! required, [`parse_strict`] rejects any content outside the JSON span.

use crate::types::{AppError, Message, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A parsed completion contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionContract {
    /// The capability the emitting agent has finished.
    pub completed_capability: String,
    /// Optional payload handed off to downstream steps.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl CompletionContract {
    pub fn new(capability: impl Into<String>, data: Option<Value>) -> Self {
        Self {
            completed_capability: capability.into(),
            data,
        }
    }

    /// Encode this contract as an AI message whose entire content is the
    /// contract JSON. No side effects.
    pub fn to_message(&self) -> Message {
        let mut obj = serde_json::Map::new();
        obj.insert(
            "completed_capability".to_string(),
            Value::String(self.completed_capability.clone()),
        );
        if let Some(data) = &self.data {
            obj.insert("data".to_string(), data.clone());
        }
        Message::ai(Value::Object(obj).to_string())
    }
}

/// Attempt to parse a completion contract from free-form message content.
///
/// Tries, in order: the whole trimmed string as JSON, then every balanced
/// `{...}` span found by the scanner. A candidate is accepted only if it is
/// a JSON object carrying `completed_capability`.
pub fn parse(content: &str) -> Option<CompletionContract> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(contract) = serde_json::from_str::<CompletionContract>(trimmed) {
        return Some(contract);
    }

    for candidate in json_object_spans(trimmed) {
        if let Ok(contract) = serde_json::from_str::<CompletionContract>(candidate) {
            return Some(contract);
        }
    }

    None
}

/// Extract just the completed capability name, if a contract is present.
pub fn extract_capability(content: &str) -> Option<String> {
    parse(content).map(|c| c.completed_capability)
}

/// Strictly validate that `content` is exactly one contract JSON object,
/// with nothing but whitespace around it.
///
/// Violations report the offending prefix/suffix text for debuggability.
pub fn parse_strict(content: &str) -> Result<CompletionContract> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(AppError::ContractViolation(
            "contract content is empty".to_string(),
        ));
    }

    let start = trimmed.find('{').ok_or_else(|| {
        AppError::ContractViolation(format!(
            "no JSON object found in contract content: '{}'",
            truncate(trimmed, 200)
        ))
    })?;
    let end = scan_balanced_object(trimmed, start).ok_or_else(|| {
        AppError::ContractViolation(format!(
            "unbalanced JSON object in contract content: '{}'",
            truncate(trimmed, 200)
        ))
    })?;

    let prefix = trimmed[..start].trim();
    let suffix = trimmed[end + 1..].trim();
    if !prefix.is_empty() || !suffix.is_empty() {
        return Err(AppError::ContractViolation(format!(
            "contract contains text outside the JSON span (before: '{}', after: '{}')",
            truncate(prefix, 200),
            truncate(suffix, 200)
        )));
    }

    let contract: CompletionContract =
        serde_json::from_str(&trimmed[start..=end]).map_err(|e| {
            AppError::ContractViolation(format!(
                "contract is not a valid completion object: {e}"
            ))
        })?;
    Ok(contract)
}

/// All balanced top-level `{...}` spans in `text`, in order of appearance.
///
/// Shared with the planner, which extracts a JSON plan from free-form LLM
/// output the same way.
pub(crate) fn json_object_spans(text: &str) -> impl Iterator<Item = &str> {
    let mut spans = Vec::new();
    let mut search_from = 0;
    while let Some(offset) = text[search_from..].find('{') {
        let start = search_from + offset;
        match scan_balanced_object(text, start) {
            Some(end) => {
                spans.push(&text[start..=end]);
                search_from = end + 1;
            }
            // Unclosed brace; skip it and keep scanning.
            None => search_from = start + 1,
        }
    }
    spans.into_iter()
}

/// Scan forward from an opening brace at byte offset `start`, returning the
/// byte offset of the matching closing brace. Tracks JSON string and escape
/// state so braces inside string values are ignored.
fn scan_balanced_object(text: &str, start: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(start + i);
                }
            }
            _ => {}
        }
    }
    None
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
