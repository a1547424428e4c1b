//! Remote agent invocation over HTTP.
//!
//! This is the single boundary where heterogeneous agent response shapes
//! are normalized into the crate's [`Message`] type. Service
//! unavailability is surfaced as a hard error; there is no silent fallback
//! to local execution.

use crate::agents::Agent;
use crate::contract;
use crate::types::{AppError, Message, MessageRole, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Serialize)]
struct WireMessage<'a> {
    role: MessageRole,
    content: &'a str,
}

#[derive(Serialize)]
struct InvokeRequest<'a> {
    messages: Vec<WireMessage<'a>>,
}

/// An agent running as a remote HTTP service.
///
/// Call contract: `POST {base_url}/invoke` with the conversation history,
/// returning one response message. The response body may be a message
/// object, a `{"messages": [...]}` envelope, a bare JSON string, or plain
/// text; all are normalized to a single AI [`Message`].
pub struct RemoteAgent {
    name: String,
    base_url: String,
    client: reqwest::Client,
    strict_contracts: bool,
}

impl RemoteAgent {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            strict_contracts: false,
        })
    }

    /// Require that any completion contract this agent emits is the entire
    /// message body, validated with [`contract::parse_strict`].
    pub fn with_strict_contracts(mut self, strict: bool) -> Self {
        self.strict_contracts = strict;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl Agent for RemoteAgent {
    async fn invoke(&self, history: &[Message]) -> Result<Message> {
        let request = InvokeRequest {
            messages: history
                .iter()
                .map(|m| WireMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        };

        info!(agent = %self.name, url = %self.base_url, "Invoking remote agent");

        let response = self
            .client
            .post(format!("{}/invoke", self.base_url))
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                AppError::AgentUnavailable(format!(
                    "agent '{}' at {} could not be reached: {e}",
                    self.name, self.base_url
                ))
            })?
            .error_for_status()
            .map_err(|e| {
                AppError::AgentUnavailable(format!(
                    "agent '{}' at {} returned an error status: {e}",
                    self.name, self.base_url
                ))
            })?;

        let body = response.text().await.map_err(|e| {
            AppError::AgentUnavailable(format!(
                "agent '{}' response could not be read: {e}",
                self.name
            ))
        })?;

        let message = normalize_response(&self.name, &body)?;
        debug!(
            agent = %self.name,
            content_len = message.content.len(),
            "Remote agent responded"
        );

        if self.strict_contracts && contract::parse(&message.content).is_some() {
            contract::parse_strict(&message.content).map_err(|e| {
                AppError::ContractViolation(format!("agent '{}': {e}", self.name))
            })?;
        }

        Ok(message)
    }

    fn name(&self) -> &str {
        &self.name
    }
}

/// Normalize a raw response body into a single AI message.
///
/// Accepted encodings:
/// - a JSON object with a `content` string field (a message object)
/// - a JSON object with a `messages` array (the last entry's content wins)
/// - a bare JSON string
/// - plain non-JSON text
fn normalize_response(agent_name: &str, body: &str) -> Result<Message> {
    let Ok(value) = serde_json::from_str::<Value>(body) else {
        // Not JSON at all; treat the raw body as the message content.
        return Ok(Message::ai(body.trim()));
    };

    match value {
        Value::String(content) => Ok(Message::ai(content)),
        Value::Object(ref obj) => {
            if let Some(content) = obj.get("content").and_then(Value::as_str) {
                return Ok(Message::ai(content));
            }
            if let Some(messages) = obj.get("messages").and_then(Value::as_array) {
                let last_content = messages
                    .iter()
                    .rev()
                    .find_map(|m| m.get("content").and_then(Value::as_str));
                if let Some(content) = last_content {
                    return Ok(Message::ai(content));
                }
                return Err(AppError::Agent(format!(
                    "agent '{agent_name}' returned a messages envelope with no usable content"
                )));
            }
            Err(AppError::Agent(format!(
                "agent '{agent_name}' returned an unrecognized response object \
                 (expected 'content' or 'messages' field)"
            )))
        }
        other => Err(AppError::Agent(format!(
            "agent '{agent_name}' returned an unrecognized response shape: {other}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_message_object() {
        let message = normalize_response("a", r#"{"content": "hello", "role": "ai"}"#).unwrap();
        assert_eq!(message.content, "hello");
        assert_eq!(message.role, MessageRole::Ai);
    }

    #[test]
    fn test_normalize_bare_string() {
        let message = normalize_response("a", r#""just a string""#).unwrap();
        assert_eq!(message.content, "just a string");
    }

    #[test]
    fn test_normalize_messages_envelope_takes_last() {
        let body = r#"{"messages": [{"role": "human", "content": "req"}, {"role": "ai", "content": "done"}]}"#;
        let message = normalize_response("a", body).unwrap();
        assert_eq!(message.content, "done");
    }

    #[test]
    fn test_normalize_plain_text() {
        let message = normalize_response("a", "not json at all").unwrap();
        assert_eq!(message.content, "not json at all");
    }

    #[test]
    fn test_normalize_rejects_unusable_shapes() {
        assert!(normalize_response("a", "[1, 2, 3]").is_err());
        assert!(normalize_response("a", r#"{"messages": []}"#).is_err());
        assert!(normalize_response("a", r#"{"foo": "bar"}"#).is_err());
    }

    #[test]
    fn test_response_role_is_always_ai() {
        // Even if the wire payload claims another role, the adapter emits
        // exactly one AI message.
        let body = r#"{"content": "text", "role": "human"}"#;
        let message = normalize_response("a", body).unwrap();
        assert!(message.is_ai());
    }
}
