//! Mock implementations for testing.
//!
//! This module provides mock LLM clients and agents that can be used
//! across different test files without duplication.

use async_trait::async_trait;
use conductor::agents::Agent;
use conductor::llm::LLMClient;
use conductor::types::{AppError, Message, Result};
use std::collections::VecDeque;
use std::sync::Mutex;

/// Mock LLM client for testing with scripted responses.
///
/// Responses are consumed in order; when the script runs out, the last
/// response is repeated. Useful for driving the planner and the direct
/// answer path without real API calls.
pub struct MockLLMClient {
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    should_fail: bool,
}

impl MockLLMClient {
    /// Create a mock client that returns the given response for every call.
    pub fn new(response: &str) -> Self {
        Self::scripted(vec![response.to_string()])
    }

    /// Create a mock client returning the given responses in order.
    pub fn scripted(responses: Vec<String>) -> Self {
        Self {
            responses: Mutex::new(responses.into_iter().collect()),
            last: Mutex::new(String::new()),
            should_fail: false,
        }
    }

    /// Create a mock client that always returns an error.
    pub fn failing() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(String::new()),
            should_fail: true,
        }
    }

    fn next_response(&self) -> Result<String> {
        if self.should_fail {
            return Err(AppError::LLM("Mock LLM failure".to_string()));
        }
        let mut responses = self.responses.lock().unwrap();
        match responses.pop_front() {
            Some(response) => {
                *self.last.lock().unwrap() = response.clone();
                Ok(response)
            }
            None => Ok(self.last.lock().unwrap().clone()),
        }
    }
}

#[async_trait]
impl LLMClient for MockLLMClient {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        self.next_response()
    }

    async fn generate_with_system(&self, _system: &str, _prompt: &str) -> Result<String> {
        self.next_response()
    }

    async fn generate_with_history(&self, _messages: &[(String, String)]) -> Result<String> {
        self.next_response()
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

/// Mock agent that returns scripted responses and records how many times
/// it was invoked.
pub struct MockAgent {
    name: String,
    responses: Mutex<VecDeque<String>>,
    last: Mutex<String>,
    invocations: Mutex<u32>,
    should_fail: bool,
}

impl MockAgent {
    pub fn new(name: &str, response: &str) -> Self {
        Self::scripted(name, vec![response.to_string()])
    }

    pub fn scripted(name: &str, responses: Vec<String>) -> Self {
        Self {
            name: name.to_string(),
            responses: Mutex::new(responses.into_iter().collect()),
            last: Mutex::new(String::new()),
            invocations: Mutex::new(0),
            should_fail: false,
        }
    }

    pub fn unreachable(name: &str) -> Self {
        Self {
            name: name.to_string(),
            responses: Mutex::new(VecDeque::new()),
            last: Mutex::new(String::new()),
            invocations: Mutex::new(0),
            should_fail: true,
        }
    }

    pub fn invocations(&self) -> u32 {
        *self.invocations.lock().unwrap()
    }
}

#[async_trait]
impl Agent for MockAgent {
    async fn invoke(&self, _history: &[Message]) -> Result<Message> {
        *self.invocations.lock().unwrap() += 1;
        if self.should_fail {
            return Err(AppError::AgentUnavailable(format!(
                "agent '{}' could not be reached",
                self.name
            )));
        }
        let mut responses = self.responses.lock().unwrap();
        let content = match responses.pop_front() {
            Some(response) => {
                *self.last.lock().unwrap() = response.clone();
                response
            }
            None => self.last.lock().unwrap().clone(),
        };
        Ok(Message::ai(content))
    }

    fn name(&self) -> &str {
        &self.name
    }
}
