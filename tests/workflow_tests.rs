//! End-to-end workflow runs over mock agents, plus remote agent
//! invocation against a mock HTTP service.

mod common;

use common::mocks::{MockAgent, MockLLMClient};
use conductor::agents::{Agent, AgentRegistration, CapabilityIndex, RemoteAgent};
use conductor::supervisor::{Supervisor, SupervisorMode};
use conductor::types::{AppError, Message};
use conductor::workflows::WorkflowEngine;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn index_of(entries: &[(&str, &[&str])]) -> CapabilityIndex {
    let mut index = CapabilityIndex::new();
    for (name, caps) in entries {
        index.register(AgentRegistration {
            name: name.to_string(),
            base_url: format!("http://localhost/{name}"),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
        });
    }
    index
}

#[tokio::test]
async fn research_then_document_workflow_completes() {
    let llm = MockLLMClient::scripted(vec![
        r#"{"steps": ["research", "create_document"]}"#.to_string(),
    ]);
    let index = index_of(&[
        ("ResearchAgent", &["research"]),
        ("DocumentAgent", &["create_document"]),
    ]);

    let research = MockAgent::new(
        "ResearchAgent",
        r#"{"completed_capability": "research", "data": {"research_summary": {"topic": "rust"}}}"#,
    );
    let document = MockAgent::new(
        "DocumentAgent",
        r#"{"completed_capability": "create_document", "data": {"abs_file_path": "/srv/out/report.md"}}"#,
    );

    let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
    agents.insert("ResearchAgent".to_string(), Arc::new(research));
    agents.insert("DocumentAgent".to_string(), Arc::new(document));

    let engine = WorkflowEngine::new(Supervisor::new(Arc::new(llm)), index, agents);
    let output = engine.run("research rust and write a report").await.unwrap();

    assert_eq!(output.mode, SupervisorMode::Planned);
    assert_eq!(output.steps_executed, 2);
    assert_eq!(
        output.capabilities_dispatched,
        vec!["research", "create_document"]
    );
    assert_eq!(output.reasoning_path[0].agent_name, "ResearchAgent");
    assert_eq!(output.reasoning_path[1].agent_name, "DocumentAgent");
    assert!(output.final_response.contains("create_document"));
}

#[tokio::test]
async fn conversational_request_is_answered_directly() {
    let llm = MockLLMClient::scripted(vec![
        r#"{"steps": []}"#.to_string(),
        "Hello! How can I help?".to_string(),
    ]);
    let index = index_of(&[("ResearchAgent", &["research"])]);

    let engine = WorkflowEngine::new(Supervisor::new(Arc::new(llm)), index, HashMap::new());
    let output = engine.run("hi").await.unwrap();

    assert_eq!(output.mode, SupervisorMode::Direct);
    assert_eq!(output.steps_executed, 0);
    assert_eq!(output.final_response, "Hello! How can I help?");
}

#[tokio::test]
async fn unreachable_agent_aborts_the_workflow() {
    let llm = MockLLMClient::new(r#"{"steps": ["research"]}"#);
    let index = index_of(&[("ResearchAgent", &["research"])]);

    let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
    agents.insert(
        "ResearchAgent".to_string(),
        Arc::new(MockAgent::unreachable("ResearchAgent")),
    );

    let engine = WorkflowEngine::new(Supervisor::new(Arc::new(llm)), index, agents);
    let err = engine.run("research rust").await.unwrap_err();
    assert!(matches!(err, AppError::AgentUnavailable(_)));
}

#[tokio::test]
async fn non_conforming_agent_is_retried_then_forced_forward() {
    let llm = MockLLMClient::new(r#"{"steps": ["research"]}"#);
    let index = index_of(&[("ResearchAgent", &["research"])]);

    let research = Arc::new(MockAgent::new(
        "ResearchAgent",
        "Here are my findings, in plain prose.",
    ));
    let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
    agents.insert("ResearchAgent".to_string(), research.clone());

    let engine = WorkflowEngine::new(Supervisor::new(Arc::new(llm)), index, agents);
    let output = engine.run("research rust").await.unwrap();

    // The workflow terminates despite the missing contract, and the agent
    // is not hammered beyond the retry bound.
    assert!(research.invocations() <= 3);
    assert!(output.steps_executed >= 1);
    assert_eq!(output.final_response, "Here are my findings, in plain prose.");
}

#[tokio::test]
async fn remote_agent_normalizes_messages_envelope() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "messages": [
                {"role": "human", "content": "research rust"},
                {"role": "ai", "content": r#"{"completed_capability": "research"}"#}
            ]
        })))
        .mount(&server)
        .await;

    let agent = RemoteAgent::new("ResearchAgent", server.uri(), Duration::from_secs(2)).unwrap();
    let history = vec![Message::human("research rust")];
    let response = agent.invoke(&history).await.unwrap();

    assert!(response.is_ai());
    assert_eq!(response.content, r#"{"completed_capability": "research"}"#);
}

#[tokio::test]
async fn remote_agent_error_status_is_unavailable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoke"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let agent = RemoteAgent::new("ResearchAgent", server.uri(), Duration::from_secs(2)).unwrap();
    let err = agent.invoke(&[Message::human("go")]).await.unwrap_err();
    assert!(matches!(err, AppError::AgentUnavailable(_)));
}

#[tokio::test]
async fn remote_agent_strict_mode_rejects_embedded_contracts() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/invoke"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": r#"All done! {"completed_capability": "research"} Bye."#
        })))
        .mount(&server)
        .await;

    let agent = RemoteAgent::new("ResearchAgent", server.uri(), Duration::from_secs(2))
        .unwrap()
        .with_strict_contracts(true);
    let err = agent.invoke(&[Message::human("go")]).await.unwrap_err();
    assert!(matches!(err, AppError::ContractViolation(_)));
}
