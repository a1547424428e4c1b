//! # Conductor - Supervisor for Distributed Agent Services
//!
//! A supervisor-driven orchestration layer over agent services that run as
//! independent HTTP processes. Agent capabilities are discovered at
//! startup, each user request is decomposed into an ordered capability
//! plan by an LLM, and plan steps are dispatched to the agents providing
//! them. Progress is tracked through completion contracts embedded in
//! agent responses.
//!
//! ## Overview
//!
//! Conductor can be used in two ways:
//!
//! 1. **As a standalone CLI** - Run the `conductor` binary
//! 2. **As a library** - Import components into your own Rust project
//!
//! ## Quick Start (Library Usage)
//!
//! ```rust,ignore
//! use conductor::agents::discover_capabilities;
//! use conductor::llm::Provider;
//! use conductor::supervisor::Supervisor;
//! use conductor::workflows::WorkflowEngine;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let urls = vec!["http://localhost:8001".to_string()];
//!     let index = discover_capabilities(&urls, Duration::from_secs(5)).await?;
//!
//!     let provider = Provider::Ollama {
//!         base_url: "http://localhost:11434".to_string(),
//!         model: "llama3.2".to_string(),
//!     };
//!     let llm: Arc<dyn conductor::llm::LLMClient> =
//!         Arc::from(provider.create_client().await?);
//!
//!     let engine = WorkflowEngine::from_discovery(
//!         Supervisor::new(llm),
//!         index,
//!         Duration::from_secs(120),
//!     )?;
//!     let output = engine.run("research Rust async runtimes").await?;
//!     println!("{}", output.final_response);
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - [`agents`] - capability discovery, the capability index, and the
//!   remote agent invocation adapter
//! - [`contract`] - the completion contract protocol agents use to signal
//!   that a capability is done
//! - [`supervisor`] - the planning and dispatch state machine
//! - [`workflows`] - the engine that drives one request to completion
//! - [`llm`] - LLM provider clients (Ollama, OpenAI)

pub mod agents;
pub mod cli;
pub mod contract;
pub mod llm;
pub mod supervisor;
pub mod types;
pub mod utils;
pub mod workflows;

pub use agents::{discover_capabilities, Agent, CapabilityIndex, RemoteAgent};
pub use contract::CompletionContract;
pub use llm::{LLMClient, Provider};
pub use supervisor::{Decision, ExecutionContext, Supervisor, SupervisorMode};
pub use types::{AppError, Message, MessageRole, Result};
pub use utils::Config;
pub use workflows::{WorkflowEngine, WorkflowOutput};
