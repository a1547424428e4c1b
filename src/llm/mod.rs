//! LLM Provider Clients and Abstractions
//!
//! A unified interface for the Large Language Model calls made by the
//! supervisor: building plans and answering directly. Provider-specific
//! implementations live behind the [`LLMClient`] trait so the rest of the
//! application can work with any supported provider.
//!
//! # Example
//!
//! ```ignore
//! use conductor::llm::Provider;
//!
//! let provider = Provider::Ollama {
//!     base_url: "http://localhost:11434".to_string(),
//!     model: "llama3.2".to_string(),
//! };
//! let client = provider.create_client().await?;
//! let response = client.generate("What is 2+2?").await?;
//! ```

/// Core LLM client trait and provider selection.
pub mod client;
pub mod ollama;
pub mod openai;

pub use client::{LLMClient, Provider};
