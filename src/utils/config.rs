use crate::llm::Provider;
use crate::types::{AppError, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub agents: AgentsConfig,
    pub llm: LLMConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentsConfig {
    /// Base URLs of the agent services to discover at startup.
    pub service_urls: Vec<String>,
    /// Timeout for each metadata request during discovery, in seconds.
    pub discovery_timeout_secs: u64,
    /// Timeout for each agent invocation, in seconds.
    pub invoke_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LLMConfig {
    pub provider: String,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub openai_model: String,
    pub ollama_url: String,
    pub ollama_model: String,
}

impl Config {
    /// Load configuration from the environment, reading `.env` if present.
    ///
    /// `AGENT_SERVICES` is required (comma-separated base URLs); everything
    /// else has a default except `OPENAI_API_KEY`, which is required only
    /// when `LLM_PROVIDER=openai`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let service_urls: Vec<String> = env::var("AGENT_SERVICES")
            .map_err(|_| {
                AppError::Configuration(
                    "AGENT_SERVICES is not set; provide a comma-separated list of \
                     agent service base URLs"
                        .to_string(),
                )
            })?
            .split(',')
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .collect();

        Ok(Config {
            agents: AgentsConfig {
                service_urls,
                discovery_timeout_secs: parse_env("DISCOVERY_TIMEOUT_SECS", 5)?,
                invoke_timeout_secs: parse_env("INVOKE_TIMEOUT_SECS", 120)?,
            },
            llm: LLMConfig {
                provider: env::var("LLM_PROVIDER").unwrap_or_else(|_| "ollama".to_string()),
                openai_api_key: env::var("OPENAI_API_KEY").ok(),
                openai_api_base: env::var("OPENAI_API_BASE")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                openai_model: env::var("OPENAI_MODEL")
                    .unwrap_or_else(|_| "gpt-4o-mini".to_string()),
                ollama_url: env::var("OLLAMA_URL")
                    .unwrap_or_else(|_| "http://localhost:11434".to_string()),
                ollama_model: env::var("OLLAMA_MODEL")
                    .unwrap_or_else(|_| "llama3.2".to_string()),
            },
        })
    }

    /// Resolve the configured LLM provider.
    pub fn provider(&self) -> Result<Provider> {
        match self.llm.provider.as_str() {
            "ollama" => Ok(Provider::Ollama {
                base_url: self.llm.ollama_url.clone(),
                model: self.llm.ollama_model.clone(),
            }),
            "openai" => {
                let api_key = self.llm.openai_api_key.clone().ok_or_else(|| {
                    AppError::Configuration(
                        "OPENAI_API_KEY is required when LLM_PROVIDER=openai".to_string(),
                    )
                })?;
                Ok(Provider::OpenAI {
                    api_key,
                    api_base: self.llm.openai_api_base.clone(),
                    model: self.llm.openai_model.clone(),
                })
            }
            other => Err(AppError::Configuration(format!(
                "unknown LLM_PROVIDER '{other}' (expected 'ollama' or 'openai')"
            ))),
        }
    }

    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_secs(self.agents.discovery_timeout_secs)
    }

    pub fn invoke_timeout(&self) -> Duration {
        Duration::from_secs(self.agents.invoke_timeout_secs)
    }
}

fn parse_env(name: &str, default: u64) -> Result<u64> {
    match env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| AppError::Configuration(format!("{name} must be an integer: '{value}'"))),
        Err(_) => Ok(default),
    }
}
