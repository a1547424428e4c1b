//! Runtime capability discovery.
//!
//! Queries each configured agent service's `/metadata` endpoint and builds
//! the [`CapabilityIndex`] used for routing and planning. Adding a new
//! agent requires only running its service and listing its URL; no
//! supervisor code changes.
//!
//! Validation policy: an endpoint whose metadata has a missing or blank
//! agent name, a missing or empty capability list, or blank capability
//! entries is rejected with a warning and discovery continues with the
//! remaining endpoints. Discovery fails only when no endpoint responds at
//! all, or when no valid capability was discovered anywhere.

use crate::agents::registry::{AgentRegistration, CapabilityIndex};
use crate::types::{AppError, Result};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Wire shape of an agent service's `GET /metadata` response.
#[derive(Debug, Deserialize)]
struct MetadataResponse {
    #[serde(default)]
    agent_name: String,
    #[serde(default)]
    capabilities: Vec<String>,
}

/// Discover agent capabilities by querying all configured agent services.
///
/// # Errors
///
/// Returns [`AppError::Discovery`] if no service URL is configured, if no
/// service responds successfully, or if no valid capability is discovered
/// across all responding services. Partial success (some endpoints down or
/// invalid) is tolerated.
pub async fn discover_capabilities(
    service_urls: &[String],
    timeout: Duration,
) -> Result<CapabilityIndex> {
    if service_urls.is_empty() {
        return Err(AppError::Discovery(
            "no agent service URLs configured; provide at least one service URL \
             (e.g. AGENT_SERVICES=http://localhost:8001,http://localhost:8002)"
                .to_string(),
        ));
    }

    let client = reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| AppError::Discovery(format!("failed to build HTTP client: {e}")))?;

    let mut index = CapabilityIndex::new();
    let mut responded = 0usize;
    let mut failed: Vec<String> = Vec::new();

    for url in service_urls {
        let base_url = url.trim_end_matches('/').to_string();
        match fetch_agent_metadata(&client, &base_url).await {
            Ok(metadata) => {
                responded += 1;
                match validate_metadata(&base_url, metadata) {
                    Some(registration) => {
                        info!(
                            agent = %registration.name,
                            url = %base_url,
                            capabilities = ?registration.capabilities,
                            "Discovered agent"
                        );
                        index.register(registration);
                    }
                    None => failed.push(base_url),
                }
            }
            Err(e) => {
                warn!(url = %base_url, error = %e, "Failed to fetch agent metadata");
                failed.push(base_url);
            }
        }
    }

    if responded == 0 {
        return Err(AppError::Discovery(format!(
            "no agent services responded; ensure at least one service is running. \
             Failed services: {failed:?}"
        )));
    }

    if index.is_empty() {
        return Err(AppError::Discovery(format!(
            "no agent capabilities discovered; ensure at least one service exposes \
             valid metadata. Failed services: {failed:?}"
        )));
    }

    info!(
        agents = index.registrations().count(),
        capabilities = index.len(),
        "Capability discovery complete"
    );
    Ok(index)
}

async fn fetch_agent_metadata(
    client: &reqwest::Client,
    base_url: &str,
) -> Result<MetadataResponse> {
    let response = client
        .get(format!("{base_url}/metadata"))
        .send()
        .await
        .map_err(|e| AppError::Discovery(format!("request to {base_url} failed: {e}")))?
        .error_for_status()
        .map_err(|e| AppError::Discovery(format!("metadata request to {base_url} failed: {e}")))?;

    response
        .json::<MetadataResponse>()
        .await
        .map_err(|e| AppError::Discovery(format!("invalid metadata payload from {base_url}: {e}")))
}

/// Apply the strict validation policy to one endpoint's metadata. Returns
/// `None` (after logging a warning) when the endpoint must be rejected.
fn validate_metadata(base_url: &str, metadata: MetadataResponse) -> Option<AgentRegistration> {
    let agent_name = metadata.agent_name.trim();
    if agent_name.is_empty() {
        warn!(url = %base_url, "Agent metadata rejected: missing or empty agent_name");
        return None;
    }

    if metadata.capabilities.is_empty() {
        warn!(
            url = %base_url,
            agent = %agent_name,
            "Agent metadata rejected: missing or empty capabilities"
        );
        return None;
    }

    let mut capabilities = Vec::with_capacity(metadata.capabilities.len());
    for capability in &metadata.capabilities {
        let capability = capability.trim();
        if capability.is_empty() {
            warn!(
                url = %base_url,
                agent = %agent_name,
                "Skipping empty capability entry"
            );
            continue;
        }
        capabilities.push(capability.to_string());
    }

    if capabilities.is_empty() {
        warn!(
            url = %base_url,
            agent = %agent_name,
            "Agent metadata rejected: no usable capability entries"
        );
        return None;
    }

    debug!(url = %base_url, agent = %agent_name, "Agent metadata validated");
    Some(AgentRegistration {
        name: agent_name.to_string(),
        base_url: base_url.to_string(),
        capabilities,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(name: &str, caps: &[&str]) -> MetadataResponse {
        MetadataResponse {
            agent_name: name.to_string(),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_validate_accepts_well_formed_metadata() {
        let registration =
            validate_metadata("http://localhost:8001", metadata("Researcher", &["research"]))
                .unwrap();
        assert_eq!(registration.name, "Researcher");
        assert_eq!(registration.capabilities, vec!["research"]);
    }

    #[test]
    fn test_validate_rejects_blank_agent_name() {
        assert!(validate_metadata("http://x", metadata("  ", &["research"])).is_none());
        assert!(validate_metadata("http://x", metadata("", &["research"])).is_none());
    }

    #[test]
    fn test_validate_rejects_empty_capabilities() {
        assert!(validate_metadata("http://x", metadata("Agent", &[])).is_none());
        // Entries that are all blank reject the endpoint too.
        assert!(validate_metadata("http://x", metadata("Agent", &["", "  "])).is_none());
    }

    #[test]
    fn test_validate_skips_blank_entries_but_keeps_valid_ones() {
        let registration =
            validate_metadata("http://x", metadata("Gmail", &["gmail", "", "search_email"]))
                .unwrap();
        assert_eq!(registration.capabilities, vec!["gmail", "search_email"]);
    }

    #[tokio::test]
    async fn test_discovery_with_no_urls_fails() {
        let err = discover_capabilities(&[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Discovery(_)));
    }
}
