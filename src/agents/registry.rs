//! Capability index mapping capability names to the agents providing them.
//!
//! Built once by discovery at startup and treated as immutable during
//! request processing. It is an explicit value passed into the workflow
//! engine, never a process-wide singleton.

use std::collections::{BTreeMap, HashMap};
use tracing::warn;

/// Metadata for one discovered agent service.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentRegistration {
    /// Agent name as declared by the service.
    pub name: String,
    /// Base URL of the agent service.
    pub base_url: String,
    /// Capabilities the agent declares.
    pub capabilities: Vec<String>,
}

/// Mapping from capability name to the agent registered for it.
#[derive(Debug, Clone, Default)]
pub struct CapabilityIndex {
    /// capability -> agent name. BTreeMap so capability listings are sorted.
    by_capability: BTreeMap<String, String>,
    /// agent name -> registration.
    agents: HashMap<String, AgentRegistration>,
}

impl CapabilityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent and all of its capabilities.
    ///
    /// If a capability was already registered by another agent, the later
    /// registration wins. That is a warning, not an error.
    pub fn register(&mut self, registration: AgentRegistration) {
        for capability in &registration.capabilities {
            if let Some(previous) = self.by_capability.get(capability) {
                if previous != &registration.name {
                    warn!(
                        capability = %capability,
                        previous_agent = %previous,
                        new_agent = %registration.name,
                        "Capability already registered, overwriting"
                    );
                }
            }
            self.by_capability
                .insert(capability.clone(), registration.name.clone());
        }
        self.agents
            .insert(registration.name.clone(), registration);
    }

    /// Sorted list of all known capability names. This is the set injected
    /// into the Supervisor's initial context.
    pub fn capabilities(&self) -> Vec<String> {
        self.by_capability.keys().cloned().collect()
    }

    /// Name of the agent registered for a capability.
    pub fn agent_for(&self, capability: &str) -> Option<&str> {
        self.by_capability.get(capability).map(String::as_str)
    }

    /// Registration details for an agent by name.
    pub fn registration(&self, agent_name: &str) -> Option<&AgentRegistration> {
        self.agents.get(agent_name)
    }

    /// All registered agents.
    pub fn registrations(&self) -> impl Iterator<Item = &AgentRegistration> {
        self.agents.values()
    }

    pub fn len(&self) -> usize {
        self.by_capability.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_capability.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registration(name: &str, caps: &[&str]) -> AgentRegistration {
        AgentRegistration {
            name: name.to_string(),
            base_url: format!("http://localhost:8000/{name}"),
            capabilities: caps.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut index = CapabilityIndex::new();
        index.register(registration("Researcher", &["research"]));
        index.register(registration("Gmail", &["gmail", "search_email"]));

        assert_eq!(index.len(), 3);
        assert_eq!(index.agent_for("research"), Some("Researcher"));
        assert_eq!(index.agent_for("gmail"), Some("Gmail"));
        assert_eq!(index.agent_for("unknown"), None);
        assert!(index.registration("Gmail").is_some());
    }

    #[test]
    fn test_capabilities_are_sorted() {
        let mut index = CapabilityIndex::new();
        index.register(registration("Zeta", &["zeta_task"]));
        index.register(registration("Alpha", &["alpha_task"]));
        index.register(registration("Mid", &["middle_task"]));

        assert_eq!(
            index.capabilities(),
            vec!["alpha_task", "middle_task", "zeta_task"]
        );
    }

    #[test]
    fn test_duplicate_capability_last_write_wins() {
        let mut index = CapabilityIndex::new();
        index.register(registration("First", &["research"]));
        index.register(registration("Second", &["research"]));

        assert_eq!(index.agent_for("research"), Some("Second"));
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_empty_index() {
        let index = CapabilityIndex::new();
        assert!(index.is_empty());
        assert!(index.capabilities().is_empty());
    }
}
