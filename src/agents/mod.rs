pub mod discovery;
pub mod registry;
pub mod remote;

use crate::types::{Message, Result};
use async_trait::async_trait;

// Re-export commonly used types
pub use discovery::discover_capabilities;
pub use registry::{AgentRegistration, CapabilityIndex};
pub use remote::RemoteAgent;

/// Uniform invocation contract for an agent, local or remote.
///
/// Input is the full conversation the agent needs; output is exactly one
/// AI response message. Reachability failures are hard errors surfaced to
/// the caller; retry policy belongs to the Supervisor, not the adapter.
#[async_trait]
pub trait Agent: Send + Sync {
    /// Send the conversation state and receive one response message.
    async fn invoke(&self, history: &[Message]) -> Result<Message>;

    /// The agent's registered name.
    fn name(&self) -> &str;
}
