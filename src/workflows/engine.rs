//! Workflow Engine
//!
//! Drives one request to completion: repeatedly asks the [`Supervisor`]
//! for the next decision, routes dispatched capabilities to their
//! registered agents, and records the execution trace.

use crate::agents::{Agent, CapabilityIndex, RemoteAgent};
use crate::supervisor::{Decision, ExecutionContext, Supervisor, SupervisorMode};
use crate::types::{last_ai_message, AppError, Message, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// Absolute ceiling on dispatch iterations for one request. The
/// supervisor's own retry accounting terminates well below this; the
/// ceiling exists so a logic regression can never spin forever.
const MAX_ITERATIONS: usize = 64;

/// Output from a workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowOutput {
    /// The final response from the workflow
    pub final_response: String,
    /// Number of agent invocations executed
    pub steps_executed: usize,
    /// Capabilities that were dispatched, in order (with repeats)
    pub capabilities_dispatched: Vec<String>,
    /// Detailed reasoning path showing each step
    pub reasoning_path: Vec<WorkflowStep>,
    /// Whether the request went through a plan or was answered directly
    pub mode: SupervisorMode,
}

/// A single step in the workflow execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStep {
    /// The capability that was dispatched
    pub capability: String,
    /// The agent that executed this step
    pub agent_name: String,
    /// The output from the agent
    pub output: String,
    /// Unix timestamp when this step was executed
    pub timestamp: i64,
    /// Duration of this step in milliseconds
    pub duration_ms: u64,
}

/// Workflow engine that orchestrates supervisor decisions and agent
/// invocations
pub struct WorkflowEngine {
    supervisor: Supervisor,
    index: CapabilityIndex,
    agents: HashMap<String, Arc<dyn Agent>>,
}

impl WorkflowEngine {
    /// Create an engine over an explicit agent set. Useful when agents are
    /// constructed by hand (tests, embedded use).
    pub fn new(
        supervisor: Supervisor,
        index: CapabilityIndex,
        agents: HashMap<String, Arc<dyn Agent>>,
    ) -> Self {
        Self {
            supervisor,
            index,
            agents,
        }
    }

    /// Create an engine from a discovery result, building one
    /// [`RemoteAgent`] per registered service.
    pub fn from_discovery(
        supervisor: Supervisor,
        index: CapabilityIndex,
        invoke_timeout: Duration,
    ) -> Result<Self> {
        let mut agents: HashMap<String, Arc<dyn Agent>> = HashMap::new();
        for registration in index.registrations() {
            let agent = RemoteAgent::new(
                registration.name.clone(),
                registration.base_url.clone(),
                invoke_timeout,
            )?;
            agents.insert(registration.name.clone(), Arc::new(agent));
        }
        Ok(Self::new(supervisor, index, agents))
    }

    /// Run one user request to completion.
    ///
    /// # Errors
    ///
    /// Propagates planning failures, configuration mismatches, and agent
    /// unreachability. An unreachable agent aborts the workflow; it is
    /// never silently skipped or substituted.
    pub async fn run(&self, request: &str) -> Result<WorkflowOutput> {
        let mut history = vec![Message::human(request)];
        let mut ctx = ExecutionContext::new(self.index.capabilities());
        let mut reasoning_path: Vec<WorkflowStep> = Vec::new();
        let mut capabilities_dispatched: Vec<String> = Vec::new();

        info!(request_len = request.len(), "Starting workflow");

        for _ in 0..MAX_ITERATIONS {
            match self.supervisor.step(&mut ctx, &mut history).await? {
                Decision::Finish => {
                    let final_response = last_ai_message(&history)
                        .map(|m| m.content.clone())
                        .unwrap_or_default();
                    info!(
                        steps = reasoning_path.len(),
                        mode = ?ctx.mode,
                        "Workflow finished"
                    );
                    return Ok(WorkflowOutput {
                        final_response,
                        steps_executed: reasoning_path.len(),
                        capabilities_dispatched,
                        reasoning_path,
                        mode: ctx.mode,
                    });
                }
                Decision::Dispatch(capability) => {
                    let step = self.dispatch(&capability, &mut history).await?;
                    capabilities_dispatched.push(capability);
                    reasoning_path.push(step);
                }
            }
        }

        Err(AppError::Internal(format!(
            "workflow exceeded {MAX_ITERATIONS} iterations without finishing"
        )))
    }

    async fn dispatch(&self, capability: &str, history: &mut Vec<Message>) -> Result<WorkflowStep> {
        let agent_name = self.index.agent_for(capability).ok_or_else(|| {
            AppError::Configuration(format!(
                "capability '{capability}' has no registered agent"
            ))
        })?;
        let agent = self.agents.get(agent_name).ok_or_else(|| {
            AppError::Configuration(format!(
                "agent '{agent_name}' is registered but has no client instance"
            ))
        })?;

        let step_start = std::time::Instant::now();
        let timestamp = Utc::now().timestamp();

        let response = agent.invoke(history).await?;
        let duration_ms = step_start.elapsed().as_millis() as u64;

        let step = WorkflowStep {
            capability: capability.to_string(),
            agent_name: agent_name.to_string(),
            output: response.content.clone(),
            timestamp,
            duration_ms,
        };
        history.push(response);
        Ok(step)
    }
}
