//! Supervisor state machine: plan tracking and capability dispatch.
//!
//! The Supervisor turns an open-ended natural-language request into an
//! ordered plan of capability names, dispatches them one at a time, and
//! tracks progress through completion contracts found in agent responses.
//!
//! States:
//! - no plan yet: build one via the planning LLM call, or answer directly
//!   when no capability is available or the plan comes back empty
//! - dispatching: inspect the most recent AI message for a contract,
//!   advance or retry, then emit the next capability to route
//! - finished: the plan is exhausted
//!
//! Loop prevention is deliberate liveness-over-strictness: an agent that
//! repeatedly responds without a contract is eventually treated as done,
//! and a capability is never dispatched more than [`MAX_RETRIES`]
//! consecutive times without forced advancement.

pub mod planner;

use crate::contract;
use crate::llm::LLMClient;
use crate::types::{last_ai_message, original_request, AppError, Message, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Maximum consecutive dispatches of one capability before it is
/// force-marked completed to guarantee termination.
pub const MAX_RETRIES: u32 = 3;

/// After this many dispatches without a contract, a responding but
/// non-conforming agent is treated as implicitly complete.
pub(crate) const IMPLICIT_COMPLETION_THRESHOLD: u32 = 2;

const DIRECT_ANSWER_SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer the user's question directly and clearly.";

const FALLBACK_REQUEST: &str = "Process the request";

/// How the Supervisor resolved a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SupervisorMode {
    /// A plan was built and capabilities were dispatched.
    Planned,
    /// The request was answered in one shot with no plan.
    Direct,
}

/// What the caller should do next after one Supervisor step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Route the named capability to its registered agent.
    Dispatch(String),
    /// The request is complete; no further dispatch.
    Finish,
}

/// Reference to an artifact produced by a document-creation capability,
/// extracted from the contract payload for downstream steps (e.g. an email
/// step attaching the file).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentArtifact {
    pub file_path: Option<String>,
    pub abs_file_path: Option<String>,
}

impl DocumentArtifact {
    /// The path downstream steps should use, preferring the absolute one.
    pub fn preferred_path(&self) -> Option<&str> {
        self.abs_file_path
            .as_deref()
            .or(self.file_path.as_deref())
    }
}

/// Mutable execution state carried across every Supervisor step for one
/// request.
///
/// The step index is private: it can only advance, never decrease, and is
/// clamped to the plan length.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    capabilities: BTreeSet<String>,
    plan: Option<Vec<String>>,
    current_step_index: usize,
    completed_capabilities: HashSet<String>,
    agent_retry_count: HashMap<String, u32>,
    /// How the request was resolved; `Direct` when no plan was ever built.
    pub mode: SupervisorMode,
    /// Artifact reference captured from a document-creation contract.
    pub artifact: Option<DocumentArtifact>,
    /// Opaque payload written by agents for downstream consumption, keyed
    /// `{capability}_data`. Not interpreted by control logic.
    pub extra: serde_json::Map<String, Value>,
}

impl ExecutionContext {
    /// Create a fresh context with the externally supplied capability set.
    pub fn new(capabilities: impl IntoIterator<Item = String>) -> Self {
        Self {
            capabilities: capabilities.into_iter().collect(),
            plan: None,
            current_step_index: 0,
            completed_capabilities: HashSet::new(),
            agent_retry_count: HashMap::new(),
            mode: SupervisorMode::Planned,
            artifact: None,
            extra: serde_json::Map::new(),
        }
    }

    /// The capability set available system-wide (read-only).
    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    /// The plan, once built.
    pub fn plan(&self) -> Option<&[String]> {
        self.plan.as_deref()
    }

    /// Cursor into the plan; `0 <= index <= plan.len()`.
    pub fn current_step_index(&self) -> usize {
        self.current_step_index
    }

    /// Whether a capability has already been advanced past.
    pub fn is_completed(&self, capability: &str) -> bool {
        self.completed_capabilities.contains(capability)
    }

    /// Dispatch attempts made for a capability without a detected contract.
    pub fn retry_count(&self, capability: &str) -> u32 {
        self.agent_retry_count
            .get(capability)
            .copied()
            .unwrap_or(0)
    }

    fn plan_len(&self) -> usize {
        self.plan.as_ref().map(Vec::len).unwrap_or(0)
    }

    fn advance(&mut self) {
        if self.current_step_index < self.plan_len() {
            self.current_step_index += 1;
        }
    }

    fn mark_completed(&mut self, capability: &str) {
        self.completed_capabilities.insert(capability.to_string());
        self.agent_retry_count.remove(capability);
    }
}

/// The planner/dispatcher. Owns the LLM used for planning and for direct
/// answers; agents are reached through the workflow engine, not from here.
pub struct Supervisor {
    llm: Arc<dyn LLMClient>,
}

impl Supervisor {
    pub fn new(llm: Arc<dyn LLMClient>) -> Self {
        Self { llm }
    }

    /// Run one synchronous Supervisor step.
    ///
    /// On the first step this builds the plan (or answers directly); on
    /// every later step it inspects the latest agent response, advances or
    /// retries, and decides what to dispatch next. A direct answer is
    /// appended to `history` before `Finish` is returned.
    pub async fn step(
        &self,
        ctx: &mut ExecutionContext,
        history: &mut Vec<Message>,
    ) -> Result<Decision> {
        if ctx.plan.is_none() {
            if ctx.capabilities.is_empty() {
                warn!("No capabilities available, answering directly");
                return self.answer_directly(ctx, history).await;
            }

            let request = original_request(history)
                .unwrap_or(FALLBACK_REQUEST)
                .to_string();
            let steps =
                planner::build_plan(self.llm.as_ref(), &request, &ctx.capabilities).await?;

            if steps.is_empty() {
                info!("Plan is empty, answering directly");
                return self.answer_directly(ctx, history).await;
            }

            info!(steps = ?steps, "Supervisor created plan");
            ctx.plan = Some(steps);
            // Fall through: a fresh history has no AI message, so the
            // contract inspection below is a no-op and plan[0] dispatches.
        }

        self.track_progress(ctx, history);

        let plan = ctx
            .plan
            .clone()
            .ok_or_else(|| AppError::Internal("plan missing after planning phase".into()))?;

        if ctx.current_step_index >= plan.len() {
            info!("All plan steps completed, finishing");
            return Ok(Decision::Finish);
        }

        loop {
            let capability = plan[ctx.current_step_index].clone();

            // Already satisfied out of band: skip forward.
            if ctx.is_completed(&capability) {
                info!(capability = %capability, "Capability already completed, skipping step");
                ctx.advance();
                if ctx.current_step_index >= plan.len() {
                    return Ok(Decision::Finish);
                }
                continue;
            }

            // Loop breaker: a permanently failing agent must not stall the
            // plan forever.
            if ctx.retry_count(&capability) >= MAX_RETRIES {
                error!(
                    capability = %capability,
                    max_retries = MAX_RETRIES,
                    "Capability failed to complete after maximum attempts, forcing advancement"
                );
                ctx.mark_completed(&capability);
                ctx.advance();
                if ctx.current_step_index >= plan.len() {
                    return Ok(Decision::Finish);
                }
                continue;
            }

            *ctx.agent_retry_count.entry(capability.clone()).or_insert(0) += 1;

            // Hard precondition: a planned capability must be available. A
            // violation is a discovery/planning mismatch bug, never
            // downgraded.
            if !ctx.capabilities.contains(&capability) {
                return Err(AppError::Configuration(format!(
                    "capability '{capability}' was planned but is not available \
                     (available: {:?}); it must be discovered before the \
                     Supervisor can dispatch it",
                    ctx.capabilities
                )));
            }

            info!(
                step = ctx.current_step_index + 1,
                total = plan.len(),
                capability = %capability,
                attempt = ctx.retry_count(&capability),
                max_attempts = MAX_RETRIES,
                "Dispatching capability"
            );
            return Ok(Decision::Dispatch(capability));
        }
    }

    /// Inspect the most recent AI message for a completion contract and
    /// advance the plan cursor accordingly. Human messages never advance.
    fn track_progress(&self, ctx: &mut ExecutionContext, history: &[Message]) {
        let Some(content) = last_ai_message(history).map(|m| m.content.clone()) else {
            return;
        };

        if let Some(found) = contract::parse(&content) {
            let capability = found.completed_capability.clone();

            if !ctx.is_completed(&capability) {
                ctx.mark_completed(&capability);
                ctx.advance();
                self.record_payload(ctx, &capability, found.data);
                info!(
                    capability = %capability,
                    step = ctx.current_step_index,
                    total = ctx.plan_len(),
                    "Agent completed capability, advancing"
                );
            } else {
                // Duplicate signal: idempotent skip, nothing re-recorded.
                info!(
                    capability = %capability,
                    "Capability already completed, skipping to next step"
                );
                ctx.advance();
            }
            return;
        }

        // An agent responded for the current step but without a contract.
        if ctx.current_step_index < ctx.plan_len() {
            let current = ctx.plan.as_ref().map(|p| p[ctx.current_step_index].clone());
            if let Some(current) = current {
                let attempts = ctx.retry_count(&current);
                if attempts >= IMPLICIT_COMPLETION_THRESHOLD && !ctx.is_completed(&current) {
                    warn!(
                        capability = %current,
                        attempts,
                        "Agent responded without a completion contract after repeated \
                         attempts, treating as implicit completion"
                    );
                    ctx.mark_completed(&current);
                    ctx.advance();
                }
            }
        }
    }

    /// Store contract payload for downstream steps. Document-creation
    /// capabilities additionally surface the produced artifact reference,
    /// preferring the absolute path.
    fn record_payload(&self, ctx: &mut ExecutionContext, capability: &str, data: Option<Value>) {
        let Some(data) = data else { return };

        if is_document_capability(capability) {
            if let Some(artifact) = artifact_from_payload(&data) {
                if let Some(path) = artifact.preferred_path() {
                    ctx.extra
                        .insert("file_path".to_string(), Value::String(path.to_string()));
                }
                info!(
                    capability = %capability,
                    path = ?artifact.preferred_path(),
                    "Captured document artifact reference"
                );
                ctx.artifact = Some(artifact);
            }
        }

        ctx.extra.insert(format!("{capability}_data"), data);
    }

    /// Answer the user's request in one shot with no plan and no dispatch.
    async fn answer_directly(
        &self,
        ctx: &mut ExecutionContext,
        history: &mut Vec<Message>,
    ) -> Result<Decision> {
        let mut turns: Vec<(String, String)> =
            vec![("system".to_string(), DIRECT_ANSWER_SYSTEM_PROMPT.to_string())];
        for message in history.iter() {
            let role = if message.is_ai() { "assistant" } else { "user" };
            turns.push((role.to_string(), message.content.clone()));
        }

        let answer = self.llm.generate_with_history(&turns).await?;

        history.push(Message::ai(answer));
        ctx.mode = SupervisorMode::Direct;
        info!("Answered directly without a plan");
        Ok(Decision::Finish)
    }
}

/// Whether a capability is document-creation-like, i.e. its contract
/// payload carries a produced-file reference worth extracting.
fn is_document_capability(capability: &str) -> bool {
    capability.contains("document")
}

fn artifact_from_payload(data: &Value) -> Option<DocumentArtifact> {
    let obj = data.as_object()?;
    let file_path = obj
        .get("file_path")
        .and_then(Value::as_str)
        .map(str::to_string);
    let abs_file_path = obj
        .get("abs_file_path")
        .and_then(Value::as_str)
        .map(str::to_string);

    if file_path.is_none() && abs_file_path.is_none() {
        return None;
    }
    Some(DocumentArtifact {
        file_path,
        abs_file_path,
    })
}
