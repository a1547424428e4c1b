//! Workflow execution over supervisor decisions.

pub mod engine;

pub use engine::{WorkflowEngine, WorkflowOutput, WorkflowStep};
