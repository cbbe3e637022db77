//! The orchestration state machine.
//!
//! One set of activities drives both runtimes: the durable Restate workflow
//! (preferred) and the in-process fallback used when the workflow engine is
//! unreachable at submit time.

pub mod activities;
mod client;
mod contracts;
mod fallback;
mod runtime;
mod workflow;

pub use client::WorkflowClient;
pub use contracts::{
    ExecutionStage, PlanStage, QaStage, SafetyStage, WorkflowInput, WorkflowSummary,
};
pub use fallback::run_fallback;
pub use runtime::{start_orchestration, InflightTracker, StartError};
pub use workflow::{VideoEditWorkflow, VideoEditWorkflowImpl};
