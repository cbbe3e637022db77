//! Serialized payloads crossing the workflow journal boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domains::planning::EditPlan;
use crate::domains::qa::QaReport;
use crate::impl_restate_serde;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowInput {
    pub job_id: Uuid,
}

impl_restate_serde!(WorkflowInput);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSummary {
    pub job_id: Uuid,
    pub final_status: String,
    pub final_output_uri: Option<String>,
    pub iterations: u32,
}

impl_restate_serde!(WorkflowSummary);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyStage {
    pub allowed: bool,
    pub blocked_rules: Vec<String>,
    pub reason: String,
}

impl_restate_serde!(SafetyStage);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlanStage {
    pub edit_plan: EditPlan,
    /// Plan plus retrieved cases, as persisted on the iteration row.
    pub plan_snapshot: serde_json::Value,
}

impl_restate_serde!(PlanStage);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStage {
    pub output_uri: String,
    pub execution_log: serde_json::Value,
}

impl_restate_serde!(ExecutionStage);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaStage {
    pub report: QaReport,
    pub passed: bool,
    pub requires_manual_review: bool,
    pub gate_reasons: Vec<String>,
}

impl_restate_serde!(QaStage);
