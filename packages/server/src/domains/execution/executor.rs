//! The uniform execution contract.

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use crate::domains::planning::EditPlan;

/// Errors an executor can surface. `ModelNotInstalled` is operator-facing:
/// the activity fails with it so the install flow can be triggered.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    #[error("remote model execution failed: {detail}")]
    RemoteFailed { detail: String },

    #[error("MODEL_NOT_INSTALLED: {model}")]
    ModelNotInstalled { model: String },

    #[error("local pipeline failed: {detail}")]
    Pipeline { detail: String },
}

/// One iteration's execution input.
#[derive(Debug, Clone)]
pub struct ExecutionRequest<'a> {
    pub job_id: Uuid,
    pub iteration: u32,
    pub input_uri: &'a str,
    pub instruction: &'a str,
    pub plan: &'a EditPlan,
}

/// Output URI plus the structured execution log persisted on the iteration.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub output_uri: String,
    pub execution_log: serde_json::Value,
}

/// Executors never touch job status; they return a result or fail.
#[async_trait]
pub trait EditExecutor: Send + Sync {
    async fn execute(&self, request: ExecutionRequest<'_>)
        -> Result<ExecutionResult, ExecutorError>;

    /// "api" or "local"; recorded in execution logs and bundle defaults.
    fn runtime_mode(&self) -> &'static str;
}

/// Synthetic output location used by stubs and the local pass-through.
pub(crate) fn stub_output_uri(job_id: Uuid, iteration: u32) -> String {
    format!("minio://output/{job_id}/iter_{iteration}/edited.mp4")
}

pub(crate) fn build_execution_log(
    request: &ExecutionRequest<'_>,
    output_uri: &str,
    runtime_mode: &str,
    api_provider: &str,
    notes: &str,
) -> serde_json::Value {
    json!({
        "timestamp": Utc::now().to_rfc3339(),
        "input_uri": request.input_uri,
        "output_uri": output_uri,
        "capability": request.plan.capability.as_str(),
        "tool_chain": request.plan.tool_chain,
        "model_bundle": request.plan.model_bundle,
        "runtime_mode": runtime_mode,
        "api_provider": api_provider,
        "constraints": request.plan.constraints,
        "notes": notes,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::planning::generate_plan;

    #[test]
    fn stub_output_uri_follows_the_artifact_layout() {
        let job_id = Uuid::new_v4();
        assert_eq!(
            stub_output_uri(job_id, 2),
            format!("minio://output/{job_id}/iter_2/edited.mp4")
        );
    }

    #[test]
    fn execution_log_captures_the_full_context() {
        let plan = generate_plan("Remove the closed book", "balanced_12g_bundle", &[], None, 3);
        let job_id = Uuid::new_v4();
        let request = ExecutionRequest {
            job_id,
            iteration: 1,
            input_uri: "file://samples/0101_raw.mp4",
            instruction: "Remove the closed book",
            plan: &plan,
        };
        let output = stub_output_uri(job_id, 1);
        let log = build_execution_log(&request, &output, "api", "openai_compatible", "ok");

        assert_eq!(log["input_uri"], "file://samples/0101_raw.mp4");
        assert_eq!(log["output_uri"], output.as_str());
        assert_eq!(log["capability"], "remove_object");
        assert_eq!(log["runtime_mode"], "api");
        assert_eq!(log["notes"], "ok");
        assert!(log["tool_chain"].as_array().is_some());
        assert!(log["constraints"].is_object());
    }
}
