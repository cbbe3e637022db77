//! Manual-review decision endpoint.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{ApiError, ApiResult};
use crate::domains::jobs::{JobStatus, ReviewDecision};
use crate::domains::reviews::{apply_decision, DecisionError};
use crate::kernel::ServerDeps;

fn default_reviewer() -> String {
    "ops-reviewer".to_string()
}

fn default_reason() -> String {
    "manual review action".to_string()
}

#[derive(Debug, Deserialize)]
pub struct ReviewDecisionRequest {
    pub decision: ReviewDecision,
    #[serde(default = "default_reviewer")]
    pub reviewer: String,
    #[serde(default = "default_reason")]
    pub reason: String,
}

#[derive(Debug, Serialize)]
pub struct ReviewDecisionResponse {
    pub job_id: Uuid,
    pub decision: ReviewDecision,
    pub resulting_status: JobStatus,
}

pub async fn review_decision_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Path(job_id): Path<Uuid>,
    Json(payload): Json<ReviewDecisionRequest>,
) -> ApiResult<Json<ReviewDecisionResponse>> {
    let job = apply_decision(
        &deps,
        job_id,
        payload.decision,
        &payload.reviewer,
        &payload.reason,
    )
    .await
    .map_err(|err| match err {
        DecisionError::NotFound(_) => ApiError::NotFound("job not found".to_string()),
        DecisionError::InvalidState(message) => ApiError::InvalidState(message),
        DecisionError::WorkflowUnavailable => {
            ApiError::ServiceUnavailable("unable to start workflow".to_string())
        }
        DecisionError::Internal(inner) => ApiError::Internal(inner),
    })?;

    Ok(Json(ReviewDecisionResponse {
        job_id,
        decision: payload.decision,
        resulting_status: job.status,
    }))
}
