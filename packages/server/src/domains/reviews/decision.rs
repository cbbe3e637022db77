//! Applying a human decision to a job.

use std::sync::Arc;

use uuid::Uuid;

use crate::domains::callbacks::notify_review_decision;
use crate::domains::jobs::repository::{self, set_job_status, StatusError};
use crate::domains::jobs::{Job, JobStatus, ReviewDecision};
use crate::domains::orchestration::{start_orchestration, StartError};
use crate::kernel::ServerDeps;

#[derive(Debug, thiserror::Error)]
pub enum DecisionError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("{0}")]
    InvalidState(String),

    #[error("unable to start workflow")]
    WorkflowUnavailable,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<StatusError> for DecisionError {
    fn from(err: StatusError) -> Self {
        match err {
            StatusError::NotFound(job_id) => DecisionError::NotFound(job_id),
            StatusError::InvalidTransition { .. } => DecisionError::InvalidState(err.to_string()),
            StatusError::Database(db) => DecisionError::Internal(db.into()),
        }
    }
}

fn ensure_reviewable(job: &Job, decision: ReviewDecision) -> Result<(), DecisionError> {
    match decision {
        ReviewDecision::Approve | ReviewDecision::Reject => {
            if job.status != JobStatus::HumanReview {
                return Err(DecisionError::InvalidState(format!(
                    "job status must be human_review for {}",
                    decision.as_str()
                )));
            }
        }
        ReviewDecision::Rerun => {
            if !matches!(job.status, JobStatus::HumanReview | JobStatus::Failed) {
                return Err(DecisionError::InvalidState(
                    "job status must be human_review or failed for rerun".to_string(),
                ));
            }
        }
    }
    Ok(())
}

/// Apply a review decision and return the job in its resulting status.
///
/// Approve and reject deliver a callback flagged `source=manual_review`;
/// rerun resets the per-run fields and restarts orchestration.
pub async fn apply_decision(
    deps: &Arc<ServerDeps>,
    job_id: Uuid,
    decision: ReviewDecision,
    reviewer: &str,
    reason: &str,
) -> Result<Job, DecisionError> {
    let job = repository::get_job(&deps.db_pool, job_id)
        .await
        .map_err(DecisionError::Internal)?
        .ok_or(DecisionError::NotFound(job_id))?;

    ensure_reviewable(&job, decision)?;

    repository::create_review_action(&deps.db_pool, job_id, decision, reviewer, reason)
        .await
        .map_err(DecisionError::Internal)?;

    let updated = match decision {
        ReviewDecision::Approve => {
            let updated = set_job_status(&deps.db_pool, job_id, JobStatus::Succeeded, true).await?;
            notify_review_decision(&deps.db_pool, &deps.callbacks, &updated)
                .await
                .map_err(DecisionError::Internal)?;
            updated
        }
        ReviewDecision::Reject => {
            let updated = set_job_status(&deps.db_pool, job_id, JobStatus::Failed, true).await?;
            notify_review_decision(&deps.db_pool, &deps.callbacks, &updated)
                .await
                .map_err(DecisionError::Internal)?;
            updated
        }
        ReviewDecision::Rerun => {
            repository::reset_job_for_rerun(&deps.db_pool, job_id)
                .await
                .map_err(DecisionError::Internal)?;
            let updated = set_job_status(&deps.db_pool, job_id, JobStatus::Queued, true).await?;

            match start_orchestration(deps, job_id).await {
                Ok(()) => {}
                Err(StartError::WorkflowUnavailable) => {
                    return Err(DecisionError::WorkflowUnavailable)
                }
                Err(StartError::Internal(err)) => return Err(DecisionError::Internal(err)),
            }
            updated
        }
    };

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::id::new_id;
    use chrono::Utc;

    fn job_with_status(status: JobStatus) -> Job {
        Job {
            id: new_id(),
            idempotency_key: None,
            status,
            instruction: "Remove the closed book".to_string(),
            input_uri: "file://samples/0101_raw.mp4".to_string(),
            output_uri: None,
            capability: None,
            model_bundle: None,
            risk_level: None,
            metadata: serde_json::json!({}),
            latest_qa_score: None,
            current_iteration: 0,
            max_iterations: 3,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn approve_requires_human_review_status() {
        let job = job_with_status(JobStatus::Queued);
        assert!(ensure_reviewable(&job, ReviewDecision::Approve).is_err());

        let job = job_with_status(JobStatus::HumanReview);
        assert!(ensure_reviewable(&job, ReviewDecision::Approve).is_ok());
    }

    #[test]
    fn reject_requires_human_review_status() {
        let job = job_with_status(JobStatus::Succeeded);
        assert!(ensure_reviewable(&job, ReviewDecision::Reject).is_err());
    }

    #[test]
    fn rerun_accepts_human_review_and_failed() {
        assert!(ensure_reviewable(&job_with_status(JobStatus::HumanReview), ReviewDecision::Rerun).is_ok());
        assert!(ensure_reviewable(&job_with_status(JobStatus::Failed), ReviewDecision::Rerun).is_ok());
        assert!(ensure_reviewable(&job_with_status(JobStatus::Queued), ReviewDecision::Rerun).is_err());
    }
}
