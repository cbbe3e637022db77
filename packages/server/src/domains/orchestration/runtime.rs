//! Runtime selection: durable workflow first, in-process fallback second.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use serde_json::json;
use uuid::Uuid;

use crate::domains::jobs::repository::{log_job_event, set_job_status};
use crate::domains::jobs::{EventLevel, JobStatus};
use crate::domains::orchestration::client::WorkflowClient;
use crate::domains::orchestration::fallback::spawn_fallback;
use crate::kernel::ServerDeps;

/// Surfaced to the API as 503 when neither runtime can take the job.
#[derive(Debug, thiserror::Error)]
pub enum StartError {
    #[error("unable to start workflow")]
    WorkflowUnavailable,

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Process-local registry of jobs running under the fallback runtime, so a
/// duplicate submit never starts a second concurrent run for the same job.
#[derive(Clone, Default)]
pub struct InflightTracker {
    inner: Arc<Mutex<HashSet<Uuid>>>,
}

impl InflightTracker {
    /// Claim a job slot. Returns false when the job is already running.
    pub fn try_claim(&self, job_id: Uuid) -> bool {
        self.inner.lock().expect("inflight lock poisoned").insert(job_id)
    }

    pub fn release(&self, job_id: Uuid) {
        self.inner.lock().expect("inflight lock poisoned").remove(&job_id);
    }

    pub fn is_running(&self, job_id: Uuid) -> bool {
        self.inner.lock().expect("inflight lock poisoned").contains(&job_id)
    }
}

/// Start orchestration for a queued job.
///
/// Try the workflow engine first; on failure fall back to the in-process
/// runtime when enabled, otherwise force the job to `failed` and report
/// the engine outage to the caller.
pub async fn start_orchestration(deps: &Arc<ServerDeps>, job_id: Uuid) -> Result<(), StartError> {
    match deps.workflow_client.start_video_edit(job_id).await {
        Ok(()) => {
            log_job_event(
                &deps.db_pool,
                Some(job_id),
                "workflow_started",
                EventLevel::Info,
                "Durable workflow started",
                json!({ "workflow_key": WorkflowClient::workflow_key(job_id) }),
            )
            .await
            .map_err(anyhow::Error::from)?;
            Ok(())
        }
        Err(start_err) => {
            log_job_event(
                &deps.db_pool,
                Some(job_id),
                "workflow_start_error",
                EventLevel::Error,
                "Failed to start durable workflow",
                json!({ "error": start_err.to_string() }),
            )
            .await
            .map_err(anyhow::Error::from)?;

            if deps.config.enable_fallback_orchestrator {
                if deps.inflight.try_claim(job_id) {
                    spawn_fallback(deps.clone(), job_id);
                } else {
                    tracing::warn!(job_id = %job_id, "fallback already in flight, not starting another run");
                }
                log_job_event(
                    &deps.db_pool,
                    Some(job_id),
                    "fallback_started",
                    EventLevel::Warning,
                    "Workflow engine unavailable, fallback orchestrator started",
                    json!({}),
                )
                .await
                .map_err(anyhow::Error::from)?;
                return Ok(());
            }

            set_job_status(&deps.db_pool, job_id, JobStatus::Failed, false)
                .await
                .map_err(|err| StartError::Internal(err.into()))?;
            log_job_event(
                &deps.db_pool,
                Some(job_id),
                "job_failed",
                EventLevel::Error,
                "Workflow engine unavailable and fallback disabled",
                json!({}),
            )
            .await
            .map_err(anyhow::Error::from)?;

            Err(StartError::WorkflowUnavailable)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inflight_claims_are_exclusive() {
        let tracker = InflightTracker::default();
        let job_id = Uuid::new_v4();

        assert!(tracker.try_claim(job_id));
        assert!(tracker.is_running(job_id));
        assert!(!tracker.try_claim(job_id));

        tracker.release(job_id);
        assert!(!tracker.is_running(job_id));
        assert!(tracker.try_claim(job_id));
    }

    #[test]
    fn different_jobs_do_not_contend() {
        let tracker = InflightTracker::default();
        assert!(tracker.try_claim(Uuid::new_v4()));
        assert!(tracker.try_claim(Uuid::new_v4()));
    }
}
