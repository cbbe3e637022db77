//! In-process orchestrator used when the workflow engine is unreachable.
//!
//! Runs the same activities as the durable workflow, without a journal:
//! a server restart aborts the run and leaves the job in its last written
//! status, recoverable via a `rerun` decision.

use std::sync::Arc;

use anyhow::Result;
use serde_json::json;
use uuid::Uuid;

use crate::domains::jobs::repository::log_job_event;
use crate::domains::jobs::{EventLevel, JobStatus};
use crate::domains::orchestration::activities;
use crate::domains::orchestration::contracts::WorkflowSummary;
use crate::domains::qa::QaIssue;
use crate::kernel::ServerDeps;

/// Drive one job to a terminal status in-process.
pub async fn run_fallback(deps: Arc<ServerDeps>, job_id: Uuid) -> Result<WorkflowSummary> {
    let safety = activities::safety_precheck(&deps, job_id).await?;
    if !safety.allowed {
        activities::finalize_blocked(&deps, job_id, &safety.reason).await?;
        return Ok(WorkflowSummary {
            job_id,
            final_status: JobStatus::Blocked.as_str().to_string(),
            final_output_uri: None,
            iterations: 0,
        });
    }

    let max_iterations = deps.config.max_iterations;
    let mut prior_issues: Vec<QaIssue> = vec![];
    let mut latest_output_uri: Option<String> = None;
    let mut latest_report = json!({});

    for iteration in 1..=max_iterations {
        let plan_stage =
            activities::plan_iteration(&deps, job_id, iteration, &prior_issues).await?;
        let execution = activities::execute_iteration(
            &deps,
            job_id,
            iteration,
            &plan_stage.edit_plan,
            &plan_stage.plan_snapshot,
        )
        .await?;
        let qa =
            activities::qa_iteration(&deps, job_id, iteration, &execution.output_uri).await?;

        latest_output_uri = Some(execution.output_uri.clone());
        latest_report = serde_json::to_value(&qa.report)?;

        if qa.passed {
            if qa.requires_manual_review {
                let reason = if qa.gate_reasons.is_empty() {
                    "manual_review_required".to_string()
                } else {
                    qa.gate_reasons.join(",")
                };
                activities::finalize_human_review(&deps, job_id, iteration, &latest_report, &reason)
                    .await?;
                return Ok(WorkflowSummary {
                    job_id,
                    final_status: JobStatus::HumanReview.as_str().to_string(),
                    final_output_uri: latest_output_uri,
                    iterations: iteration,
                });
            }

            activities::finalize_success(
                &deps,
                job_id,
                iteration,
                &latest_report,
                &execution.output_uri,
            )
            .await?;
            return Ok(WorkflowSummary {
                job_id,
                final_status: JobStatus::Succeeded.as_str().to_string(),
                final_output_uri: latest_output_uri,
                iterations: iteration,
            });
        }

        prior_issues = qa.report.issues.clone();
    }

    activities::finalize_human_review(
        &deps,
        job_id,
        max_iterations,
        &latest_report,
        "qa_not_passed_after_max_iterations",
    )
    .await?;

    Ok(WorkflowSummary {
        job_id,
        final_status: JobStatus::HumanReview.as_str().to_string(),
        final_output_uri: latest_output_uri,
        iterations: max_iterations,
    })
}

/// Spawn the fallback task with audit logging around its lifetime.
pub(crate) fn spawn_fallback(deps: Arc<ServerDeps>, job_id: Uuid) {
    tokio::spawn(async move {
        let result = run_fallback(deps.clone(), job_id).await;
        deps.inflight.release(job_id);

        match result {
            Ok(summary) => {
                tracing::info!(
                    job_id = %job_id,
                    final_status = %summary.final_status,
                    iterations = summary.iterations,
                    "fallback orchestration finished"
                );
            }
            Err(err) => {
                tracing::error!(job_id = %job_id, error = %err, "fallback orchestration failed");
                let _ = log_job_event(
                    &deps.db_pool,
                    Some(job_id),
                    "fallback_error",
                    EventLevel::Error,
                    "Fallback orchestration aborted",
                    json!({ "error": err.to_string() }),
                )
                .await;
            }
        }
    });
}
