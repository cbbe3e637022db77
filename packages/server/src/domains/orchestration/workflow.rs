//! Video edit workflow
//!
//! Durable workflow that drives one job through the state machine:
//! safety precheck, then up to `max_iterations` plan/execute/QA rounds,
//! then a finalize activity. Every stage runs inside a journal block so a
//! crashed worker resumes instead of repeating visible work.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use restate_sdk::prelude::*;

use crate::domains::jobs::JobStatus;
use crate::domains::orchestration::activities;
use crate::domains::orchestration::contracts::{WorkflowInput, WorkflowSummary};
use crate::domains::qa::QaIssue;
use crate::kernel::ServerDeps;

/// Start-to-close limit for safety/plan/QA/finalize stages.
const SHORT_STAGE_TIMEOUT: Duration = Duration::from_secs(5 * 60);
/// Start-to-close limit for edit execution.
const EXECUTE_STAGE_TIMEOUT: Duration = Duration::from_secs(20 * 60);

async fn with_timeout<T>(
    limit: Duration,
    stage: &str,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(anyhow!(
            "{stage} timed out after {}s",
            limit.as_secs()
        )),
    }
}

#[restate_sdk::workflow]
pub trait VideoEditWorkflow {
    async fn run(input: WorkflowInput) -> Result<WorkflowSummary, HandlerError>;
}

pub struct VideoEditWorkflowImpl {
    deps: Arc<ServerDeps>,
}

impl VideoEditWorkflowImpl {
    pub fn with_deps(deps: Arc<ServerDeps>) -> Self {
        Self { deps }
    }
}

impl VideoEditWorkflow for VideoEditWorkflowImpl {
    async fn run(
        &self,
        ctx: WorkflowContext<'_>,
        input: WorkflowInput,
    ) -> Result<WorkflowSummary, HandlerError> {
        let job_id = input.job_id;
        tracing::info!(job_id = %job_id, "starting video edit workflow");

        let safety = ctx
            .run(|| async {
                with_timeout(
                    SHORT_STAGE_TIMEOUT,
                    "safety_precheck",
                    activities::safety_precheck(&self.deps, job_id),
                )
                .await
                .map_err(Into::into)
            })
            .await?;

        if !safety.allowed {
            let reason = safety.reason.clone();
            ctx.run(|| async {
                with_timeout(
                    SHORT_STAGE_TIMEOUT,
                    "finalize_blocked",
                    activities::finalize_blocked(&self.deps, job_id, &reason),
                )
                .await
                .map_err(Into::into)
            })
            .await?;

            return Ok(WorkflowSummary {
                job_id,
                final_status: JobStatus::Blocked.as_str().to_string(),
                final_output_uri: None,
                iterations: 0,
            });
        }

        let max_iterations = self.deps.config.max_iterations;
        let mut prior_issues: Vec<QaIssue> = vec![];
        let mut latest_output_uri: Option<String> = None;
        let mut latest_report = serde_json::json!({});

        for iteration in 1..=max_iterations {
            let issues = prior_issues.clone();
            let plan_stage = ctx
                .run(|| async {
                    with_timeout(
                        SHORT_STAGE_TIMEOUT,
                        "plan_iteration",
                        activities::plan_iteration(&self.deps, job_id, iteration, &issues),
                    )
                    .await
                    .map_err(Into::into)
                })
                .await?;

            let plan = plan_stage.edit_plan.clone();
            let snapshot = plan_stage.plan_snapshot.clone();
            let execution = ctx
                .run(|| async {
                    with_timeout(
                        EXECUTE_STAGE_TIMEOUT,
                        "execute_iteration",
                        activities::execute_iteration(&self.deps, job_id, iteration, &plan, &snapshot),
                    )
                    .await
                    .map_err(Into::into)
                })
                .await?;

            let output_uri = execution.output_uri.clone();
            let qa = ctx
                .run(|| async {
                    with_timeout(
                        SHORT_STAGE_TIMEOUT,
                        "qa_iteration",
                        activities::qa_iteration(&self.deps, job_id, iteration, &output_uri),
                    )
                    .await
                    .map_err(Into::into)
                })
                .await?;

            latest_output_uri = Some(execution.output_uri.clone());
            latest_report = serde_json::to_value(&qa.report)
                .map_err(|err| TerminalError::new(err.to_string()))?;

            if qa.passed {
                if qa.requires_manual_review {
                    let reason = if qa.gate_reasons.is_empty() {
                        "manual_review_required".to_string()
                    } else {
                        qa.gate_reasons.join(",")
                    };
                    let report = latest_report.clone();
                    ctx.run(|| async {
                        with_timeout(
                            SHORT_STAGE_TIMEOUT,
                            "finalize_human_review",
                            activities::finalize_human_review(
                                &self.deps, job_id, iteration, &report, &reason,
                            ),
                        )
                        .await
                        .map_err(Into::into)
                    })
                    .await?;

                    return Ok(WorkflowSummary {
                        job_id,
                        final_status: JobStatus::HumanReview.as_str().to_string(),
                        final_output_uri: Some(execution.output_uri),
                        iterations: iteration,
                    });
                }

                let report = latest_report.clone();
                let output = execution.output_uri.clone();
                ctx.run(|| async {
                    with_timeout(
                        SHORT_STAGE_TIMEOUT,
                        "finalize_success",
                        activities::finalize_success(&self.deps, job_id, iteration, &report, &output),
                    )
                    .await
                    .map_err(Into::into)
                })
                .await?;

                return Ok(WorkflowSummary {
                    job_id,
                    final_status: JobStatus::Succeeded.as_str().to_string(),
                    final_output_uri: Some(execution.output_uri),
                    iterations: iteration,
                });
            }

            prior_issues = qa.report.issues.clone();
        }

        let report = latest_report.clone();
        ctx.run(|| async {
            with_timeout(
                SHORT_STAGE_TIMEOUT,
                "finalize_human_review",
                activities::finalize_human_review(
                    &self.deps,
                    job_id,
                    max_iterations,
                    &report,
                    "qa_not_passed_after_max_iterations",
                ),
            )
            .await
            .map_err(Into::into)
        })
        .await?;

        Ok(WorkflowSummary {
            job_id,
            final_status: JobStatus::HumanReview.as_str().to_string(),
            final_output_uri: latest_output_uri,
            iterations: max_iterations,
        })
    }
}
