//! Orchestration activities.
//!
//! Each activity is an idempotent unit shared by the durable workflow and
//! the fallback runtime: it re-reads the job, performs its stage, and
//! persists through upserts so an engine-level retry lands on the same rows.

use anyhow::{Context, Result};
use serde_json::json;
use uuid::Uuid;

use crate::domains::callbacks::notify_terminal;
use crate::domains::catalog::default_bundle_name;
use crate::domains::execution::ExecutionRequest;
use crate::domains::jobs::repository::{
    self, log_job_event, set_job_status,
};
use crate::domains::jobs::{EventLevel, Job, JobStatus};
use crate::domains::orchestration::contracts::{ExecutionStage, PlanStage, QaStage, SafetyStage};
use crate::domains::planning::{generate_plan, EditPlan};
use crate::domains::qa::{QaContext, QaEvaluator, QaIssue, REVIEW_REASON_SPOT_CHECK};
use crate::domains::safety::SafetyEvaluator;
use crate::kernel::ServerDeps;

async fn require_job(deps: &ServerDeps, job_id: Uuid) -> Result<Job> {
    repository::get_job(&deps.db_pool, job_id)
        .await?
        .with_context(|| format!("job {job_id} not found"))
}

/// Evaluate the instruction against the safety rules, audit the result, and
/// mark the job blocked when the policy says no.
pub async fn safety_precheck(deps: &ServerDeps, job_id: Uuid) -> Result<SafetyStage> {
    let job = require_job(deps, job_id).await?;

    let override_requested = job.admin_override_requested();
    let override_reason = job.override_reason();

    let evaluator = SafetyEvaluator::from_config(&deps.config);
    let outcome = evaluator.evaluate(
        &job.instruction,
        override_requested,
        override_reason.as_deref(),
    );

    repository::set_job_risk_level(&deps.db_pool, job_id, outcome.risk_level).await?;
    repository::log_safety_event(
        &deps.db_pool,
        Some(job_id),
        !outcome.allowed,
        &outcome.blocked_rules,
        &outcome.reason,
        json!({
            "instruction": job.instruction,
            "override_requested": override_requested,
            "override_reason": override_reason,
        }),
        Some(outcome.risk_level),
        outcome.override_applied,
    )
    .await?;

    if outcome.override_applied {
        log_job_event(
            &deps.db_pool,
            Some(job_id),
            "safety_override_applied",
            EventLevel::Warning,
            "Admin safety override applied",
            json!({
                "blocked_rules": outcome.blocked_rules,
                "override_reason": override_reason,
            }),
        )
        .await?;
    }

    if !outcome.allowed {
        set_job_status(&deps.db_pool, job_id, JobStatus::Blocked, true).await?;
    }

    Ok(SafetyStage {
        allowed: outcome.allowed,
        blocked_rules: outcome.blocked_rules,
        reason: outcome.reason,
    })
}

/// Build the edit plan for one iteration, feeding in prior QA issues and
/// whatever prior cases the knowledge base offers.
pub async fn plan_iteration(
    deps: &ServerDeps,
    job_id: Uuid,
    iteration: u32,
    prior_issues: &[QaIssue],
) -> Result<PlanStage> {
    set_job_status(&deps.db_pool, job_id, JobStatus::Planning, true).await?;
    let job = require_job(deps, job_id).await?;

    // Retrieval is advisory; a degraded knowledge base never blocks planning.
    let retrieved_cases = match deps.case_retriever.search(&job.instruction, 5).await {
        Ok(cases) => cases,
        Err(err) => {
            tracing::warn!(job_id = %job_id, error = %err, "case retrieval failed, planning without context");
            vec![]
        }
    };

    let model_bundle = job
        .model_bundle
        .clone()
        .unwrap_or_else(|| default_bundle_name(&deps.config.model_runtime_mode).to_string());

    let plan = generate_plan(
        &job.instruction,
        &model_bundle,
        prior_issues,
        job.capability,
        deps.config.max_iterations,
    );

    let mut plan_snapshot = serde_json::to_value(&plan).context("serialize edit plan")?;
    plan_snapshot["retrieved_cases"] =
        serde_json::to_value(&retrieved_cases).context("serialize retrieved cases")?;

    repository::set_job_plan_fields(&deps.db_pool, job_id, plan.capability, &model_bundle).await?;

    tracing::debug!(
        job_id = %job_id,
        iteration,
        capability = %plan.capability,
        cases = retrieved_cases.len(),
        "plan generated"
    );

    Ok(PlanStage {
        edit_plan: plan,
        plan_snapshot,
    })
}

/// Run the executor for one iteration and persist the attempt.
pub async fn execute_iteration(
    deps: &ServerDeps,
    job_id: Uuid,
    iteration: u32,
    plan: &EditPlan,
    plan_snapshot: &serde_json::Value,
) -> Result<ExecutionStage> {
    set_job_status(&deps.db_pool, job_id, JobStatus::Editing, true).await?;
    let job = require_job(deps, job_id).await?;

    let run = deps
        .executor
        .execute(ExecutionRequest {
            job_id,
            iteration,
            input_uri: &job.input_uri,
            instruction: &job.instruction,
            plan,
        })
        .await;

    let run = match run {
        Ok(result) => result,
        Err(err) => {
            log_job_event(
                &deps.db_pool,
                Some(job_id),
                "execution_error",
                EventLevel::Error,
                "Edit execution failed",
                json!({ "iteration": iteration, "error": err.to_string() }),
            )
            .await?;
            return Err(err.into());
        }
    };

    repository::record_iteration(
        &deps.db_pool,
        job_id,
        iteration as i32,
        plan_snapshot,
        &run.execution_log,
        &run.output_uri,
    )
    .await?;

    Ok(ExecutionStage {
        output_uri: run.output_uri,
        execution_log: run.execution_log,
    })
}

/// Score the iteration output and decide pass/fail plus review routing.
pub async fn qa_iteration(
    deps: &ServerDeps,
    job_id: Uuid,
    iteration: u32,
    output_uri: &str,
) -> Result<QaStage> {
    set_job_status(&deps.db_pool, job_id, JobStatus::Qa, true).await?;
    let job = require_job(deps, job_id).await?;

    let evaluator = QaEvaluator::from_config(&deps.config);
    let capability = job
        .capability
        .map(|capability| capability.as_str())
        .unwrap_or("unknown");
    let report = evaluator.evaluate(&QaContext {
        instruction: &job.instruction,
        iteration,
        capability,
        output_uri,
    });

    repository::create_qa_report(&deps.db_pool, job_id, iteration as i32, &report).await?;

    let passed = evaluator.should_pass(&report);
    let mut requires_manual_review = false;
    let mut gate_reasons = Vec::new();
    if passed {
        let (route, reasons) =
            evaluator.should_route_manual_review(job_id, &report, job.risk_level);
        requires_manual_review = route;
        gate_reasons = reasons;

        if requires_manual_review {
            log_job_event(
                &deps.db_pool,
                Some(job_id),
                "qa_gate_manual_review",
                EventLevel::Warning,
                "QA passed but task routed to manual review",
                json!({
                    "gate_reasons": gate_reasons,
                    "risk_level": job.risk_level.map(|level| level.as_str()),
                }),
            )
            .await?;
        }
    }

    Ok(QaStage {
        report,
        passed,
        requires_manual_review,
        gate_reasons,
    })
}

/// Close out a passing job: terminal status, case archive, callback.
pub async fn finalize_success(
    deps: &ServerDeps,
    job_id: Uuid,
    iteration: u32,
    qa_report: &serde_json::Value,
    output_uri: &str,
) -> Result<()> {
    let job = set_job_status(&deps.db_pool, job_id, JobStatus::Succeeded, true).await?;
    repository::set_job_output_uri(&deps.db_pool, job_id, output_uri).await?;

    let capability = job
        .capability
        .map(|capability| capability.as_str())
        .unwrap_or("unknown");
    repository::create_case_record(
        &deps.db_pool,
        Some(job_id),
        &job.instruction,
        &[capability.to_string(), "auto_passed".to_string()],
        None,
        Some("n/a"),
        json!({
            "overall_score": qa_report.get("overall_score"),
            "iterations": iteration,
            "threshold": deps.config.qa_threshold,
        }),
    )
    .await?;

    notify_terminal(
        &deps.db_pool,
        &deps.callbacks,
        &job,
        JobStatus::Succeeded,
        Some(qa_report),
        Some(output_uri),
    )
    .await?;

    Ok(())
}

/// Close out a job that needs a human: either a gated pass or exhausted
/// iterations without one.
pub async fn finalize_human_review(
    deps: &ServerDeps,
    job_id: Uuid,
    iteration: u32,
    qa_report: &serde_json::Value,
    reason: &str,
) -> Result<()> {
    let job = set_job_status(&deps.db_pool, job_id, JobStatus::HumanReview, true).await?;

    let capability = job
        .capability
        .map(|capability| capability.as_str())
        .unwrap_or("unknown");
    let mut tags = vec![capability.to_string(), "human_review".to_string()];
    if reason.contains(REVIEW_REASON_SPOT_CHECK) {
        tags.push("random_sampled".to_string());
    }
    if reason.contains("high_risk") {
        tags.push("high_risk".to_string());
    }

    repository::create_case_record(
        &deps.db_pool,
        Some(job_id),
        &job.instruction,
        &tags,
        Some(reason),
        Some("manual_review_required"),
        json!({
            "overall_score": qa_report.get("overall_score"),
            "iterations": iteration,
            "threshold": deps.config.qa_threshold,
        }),
    )
    .await?;

    log_job_event(
        &deps.db_pool,
        Some(job_id),
        "manual_review_routed",
        EventLevel::Warning,
        "Job routed to manual review",
        json!({ "reason": reason }),
    )
    .await?;

    notify_terminal(
        &deps.db_pool,
        &deps.callbacks,
        &job,
        JobStatus::HumanReview,
        Some(qa_report),
        job.output_uri.as_deref(),
    )
    .await?;

    Ok(())
}

/// Close out a safety-blocked job. The status write is forced: blocking is
/// terminal no matter what state the machine was caught in.
pub async fn finalize_blocked(deps: &ServerDeps, job_id: Uuid, reason: &str) -> Result<()> {
    let job = set_job_status(&deps.db_pool, job_id, JobStatus::Blocked, false).await?;

    log_job_event(
        &deps.db_pool,
        Some(job_id),
        "job_blocked",
        EventLevel::Warning,
        "Blocked by safety policy",
        json!({ "reason": reason }),
    )
    .await?;

    notify_terminal(
        &deps.db_pool,
        &deps.callbacks,
        &job,
        JobStatus::Blocked,
        Some(&json!({ "reason": reason })),
        None,
    )
    .await?;

    Ok(())
}
