//! Persistence for the job aggregate and its audit satellites.
//!
//! Status writes are transition-guarded (pass `enforce = false` only for
//! forced terminal writes such as `blocked` or recovery paths). Iteration
//! and QA-report writes are upserts keyed on `(job_id, iteration)` so a
//! retried workflow activity lands on the same row.

use anyhow::{Context, Result};
use serde_json::json;
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::id::new_id;
use crate::domains::jobs::models::{
    CaseRecord, EventLevel, Job, JobEvent, JobIteration, JobStatus, ModelBundleRow,
    QaReportRecord, ReviewAction, ReviewDecision, RiskLevel, SafetyEvent,
};
use crate::domains::knowledge::simple_embedding;
use crate::domains::planning::Capability;
use crate::domains::qa::QaReport;

/// Errors from status writes that the API layer maps to 404/409.
#[derive(Debug, thiserror::Error)]
pub enum StatusError {
    #[error("job {0} not found")]
    NotFound(Uuid),

    #[error("invalid status transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

// ============================================================================
// Jobs
// ============================================================================

/// Create a job, honoring the idempotency key: a repeat with the same key
/// returns the original row unchanged. The boolean is `true` when a new row
/// was written.
pub async fn create_job(
    pool: &PgPool,
    instruction: &str,
    input_uri: &str,
    metadata: serde_json::Value,
    max_iterations: i32,
    idempotency_key: Option<&str>,
) -> Result<(Job, bool)> {
    if let Some(key) = idempotency_key {
        if let Some(existing) = find_job_by_idempotency_key(pool, key).await? {
            return Ok((existing, false));
        }
    }

    let mut tx = pool.begin().await?;

    let inserted: Option<Job> = sqlx::query_as(
        r#"
        INSERT INTO jobs (id, idempotency_key, status, instruction, input_uri, metadata, current_iteration, max_iterations)
        VALUES ($1, $2, 'queued', $3, $4, $5, 0, $6)
        ON CONFLICT (idempotency_key) DO NOTHING
        RETURNING id, idempotency_key, status, instruction, input_uri, output_uri, capability,
                  model_bundle, risk_level, metadata, latest_qa_score, current_iteration,
                  max_iterations, created_at, updated_at
        "#,
    )
    .bind(new_id())
    .bind(idempotency_key)
    .bind(instruction)
    .bind(input_uri)
    .bind(&metadata)
    .bind(max_iterations)
    .fetch_optional(&mut *tx)
    .await?;

    match inserted {
        Some(job) => {
            log_job_event(
                &mut *tx,
                Some(job.id),
                "job_created",
                EventLevel::Info,
                "Job accepted",
                json!({ "instruction": instruction, "input_uri": input_uri }),
            )
            .await?;
            tx.commit().await?;
            Ok((job, true))
        }
        None => {
            // Lost a create race on the idempotency key; surface the winner.
            drop(tx);
            let key = idempotency_key.context("insert returned no row without an idempotency key")?;
            let existing = find_job_by_idempotency_key(pool, key)
                .await?
                .context("job vanished after idempotency conflict")?;
            Ok((existing, false))
        }
    }
}

pub async fn get_job(pool: &PgPool, job_id: Uuid) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, idempotency_key, status, instruction, input_uri, output_uri, capability,
               model_bundle, risk_level, metadata, latest_qa_score, current_iteration,
               max_iterations, created_at, updated_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

async fn find_job_by_idempotency_key(pool: &PgPool, key: &str) -> Result<Option<Job>> {
    let job = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, idempotency_key, status, instruction, input_uri, output_uri, capability,
               model_bundle, risk_level, metadata, latest_qa_score, current_iteration,
               max_iterations, created_at, updated_at
        FROM jobs
        WHERE idempotency_key = $1
        "#,
    )
    .bind(key)
    .fetch_optional(pool)
    .await?;

    Ok(job)
}

pub async fn list_jobs(pool: &PgPool, limit: i64) -> Result<Vec<Job>> {
    let jobs = sqlx::query_as::<_, Job>(
        r#"
        SELECT id, idempotency_key, status, instruction, input_uri, output_uri, capability,
               model_bundle, risk_level, metadata, latest_qa_score, current_iteration,
               max_iterations, created_at, updated_at
        FROM jobs
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(jobs)
}

/// Move a job to `target`, writing a `status_transition` event.
///
/// The row is locked for the duration so concurrent writers serialize.
/// A same-status write is a no-op. With `enforce` the transition table is
/// checked first and violations roll back without touching the row.
pub async fn set_job_status(
    pool: &PgPool,
    job_id: Uuid,
    target: JobStatus,
    enforce: bool,
) -> Result<Job, StatusError> {
    let mut tx = pool.begin().await?;

    let job: Option<Job> = sqlx::query_as(
        r#"
        SELECT id, idempotency_key, status, instruction, input_uri, output_uri, capability,
               model_bundle, risk_level, metadata, latest_qa_score, current_iteration,
               max_iterations, created_at, updated_at
        FROM jobs
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(job_id)
    .fetch_optional(&mut *tx)
    .await?;

    let job = job.ok_or(StatusError::NotFound(job_id))?;

    if job.status == target {
        tx.commit().await?;
        return Ok(job);
    }

    if enforce && !job.status.can_transition_to(target) {
        return Err(StatusError::InvalidTransition {
            from: job.status,
            to: target,
        });
    }

    let updated: Job = sqlx::query_as(
        r#"
        UPDATE jobs
        SET status = $1, updated_at = NOW()
        WHERE id = $2
        RETURNING id, idempotency_key, status, instruction, input_uri, output_uri, capability,
                  model_bundle, risk_level, metadata, latest_qa_score, current_iteration,
                  max_iterations, created_at, updated_at
        "#,
    )
    .bind(target)
    .bind(job_id)
    .fetch_one(&mut *tx)
    .await?;

    log_job_event(
        &mut *tx,
        Some(job_id),
        "status_transition",
        EventLevel::Info,
        &format!("Status changed from {} to {}", job.status, target),
        json!({ "from": job.status.as_str(), "to": target.as_str() }),
    )
    .await?;

    tx.commit().await?;
    Ok(updated)
}

/// Fill in fields decided at submit time (forced capability, default
/// bundle, provisional risk level).
pub async fn enrich_new_job(
    pool: &PgPool,
    job_id: Uuid,
    capability: Option<Capability>,
    model_bundle: Option<&str>,
    risk_level: Option<RiskLevel>,
) -> Result<Job> {
    let job = sqlx::query_as::<_, Job>(
        r#"
        UPDATE jobs
        SET capability = COALESCE($1, capability),
            model_bundle = COALESCE($2, model_bundle),
            risk_level = COALESCE($3, risk_level),
            updated_at = NOW()
        WHERE id = $4
        RETURNING id, idempotency_key, status, instruction, input_uri, output_uri, capability,
                  model_bundle, risk_level, metadata, latest_qa_score, current_iteration,
                  max_iterations, created_at, updated_at
        "#,
    )
    .bind(capability)
    .bind(model_bundle)
    .bind(risk_level)
    .bind(job_id)
    .fetch_one(pool)
    .await?;

    Ok(job)
}

/// Record the capability and bundle the planner settled on.
pub async fn set_job_plan_fields(
    pool: &PgPool,
    job_id: Uuid,
    capability: Capability,
    model_bundle: &str,
) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET capability = $1,
            model_bundle = COALESCE(model_bundle, $2),
            updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(capability)
    .bind(model_bundle)
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Persist the authoritative risk level decided by the safety precheck.
pub async fn set_job_risk_level(pool: &PgPool, job_id: Uuid, risk_level: RiskLevel) -> Result<()> {
    sqlx::query("UPDATE jobs SET risk_level = $1, updated_at = NOW() WHERE id = $2")
        .bind(risk_level)
        .bind(job_id)
        .execute(pool)
        .await?;

    Ok(())
}

/// Clear per-run fields ahead of a rerun decision.
pub async fn reset_job_for_rerun(pool: &PgPool, job_id: Uuid) -> Result<()> {
    sqlx::query(
        r#"
        UPDATE jobs
        SET current_iteration = 0, output_uri = NULL, latest_qa_score = NULL, updated_at = NOW()
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Record the final output URI on the aggregate at finalize time.
pub async fn set_job_output_uri(pool: &PgPool, job_id: Uuid, output_uri: &str) -> Result<()> {
    sqlx::query("UPDATE jobs SET output_uri = $1, updated_at = NOW() WHERE id = $2")
        .bind(output_uri)
        .bind(job_id)
        .execute(pool)
        .await?;

    Ok(())
}

// ============================================================================
// Iterations
// ============================================================================

/// Persist one executed iteration and advance the aggregate's cursor.
pub async fn record_iteration(
    pool: &PgPool,
    job_id: Uuid,
    iteration: i32,
    edit_plan: &serde_json::Value,
    execution_log: &serde_json::Value,
    output_uri: &str,
) -> Result<JobIteration> {
    let mut tx = pool.begin().await?;

    let row: JobIteration = sqlx::query_as(
        r#"
        INSERT INTO job_iterations (job_id, iteration, edit_plan, execution_log, output_uri)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (job_id, iteration) DO UPDATE SET
            edit_plan = EXCLUDED.edit_plan,
            execution_log = EXCLUDED.execution_log,
            output_uri = EXCLUDED.output_uri
        RETURNING id, job_id, iteration, edit_plan, execution_log, output_uri, created_at
        "#,
    )
    .bind(job_id)
    .bind(iteration)
    .bind(edit_plan)
    .bind(execution_log)
    .bind(output_uri)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query(
        r#"
        UPDATE jobs
        SET current_iteration = $1, output_uri = $2, updated_at = NOW()
        WHERE id = $3
        "#,
    )
    .bind(iteration)
    .bind(output_uri)
    .bind(job_id)
    .execute(&mut *tx)
    .await?;

    log_job_event(
        &mut *tx,
        Some(job_id),
        "iteration_completed",
        EventLevel::Info,
        &format!("Iteration {iteration} execution completed"),
        json!({ "output_uri": output_uri }),
    )
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn list_iterations(pool: &PgPool, job_id: Uuid) -> Result<Vec<JobIteration>> {
    let rows = sqlx::query_as::<_, JobIteration>(
        r#"
        SELECT id, job_id, iteration, edit_plan, execution_log, output_uri, created_at
        FROM job_iterations
        WHERE job_id = $1
        ORDER BY iteration ASC
        "#,
    )
    .bind(job_id)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

// ============================================================================
// QA reports
// ============================================================================

/// Persist a QA report for an iteration and update the aggregate's latest
/// score. One report per iteration; retries overwrite in place.
pub async fn create_qa_report(
    pool: &PgPool,
    job_id: Uuid,
    iteration: i32,
    report: &QaReport,
) -> Result<QaReportRecord> {
    let raw_report = serde_json::to_value(report).context("serialize qa report")?;
    let mut tx = pool.begin().await?;

    let row: QaReportRecord = sqlx::query_as(
        r#"
        INSERT INTO qa_reports (id, job_id, iteration, overall_score, dimension_scores, issues,
                                hard_fail_flags, recommendations, raw_report)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        ON CONFLICT (job_id, iteration) DO UPDATE SET
            overall_score = EXCLUDED.overall_score,
            dimension_scores = EXCLUDED.dimension_scores,
            issues = EXCLUDED.issues,
            hard_fail_flags = EXCLUDED.hard_fail_flags,
            recommendations = EXCLUDED.recommendations,
            raw_report = EXCLUDED.raw_report
        RETURNING id, job_id, iteration, overall_score, dimension_scores, issues,
                  hard_fail_flags, recommendations, raw_report, created_at
        "#,
    )
    .bind(new_id())
    .bind(job_id)
    .bind(iteration)
    .bind(report.overall_score)
    .bind(serde_json::to_value(&report.dimension_scores).context("serialize dimension scores")?)
    .bind(serde_json::to_value(&report.issues).context("serialize issues")?)
    .bind(&report.hard_fail_flags)
    .bind(&report.recommendations)
    .bind(&raw_report)
    .fetch_one(&mut *tx)
    .await?;

    sqlx::query("UPDATE jobs SET latest_qa_score = $1, updated_at = NOW() WHERE id = $2")
        .bind(report.overall_score)
        .bind(job_id)
        .execute(&mut *tx)
        .await?;

    log_job_event(
        &mut *tx,
        Some(job_id),
        "qa_completed",
        EventLevel::Info,
        &format!("QA report written for iteration {iteration}"),
        json!({
            "overall_score": report.overall_score,
            "hard_fail_flags": report.hard_fail_flags,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(row)
}

pub async fn latest_qa_report(pool: &PgPool, job_id: Uuid) -> Result<Option<QaReportRecord>> {
    let report = sqlx::query_as::<_, QaReportRecord>(
        r#"
        SELECT id, job_id, iteration, overall_score, dimension_scores, issues,
               hard_fail_flags, recommendations, raw_report, created_at
        FROM qa_reports
        WHERE job_id = $1
        ORDER BY iteration DESC
        LIMIT 1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(report)
}

// ============================================================================
// Events
// ============================================================================

/// Append one audit event. Takes any executor so callers can write inside
/// their own transactions.
pub async fn log_job_event<'e, E>(
    executor: E,
    job_id: Option<Uuid>,
    stage: &str,
    level: EventLevel,
    message: &str,
    payload: serde_json::Value,
) -> Result<JobEvent, sqlx::Error>
where
    E: sqlx::PgExecutor<'e>,
{
    let event = sqlx::query_as::<_, JobEvent>(
        r#"
        INSERT INTO job_events (id, job_id, stage, level, message, payload)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, seq, job_id, stage, level, message, payload, created_at
        "#,
    )
    .bind(new_id())
    .bind(job_id)
    .bind(stage)
    .bind(level)
    .bind(message)
    .bind(&payload)
    .fetch_one(executor)
    .await?;

    Ok(event)
}

pub async fn list_job_events(pool: &PgPool, job_id: Uuid, limit: i64) -> Result<Vec<JobEvent>> {
    let events = sqlx::query_as::<_, JobEvent>(
        r#"
        SELECT id, seq, job_id, stage, level, message, payload, created_at
        FROM job_events
        WHERE job_id = $1
        ORDER BY created_at ASC, seq ASC
        LIMIT $2
        "#,
    )
    .bind(job_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(events)
}

// ============================================================================
// Safety events
// ============================================================================

#[allow(clippy::too_many_arguments)]
pub async fn log_safety_event(
    pool: &PgPool,
    job_id: Option<Uuid>,
    blocked: bool,
    rule_ids: &[String],
    reason: &str,
    payload: serde_json::Value,
    risk_level: Option<RiskLevel>,
    override_applied: bool,
) -> Result<SafetyEvent> {
    let mut tx = pool.begin().await?;

    let event = sqlx::query_as::<_, SafetyEvent>(
        r#"
        INSERT INTO safety_events (id, job_id, blocked, rule_ids, reason, payload)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id, job_id, blocked, rule_ids, reason, payload, created_at
        "#,
    )
    .bind(new_id())
    .bind(job_id)
    .bind(blocked)
    .bind(rule_ids)
    .bind(reason)
    .bind(&payload)
    .fetch_one(&mut *tx)
    .await?;

    log_job_event(
        &mut *tx,
        job_id,
        "safety_precheck",
        if blocked {
            EventLevel::Warning
        } else {
            EventLevel::Info
        },
        if blocked {
            "Safety precheck blocked request"
        } else {
            "Safety precheck passed"
        },
        json!({
            "blocked": blocked,
            "rule_ids": rule_ids,
            "reason": reason,
            "risk_level": risk_level.map(|level| level.as_str()),
            "override_applied": override_applied,
        }),
    )
    .await?;

    tx.commit().await?;
    Ok(event)
}

// ============================================================================
// Review actions
// ============================================================================

pub async fn create_review_action(
    pool: &PgPool,
    job_id: Uuid,
    decision: ReviewDecision,
    reviewer: &str,
    reason: &str,
) -> Result<ReviewAction> {
    let mut tx = pool.begin().await?;

    let action = sqlx::query_as::<_, ReviewAction>(
        r#"
        INSERT INTO review_actions (id, job_id, decision, reviewer, reason)
        VALUES ($1, $2, $3, $4, $5)
        RETURNING id, job_id, decision, reviewer, reason, created_at
        "#,
    )
    .bind(new_id())
    .bind(job_id)
    .bind(decision)
    .bind(reviewer)
    .bind(reason)
    .fetch_one(&mut *tx)
    .await?;

    log_job_event(
        &mut *tx,
        Some(job_id),
        "manual_review_decision",
        EventLevel::Info,
        &format!("Manual review decision: {}", decision.as_str()),
        json!({ "reviewer": reviewer, "reason": reason }),
    )
    .await?;

    tx.commit().await?;
    Ok(action)
}

// ============================================================================
// Cases
// ============================================================================

pub async fn create_case_record(
    pool: &PgPool,
    job_id: Option<Uuid>,
    task_summary: &str,
    tags: &[String],
    failure_reason: Option<&str>,
    fix_strategy: Option<&str>,
    final_metrics: serde_json::Value,
) -> Result<CaseRecord> {
    let embedding = simple_embedding(task_summary);
    let mut tx = pool.begin().await?;

    let case = sqlx::query_as::<_, CaseRecord>(
        r#"
        INSERT INTO cases (id, job_id, task_summary, tags, failure_reason, fix_strategy,
                           final_metrics, embedding)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        RETURNING id, job_id, task_summary, tags, failure_reason, fix_strategy,
                  final_metrics, embedding, created_at
        "#,
    )
    .bind(new_id())
    .bind(job_id)
    .bind(task_summary)
    .bind(tags)
    .bind(failure_reason)
    .bind(fix_strategy)
    .bind(&final_metrics)
    .bind(&embedding)
    .fetch_one(&mut *tx)
    .await?;

    log_job_event(
        &mut *tx,
        job_id,
        "case_archived",
        EventLevel::Info,
        "Case archived into knowledge base",
        json!({ "case_id": case.id, "tags": tags }),
    )
    .await?;

    tx.commit().await?;
    Ok(case)
}

pub async fn get_case(pool: &PgPool, case_id: Uuid) -> Result<Option<CaseRecord>> {
    let case = sqlx::query_as::<_, CaseRecord>(
        r#"
        SELECT id, job_id, task_summary, tags, failure_reason, fix_strategy,
               final_metrics, embedding, created_at
        FROM cases
        WHERE id = $1
        "#,
    )
    .bind(case_id)
    .fetch_optional(pool)
    .await?;

    Ok(case)
}

pub async fn list_recent_cases(pool: &PgPool, limit: i64) -> Result<Vec<CaseRecord>> {
    let cases = sqlx::query_as::<_, CaseRecord>(
        r#"
        SELECT id, job_id, task_summary, tags, failure_reason, fix_strategy,
               final_metrics, embedding, created_at
        FROM cases
        ORDER BY created_at DESC
        LIMIT $1
        "#,
    )
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(cases)
}

// ============================================================================
// Model bundles
// ============================================================================

pub async fn seed_model_bundles(pool: &PgPool, bundles: &[ModelBundleRow]) -> Result<()> {
    for bundle in bundles {
        sqlx::query(
            r#"
            INSERT INTO model_bundles (name, min_vram_gb, estimated_time_minutes, download_size_gb,
                                       quality_tier, metadata)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (name) DO UPDATE SET
                min_vram_gb = EXCLUDED.min_vram_gb,
                estimated_time_minutes = EXCLUDED.estimated_time_minutes,
                download_size_gb = EXCLUDED.download_size_gb,
                quality_tier = EXCLUDED.quality_tier,
                metadata = EXCLUDED.metadata
            "#,
        )
        .bind(&bundle.name)
        .bind(bundle.min_vram_gb)
        .bind(bundle.estimated_time_minutes)
        .bind(bundle.download_size_gb)
        .bind(&bundle.quality_tier)
        .bind(&bundle.metadata)
        .execute(pool)
        .await?;
    }

    Ok(())
}
