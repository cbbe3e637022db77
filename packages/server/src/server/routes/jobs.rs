//! Job endpoints: create, list, fetch, events, artifacts, QA report.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Extension, Path, Query};
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{ApiError, ApiResult};
use crate::config::Config;
use crate::domains::catalog::default_bundle_name;
use crate::domains::jobs::repository;
use crate::domains::jobs::{Job, JobStatus, RiskLevel};
use crate::domains::orchestration::{start_orchestration, StartError};
use crate::domains::planning::Capability;
use crate::domains::safety::SafetyEvaluator;
use crate::kernel::ServerDeps;

// ============================================================================
// Request / response shapes
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct JobCreateRequest {
    pub instruction: String,
    pub input_uri: String,
    #[serde(default)]
    pub callback_url: Option<String>,
    #[serde(default)]
    pub force_capability: Option<Capability>,
    #[serde(default)]
    pub safety_override: bool,
    #[serde(default)]
    pub override_reason: Option<String>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct JobResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub instruction: String,
    pub input_uri: String,
    pub output_uri: Option<String>,
    pub capability: Option<Capability>,
    pub model_bundle: Option<String>,
    pub risk_level: Option<RiskLevel>,
    pub current_iteration: i32,
    pub max_iterations: i32,
    pub latest_qa_score: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Job> for JobResponse {
    fn from(job: Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status,
            instruction: job.instruction,
            input_uri: job.input_uri,
            output_uri: job.output_uri,
            capability: job.capability,
            model_bundle: job.model_bundle,
            risk_level: job.risk_level,
            current_iteration: job.current_iteration,
            max_iterations: job.max_iterations,
            latest_qa_score: job.latest_qa_score,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub items: Vec<JobResponse>,
}

#[derive(Debug, Deserialize)]
pub struct ListParams {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct JobEventResponse {
    pub event_id: Uuid,
    pub job_id: Option<Uuid>,
    pub stage: String,
    pub level: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct ArtifactManifestResponse {
    pub job_id: Uuid,
    pub raw: Vec<String>,
    pub intermediate: Vec<String>,
    pub output: Vec<String>,
    pub audit: Vec<String>,
    pub retention_days: HashMap<String, u32>,
}

#[derive(Debug, Serialize)]
pub struct QaReportResponse {
    pub job_id: Uuid,
    pub iteration: i32,
    pub overall_score: f64,
    pub dimension_scores: serde_json::Value,
    pub issues: serde_json::Value,
    pub hard_fail_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Handlers
// ============================================================================

fn validate_instruction(instruction: &str) -> Result<(), ApiError> {
    let length = instruction.chars().count();
    if !(3..=2000).contains(&length) {
        return Err(ApiError::Validation(
            "instruction must be between 3 and 2000 characters".to_string(),
        ));
    }
    Ok(())
}

/// Validate and apply a requested admin override onto the metadata map.
fn apply_admin_override(
    config: &Config,
    payload: &JobCreateRequest,
    metadata: &mut serde_json::Map<String, serde_json::Value>,
    admin_token: Option<&str>,
) -> Result<(), ApiError> {
    if !payload.safety_override {
        return Ok(());
    }

    let configured = config.safety_admin_token.as_deref();
    match (configured, admin_token) {
        (Some(expected), Some(provided)) if expected == provided => {}
        _ => {
            return Err(ApiError::Forbidden(
                "admin token required for safety override".to_string(),
            ))
        }
    }

    let reason = payload
        .override_reason
        .as_deref()
        .unwrap_or_default()
        .trim()
        .to_string();
    if reason.chars().count() < 6 {
        return Err(ApiError::Validation(
            "override_reason must be provided and at least 6 characters".to_string(),
        ));
    }

    metadata.insert("admin_override".to_string(), serde_json::Value::Bool(true));
    metadata.insert(
        "override_reason".to_string(),
        serde_json::Value::String(reason),
    );
    Ok(())
}

pub async fn create_job_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    headers: HeaderMap,
    Json(payload): Json<JobCreateRequest>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    validate_instruction(&payload.instruction)?;

    let mut metadata = payload.metadata.clone();
    if let Some(callback_url) = payload
        .callback_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
    {
        metadata.insert(
            "callback_url".to_string(),
            serde_json::Value::String(callback_url.to_string()),
        );
    }

    let admin_token = headers
        .get("x-admin-token")
        .and_then(|value| value.to_str().ok());
    apply_admin_override(&deps.config, &payload, &mut metadata, admin_token)?;

    let idempotency_key = headers
        .get("idempotency-key")
        .and_then(|value| value.to_str().ok());

    let (job, created) = repository::create_job(
        &deps.db_pool,
        &payload.instruction,
        &payload.input_uri,
        serde_json::Value::Object(metadata),
        deps.config.max_iterations as i32,
        idempotency_key,
    )
    .await?;

    // Idempotent repeats return the existing job untouched.
    if !created {
        return Ok((StatusCode::CREATED, Json(JobResponse::from(job))));
    }

    let provisional_risk =
        SafetyEvaluator::from_config(&deps.config).classify_risk(&payload.instruction);
    let job = repository::enrich_new_job(
        &deps.db_pool,
        job.id,
        payload.force_capability,
        Some(default_bundle_name(&deps.config.model_runtime_mode)),
        Some(provisional_risk),
    )
    .await?;

    start_orchestration(&deps, job.id).await.map_err(|err| match err {
        StartError::WorkflowUnavailable => {
            ApiError::ServiceUnavailable("unable to start workflow".to_string())
        }
        StartError::Internal(inner) => ApiError::Internal(inner),
    })?;

    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

pub async fn list_jobs_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<JobListResponse>> {
    let limit = params.limit.unwrap_or(50).clamp(1, 100);
    let jobs = repository::list_jobs(&deps.db_pool, limit).await?;
    Ok(Json(JobListResponse {
        items: jobs.into_iter().map(JobResponse::from).collect(),
    }))
}

async fn require_job(deps: &ServerDeps, job_id: Uuid) -> Result<Job, ApiError> {
    repository::get_job(&deps.db_pool, job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("job not found".to_string()))
}

pub async fn get_job_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    let job = require_job(&deps, job_id).await?;
    Ok(Json(JobResponse::from(job)))
}

pub async fn job_events_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Path(job_id): Path<Uuid>,
    Query(params): Query<ListParams>,
) -> ApiResult<Json<Vec<JobEventResponse>>> {
    require_job(&deps, job_id).await?;

    let limit = params.limit.unwrap_or(200).clamp(1, 1000);
    let events = repository::list_job_events(&deps.db_pool, job_id, limit).await?;
    Ok(Json(
        events
            .into_iter()
            .map(|event| JobEventResponse {
                event_id: event.id,
                job_id: event.job_id,
                stage: event.stage,
                level: event.level.as_str().to_string(),
                message: event.message,
                payload: event.payload,
                created_at: event.created_at,
            })
            .collect(),
    ))
}

pub async fn job_artifacts_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<ArtifactManifestResponse>> {
    let job = require_job(&deps, job_id).await?;
    let iterations = repository::list_iterations(&deps.db_pool, job_id).await?;

    let intermediate = iterations
        .iter()
        .map(|row| format!("minio://intermediate/{job_id}/iter_{}/trace.json", row.iteration))
        .collect();

    let mut output: Vec<String> = iterations
        .iter()
        .filter_map(|row| row.output_uri.clone())
        .collect();
    if let Some(final_output) = &job.output_uri {
        if !output.contains(final_output) {
            output.push(final_output.clone());
        }
    }

    let retention_days = HashMap::from([
        ("raw".to_string(), deps.config.raw_retention_days),
        (
            "intermediate".to_string(),
            deps.config.intermediate_retention_days,
        ),
        ("output".to_string(), deps.config.output_retention_days),
        ("audit".to_string(), 3650),
    ]);

    Ok(Json(ArtifactManifestResponse {
        job_id,
        raw: vec![job.input_uri],
        intermediate,
        output,
        audit: vec![format!("minio://audit/{job_id}/events.json")],
        retention_days,
    }))
}

pub async fn qa_report_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Path(job_id): Path<Uuid>,
) -> ApiResult<Json<QaReportResponse>> {
    require_job(&deps, job_id).await?;

    let report = repository::latest_qa_report(&deps.db_pool, job_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("qa report not found".to_string()))?;

    Ok(Json(QaReportResponse {
        job_id,
        iteration: report.iteration,
        overall_score: report.overall_score,
        dimension_scores: report.dimension_scores,
        issues: report.issues,
        hard_fail_flags: report.hard_fail_flags,
        recommendations: report.recommendations,
        created_at: report.created_at,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(instruction: &str, safety_override: bool, reason: Option<&str>) -> JobCreateRequest {
        JobCreateRequest {
            instruction: instruction.to_string(),
            input_uri: "file://samples/0101_raw.mp4".to_string(),
            callback_url: None,
            force_capability: None,
            safety_override,
            override_reason: reason.map(str::to_string),
            metadata: serde_json::Map::new(),
        }
    }

    #[test]
    fn instruction_length_is_bounded() {
        assert!(validate_instruction("ok").is_err());
        assert!(validate_instruction("fix").is_ok());
        assert!(validate_instruction(&"x".repeat(2000)).is_ok());
        assert!(validate_instruction(&"x".repeat(2001)).is_err());
    }

    #[test]
    fn override_without_admin_token_is_forbidden() {
        let mut config = Config::for_tests();
        config.safety_admin_token = Some("admin-secret".to_string());
        let mut metadata = serde_json::Map::new();

        let err = apply_admin_override(
            &config,
            &payload("face swap", true, Some("approved for internal benchmark")),
            &mut metadata,
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));

        let err = apply_admin_override(
            &config,
            &payload("face swap", true, Some("approved for internal benchmark")),
            &mut metadata,
            Some("wrong"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Forbidden(_)));
    }

    #[test]
    fn override_requires_a_meaningful_reason() {
        let mut config = Config::for_tests();
        config.safety_admin_token = Some("admin-secret".to_string());
        let mut metadata = serde_json::Map::new();

        let err = apply_admin_override(
            &config,
            &payload("face swap", true, Some("  ok  ")),
            &mut metadata,
            Some("admin-secret"),
        )
        .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[test]
    fn valid_override_writes_reserved_metadata_keys() {
        let mut config = Config::for_tests();
        config.safety_admin_token = Some("admin-secret".to_string());
        let mut metadata = serde_json::Map::new();

        apply_admin_override(
            &config,
            &payload("face swap", true, Some(" approved for internal benchmark ")),
            &mut metadata,
            Some("admin-secret"),
        )
        .unwrap();

        assert_eq!(metadata["admin_override"], serde_json::Value::Bool(true));
        assert_eq!(
            metadata["override_reason"],
            serde_json::Value::String("approved for internal benchmark".to_string())
        );
    }

    #[test]
    fn no_override_request_leaves_metadata_untouched() {
        let config = Config::for_tests();
        let mut metadata = serde_json::Map::new();
        apply_admin_override(&config, &payload("edit", false, None), &mut metadata, None).unwrap();
        assert!(metadata.is_empty());
    }
}
