//! Archived-case endpoints: retrieval and fetch.

use std::sync::Arc;

use axum::extract::{Extension, Path};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{ApiError, ApiResult};
use crate::domains::jobs::repository;
use crate::domains::knowledge::RetrievedCase;
use crate::kernel::ServerDeps;

fn default_top_k() -> usize {
    5
}

#[derive(Debug, Deserialize)]
pub struct CaseSearchRequest {
    pub query: String,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
}

#[derive(Debug, Serialize)]
pub struct CaseSearchResponse {
    pub query: String,
    pub results: Vec<RetrievedCase>,
}

pub async fn search_cases_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Json(payload): Json<CaseSearchRequest>,
) -> ApiResult<Json<CaseSearchResponse>> {
    if payload.query.chars().count() < 2 {
        return Err(ApiError::Validation(
            "query must be at least 2 characters".to_string(),
        ));
    }
    let top_k = payload.top_k.clamp(1, 20);

    let results = deps
        .case_retriever
        .search(&payload.query, top_k)
        .await
        .map_err(ApiError::Internal)?;

    Ok(Json(CaseSearchResponse {
        query: payload.query,
        results,
    }))
}

#[derive(Debug, Serialize)]
pub struct CaseResponse {
    pub case_id: Uuid,
    pub job_id: Option<Uuid>,
    pub task_summary: String,
    pub tags: Vec<String>,
    pub failure_reason: Option<String>,
    pub fix_strategy: Option<String>,
    pub final_metrics: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

pub async fn get_case_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Path(case_id): Path<Uuid>,
) -> ApiResult<Json<CaseResponse>> {
    let case = repository::get_case(&deps.db_pool, case_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("case not found".to_string()))?;

    Ok(Json(CaseResponse {
        case_id: case.id,
        job_id: case.job_id,
        task_summary: case.task_summary,
        tags: case.tags,
        failure_reason: case.failure_reason,
        fix_strategy: case.fix_strategy,
        final_metrics: case.final_metrics,
        created_at: case.created_at,
    }))
}
