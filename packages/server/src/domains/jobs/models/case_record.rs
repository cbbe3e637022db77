//! Archived outcome of a finished job, kept for future retrieval.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub task_summary: String,
    pub tags: Vec<String>,
    pub failure_reason: Option<String>,
    pub fix_strategy: Option<String>,
    pub final_metrics: serde_json::Value,
    /// Fixed-length vector over the task summary; see `knowledge::simple_embedding`.
    pub embedding: Vec<f32>,
    pub created_at: DateTime<Utc>,
}
