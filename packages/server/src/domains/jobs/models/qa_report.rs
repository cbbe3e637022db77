//! Persisted QA evaluation for one iteration.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct QaReportRecord {
    pub id: Uuid,
    pub job_id: Uuid,
    pub iteration: i32,
    pub overall_score: f64,
    pub dimension_scores: serde_json::Value,
    pub issues: serde_json::Value,
    pub hard_fail_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub raw_report: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
