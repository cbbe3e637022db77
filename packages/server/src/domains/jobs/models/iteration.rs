//! One plan/execute/QA attempt inside a job.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Row keyed by auto id; `(job_id, iteration)` is unique so activity
/// retries overwrite instead of duplicating.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct JobIteration {
    pub id: i64,
    pub job_id: Uuid,
    pub iteration: i32,
    pub edit_plan: serde_json::Value,
    pub execution_log: serde_json::Value,
    pub output_uri: Option<String>,
    pub created_at: DateTime<Utc>,
}
