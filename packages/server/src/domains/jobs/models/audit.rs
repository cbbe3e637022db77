//! Append-only audit records: job events, safety events, review actions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "event_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventLevel {
    #[default]
    Info,
    Warning,
    Error,
}

impl EventLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventLevel::Info => "info",
            EventLevel::Warning => "warning",
            EventLevel::Error => "error",
        }
    }
}

/// One line of the per-job audit log. Ordered by `(created_at, seq)`.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct JobEvent {
    pub id: Uuid,
    pub seq: i64,
    pub job_id: Option<Uuid>,
    pub stage: String,
    pub level: EventLevel,
    pub message: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Audit of one safety precheck (or applied override).
#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct SafetyEvent {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub blocked: bool,
    pub rule_ids: Vec<String>,
    pub reason: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "review_decision", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    Approve,
    Reject,
    Rerun,
}

impl ReviewDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewDecision::Approve => "approve",
            ReviewDecision::Reject => "reject",
            ReviewDecision::Rerun => "rerun",
        }
    }
}

/// A human decision on a job sitting in review.
#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ReviewAction {
    pub id: Uuid,
    pub job_id: Uuid,
    pub decision: ReviewDecision,
    pub reviewer: String,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}
