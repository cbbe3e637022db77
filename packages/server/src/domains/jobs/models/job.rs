//! Job model: one edit submission and its versioned status.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use typed_builder::TypedBuilder;
use uuid::Uuid;

use crate::common::id::new_id;
use crate::domains::planning::Capability;

// ============================================================================
// Enums
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type, Default)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Queued,
    Planning,
    Editing,
    Qa,
    HumanReview,
    Succeeded,
    Failed,
    Blocked,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Planning => "planning",
            JobStatus::Editing => "editing",
            JobStatus::Qa => "qa",
            JobStatus::HumanReview => "human_review",
            JobStatus::Succeeded => "succeeded",
            JobStatus::Failed => "failed",
            JobStatus::Blocked => "blocked",
        }
    }

    /// Whether `next` is a legal transition from this status.
    ///
    /// `failed -> queued` and `human_review -> queued` are the rerun paths;
    /// `succeeded` and `blocked` accept nothing.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        use JobStatus::*;
        matches!(
            (self, next),
            (Queued, Planning)
                | (Queued, Blocked)
                | (Queued, Failed)
                | (Planning, Editing)
                | (Planning, Failed)
                | (Editing, Qa)
                | (Editing, Failed)
                | (Qa, Planning)
                | (Qa, Succeeded)
                | (Qa, HumanReview)
                | (Qa, Failed)
                | (HumanReview, Succeeded)
                | (HumanReview, Failed)
                | (HumanReview, Queued)
                | (Failed, Queued)
        )
    }

    /// Statuses that end an orchestration run and trigger callbacks.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Succeeded | JobStatus::Failed | JobStatus::Blocked | JobStatus::HumanReview
        )
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "risk_level", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
        }
    }
}

// ============================================================================
// Job Model
// ============================================================================

#[derive(FromRow, Debug, Clone, Serialize, Deserialize, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct Job {
    #[builder(default = new_id())]
    pub id: Uuid,

    #[builder(default, setter(strip_option))]
    pub idempotency_key: Option<String>,

    #[builder(default)]
    pub status: JobStatus,

    pub instruction: String,
    pub input_uri: String,

    #[builder(default, setter(strip_option))]
    pub output_uri: Option<String>,
    #[builder(default, setter(strip_option))]
    pub capability: Option<Capability>,
    #[builder(default, setter(strip_option))]
    pub model_bundle: Option<String>,
    #[builder(default, setter(strip_option))]
    pub risk_level: Option<RiskLevel>,

    /// Free-form request metadata. Reserved keys: `callback_url`,
    /// `admin_override`, `override_reason`. Unknown keys are preserved.
    #[builder(default = serde_json::json!({}))]
    pub metadata: serde_json::Value,

    #[builder(default, setter(strip_option))]
    pub latest_qa_score: Option<f64>,

    #[builder(default = 0)]
    pub current_iteration: i32,
    #[builder(default = 3)]
    pub max_iterations: i32,

    #[builder(default = Utc::now())]
    pub created_at: DateTime<Utc>,
    #[builder(default = Utc::now())]
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Callback URL from metadata, if registered and non-empty.
    pub fn callback_url(&self) -> Option<String> {
        self.metadata
            .get("callback_url")
            .and_then(|value| value.as_str())
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
    }

    /// Whether the submission asked for an admin safety override.
    pub fn admin_override_requested(&self) -> bool {
        self.metadata
            .get("admin_override")
            .and_then(|value| value.as_bool())
            .unwrap_or(false)
    }

    /// Reason recorded alongside an admin override request.
    pub fn override_reason(&self) -> Option<String> {
        self.metadata
            .get("override_reason")
            .and_then(|value| value.as_str())
            .map(str::to_string)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_job() -> Job {
        Job::builder()
            .instruction("Remove the closed book".to_string())
            .input_uri("file://samples/0101_raw.mp4".to_string())
            .build()
    }

    #[test]
    fn new_job_starts_queued_with_zero_iterations() {
        let job = sample_job();
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.current_iteration, 0);
        assert_eq!(job.max_iterations, 3);
    }

    #[test]
    fn queued_can_move_to_planning_blocked_or_failed() {
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Planning));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Blocked));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Succeeded));
        assert!(!JobStatus::Queued.can_transition_to(JobStatus::Qa));
    }

    #[test]
    fn qa_fans_out_to_planning_succeeded_review_or_failed() {
        assert!(JobStatus::Qa.can_transition_to(JobStatus::Planning));
        assert!(JobStatus::Qa.can_transition_to(JobStatus::Succeeded));
        assert!(JobStatus::Qa.can_transition_to(JobStatus::HumanReview));
        assert!(JobStatus::Qa.can_transition_to(JobStatus::Failed));
        assert!(!JobStatus::Qa.can_transition_to(JobStatus::Editing));
    }

    #[test]
    fn succeeded_and_blocked_accept_no_transitions() {
        for next in [
            JobStatus::Queued,
            JobStatus::Planning,
            JobStatus::Editing,
            JobStatus::Qa,
            JobStatus::HumanReview,
            JobStatus::Succeeded,
            JobStatus::Failed,
            JobStatus::Blocked,
        ] {
            assert!(!JobStatus::Succeeded.can_transition_to(next));
            assert!(!JobStatus::Blocked.can_transition_to(next));
        }
    }

    #[test]
    fn rerun_paths_lead_back_to_queued() {
        assert!(JobStatus::Failed.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::HumanReview.can_transition_to(JobStatus::Queued));
    }

    #[test]
    fn terminal_statuses_match_callback_set() {
        assert!(JobStatus::Succeeded.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Blocked.is_terminal());
        assert!(JobStatus::HumanReview.is_terminal());
        assert!(!JobStatus::Qa.is_terminal());
    }

    #[test]
    fn callback_url_ignores_blank_values() {
        let mut job = sample_job();
        job.metadata = serde_json::json!({ "callback_url": "  " });
        assert_eq!(job.callback_url(), None);

        job.metadata = serde_json::json!({ "callback_url": "https://hooks.example/edit" });
        assert_eq!(
            job.callback_url(),
            Some("https://hooks.example/edit".to_string())
        );
    }

    #[test]
    fn override_accessors_read_reserved_keys() {
        let mut job = sample_job();
        job.metadata = serde_json::json!({
            "admin_override": true,
            "override_reason": "approved for internal benchmark",
            "team": "trust-and-safety"
        });
        assert!(job.admin_override_requested());
        assert_eq!(
            job.override_reason().as_deref(),
            Some("approved for internal benchmark")
        );
        // Unknown keys stay untouched.
        assert_eq!(job.metadata.get("team").and_then(|v| v.as_str()), Some("trust-and-safety"));
    }
}
