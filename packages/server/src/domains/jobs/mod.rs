//! Job aggregate: the durable record of one edit request, plus its audit
//! satellites (iterations, QA reports, events, safety events, review
//! actions, archived cases).

pub mod models;
pub mod repository;

pub use models::{
    CaseRecord, EventLevel, Job, JobEvent, JobIteration, JobStatus, ModelBundleRow,
    QaReportRecord, ReviewAction, ReviewDecision, RiskLevel, SafetyEvent,
};
pub use repository::StatusError;
