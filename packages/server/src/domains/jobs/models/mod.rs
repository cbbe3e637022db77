mod audit;
mod case_record;
mod iteration;
mod job;
mod model_bundle;
mod qa_report;

pub use audit::{EventLevel, JobEvent, ReviewAction, ReviewDecision, SafetyEvent};
pub use case_record::CaseRecord;
pub use iteration::JobIteration;
pub use job::{Job, JobStatus, RiskLevel};
pub use model_bundle::ModelBundleRow;
pub use qa_report::QaReportRecord;
