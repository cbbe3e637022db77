//! Quality assessment: dimension scoring, the pass/fail decision, and
//! manual-review routing with stable per-job sampling.

mod evaluator;
mod gate;
mod sampling;

pub use evaluator::{DimensionScores, QaContext, QaEvaluator, QaIssue, QaReport};
pub use gate::{REVIEW_REASON_HIGH_RISK, REVIEW_REASON_SPOT_CHECK};
pub use sampling::stable_sample;
