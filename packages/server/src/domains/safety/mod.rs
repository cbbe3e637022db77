//! Pre-execution safety gate: deterministic rule matching over the
//! instruction text, risk classification, and bounded admin overrides.

mod evaluator;
mod rules;

pub use evaluator::{SafetyEvaluator, SafetyOutcome};
pub use rules::{BLOCK_RULES, HIGH_RISK_KEYWORDS};
