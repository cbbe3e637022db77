//! Manual-review decisions: approve, reject, rerun.

mod decision;

pub use decision::{apply_decision, DecisionError};
