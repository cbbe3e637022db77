//! Outbound notifications on terminal transitions and review decisions.

mod dispatcher;

pub use dispatcher::{notify_review_decision, notify_terminal, CallbackDispatcher};
