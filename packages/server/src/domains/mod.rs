// Domain modules. Each domain owns its models and logic; cross-domain use
// goes through the public module surface.

pub mod callbacks;
pub mod catalog;
pub mod execution;
pub mod jobs;
pub mod knowledge;
pub mod orchestration;
pub mod planning;
pub mod qa;
pub mod reviews;
pub mod safety;
