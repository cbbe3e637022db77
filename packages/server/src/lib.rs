// Video-edit orchestration platform - server core
//
// Natural-language edit instructions become durable Jobs driven through a
// bounded safety -> plan -> execute -> QA pipeline, preferring a Restate
// workflow for durability with an in-process fallback.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::Config;
