//! Server dependencies (using traits for testability)
//!
//! The central dependency container used by routes, activities, and both
//! orchestrator runtimes. External services sit behind trait objects so
//! tests can substitute them.

use std::sync::Arc;

use anyhow::Result;
use sqlx::PgPool;

use crate::config::Config;
use crate::domains::callbacks::CallbackDispatcher;
use crate::domains::execution::{EditExecutor, LocalExecutor, RemoteExecutor};
use crate::domains::knowledge::{CaseRetriever, LexicalCaseRetriever};
use crate::domains::orchestration::{InflightTracker, WorkflowClient};

#[derive(Clone)]
pub struct ServerDeps {
    pub db_pool: PgPool,
    pub config: Arc<Config>,
    /// Edit backend selected by `MODEL_RUNTIME_MODE`.
    pub executor: Arc<dyn EditExecutor>,
    /// Advisory retrieval over archived cases.
    pub case_retriever: Arc<dyn CaseRetriever>,
    pub callbacks: CallbackDispatcher,
    pub workflow_client: WorkflowClient,
    /// Jobs currently running under the in-process fallback orchestrator.
    pub inflight: InflightTracker,
}

impl ServerDeps {
    /// Wire up the default production dependencies.
    pub fn from_config(db_pool: PgPool, config: Config) -> Result<Self> {
        let executor: Arc<dyn EditExecutor> = if config.is_local_runtime() {
            Arc::new(LocalExecutor::from_config(&config))
        } else {
            Arc::new(RemoteExecutor::from_config(&config)?)
        };

        let case_retriever: Arc<dyn CaseRetriever> =
            Arc::new(LexicalCaseRetriever::new(db_pool.clone()));
        let callbacks = CallbackDispatcher::from_config(&config)?;
        let workflow_client = WorkflowClient::from_config(&config)?;

        Ok(Self {
            db_pool,
            config: Arc::new(config),
            executor,
            case_retriever,
            callbacks,
            workflow_client,
            inflight: InflightTracker::default(),
        })
    }
}
