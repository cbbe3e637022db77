//! Workflow-engine ingress client.
//!
//! Starting a workflow is a fire-and-forget POST against the Restate
//! ingress. The workflow key embeds the job id, which also gives the
//! engine's one-instance-per-job serialization.

use std::time::Duration;

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use crate::config::Config;
use crate::domains::orchestration::contracts::WorkflowInput;

#[derive(Clone)]
pub struct WorkflowClient {
    client: reqwest::Client,
    ingress_url: String,
}

impl WorkflowClient {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("build workflow ingress http client")?;

        Ok(Self {
            client,
            ingress_url: config.restate_ingress_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn workflow_key(job_id: Uuid) -> String {
        format!("video-edit-{job_id}")
    }

    /// Submit the workflow for a job. An already-running instance counts as
    /// started: resubmits are idempotent.
    pub async fn start_video_edit(&self, job_id: Uuid) -> Result<()> {
        let key = Self::workflow_key(job_id);
        let url = format!("{}/VideoEditWorkflow/{key}/run/send", self.ingress_url);

        let response = self
            .client
            .post(&url)
            .json(&WorkflowInput { job_id })
            .send()
            .await
            .context("reach workflow engine ingress")?;

        let status = response.status();
        if status.is_success() || status == reqwest::StatusCode::CONFLICT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        bail!("workflow submission rejected: status={status} body={body}");
    }

    /// Engine reachability probe used by the readiness endpoint.
    pub async fn health(&self) -> bool {
        let url = format!("{}/restate/health", self.ingress_url);
        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn workflow_key_embeds_the_job_id() {
        let job_id = Uuid::new_v4();
        assert_eq!(
            WorkflowClient::workflow_key(job_id),
            format!("video-edit-{job_id}")
        );
    }

    #[tokio::test]
    async fn unreachable_engine_fails_the_start() {
        let mut config = Config::for_tests();
        config.restate_ingress_url = "http://127.0.0.1:9/".to_string();
        let client = WorkflowClient::from_config(&config).unwrap();

        assert!(client.start_video_edit(Uuid::new_v4()).await.is_err());
        assert!(!client.health().await);
    }
}
