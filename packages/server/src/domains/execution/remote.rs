//! Remote execution over an OpenAI-compatible video-edit endpoint.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::json;

use crate::config::Config;
use crate::domains::execution::executor::{
    build_execution_log, stub_output_uri, EditExecutor, ExecutionRequest, ExecutionResult,
    ExecutorError,
};

pub struct RemoteExecutor {
    client: reqwest::Client,
    base_url: Option<String>,
    api_key: Option<String>,
    provider: String,
    max_retries: u32,
    allow_stub_fallback: bool,
}

impl RemoteExecutor {
    pub fn from_config(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs_f64(config.remote_model_timeout_seconds))
            .build()
            .context("build remote model http client")?;

        Ok(Self {
            client,
            base_url: config.model_api_base_url.clone(),
            api_key: config.model_api_key.clone(),
            provider: config.model_api_provider.clone(),
            max_retries: config.remote_model_max_retries,
            allow_stub_fallback: config.allow_api_stub_fallback,
        })
    }

    fn endpoint(base_url: &str) -> String {
        format!("{}/v1/video/edit", base_url.trim_end_matches('/'))
    }

    /// Back-off after the i-th completed attempt, capped at 3 seconds.
    fn backoff_delay(attempt: u32) -> Duration {
        Duration::from_secs_f64((1.2 * attempt as f64).min(3.0))
    }

    /// Run the attempt loop. Returns the provider's output URI or the last
    /// error detail after exhausting retries.
    async fn call_remote(&self, request: &ExecutionRequest<'_>) -> Result<String, String> {
        let base_url = match &self.base_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => return Err("MODEL_API_BASE_URL is not configured".to_string()),
        };

        let payload = json!({
            "job_id": request.job_id,
            "iteration": request.iteration,
            "input_uri": request.input_uri,
            "instruction": request.instruction,
            "capability": request.plan.capability.as_str(),
            "tool_chain": request.plan.tool_chain,
            "constraints": request.plan.constraints,
            "model_bundle": request.plan.model_bundle,
        });

        let attempts = self.max_retries + 1;
        let mut last_error = String::new();

        for attempt in 1..=attempts {
            let mut builder = self.client.post(Self::endpoint(&base_url)).json(&payload);
            if let Some(token) = &self.api_key {
                builder = builder.bearer_auth(token);
            }

            match builder.send().await {
                Ok(response) if response.status().is_success() => {
                    let body: serde_json::Value = response.json().await.unwrap_or(json!({}));
                    let output_uri = body
                        .get("output_uri")
                        .and_then(|value| value.as_str())
                        .map(str::to_string)
                        .unwrap_or_else(|| stub_output_uri(request.job_id, request.iteration));
                    return Ok(output_uri);
                }
                Ok(response) => {
                    let status = response.status();
                    let body = response.text().await.unwrap_or_default();
                    let body: String = body.chars().take(500).collect();
                    last_error = format!("status={status} body={body}");
                }
                Err(err) => {
                    last_error = err.to_string();
                }
            }

            if attempt < attempts {
                tokio::time::sleep(Self::backoff_delay(attempt)).await;
            }
        }

        Err(last_error)
    }
}

#[async_trait]
impl EditExecutor for RemoteExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionResult, ExecutorError> {
        let (output_uri, notes) = match self.call_remote(&request).await {
            Ok(output_uri) => (output_uri, "Executed via remote API provider".to_string()),
            Err(detail) => {
                if !self.allow_stub_fallback {
                    return Err(ExecutorError::RemoteFailed { detail });
                }
                tracing::warn!(
                    job_id = %request.job_id,
                    iteration = request.iteration,
                    error = %detail,
                    "remote inference failed, degrading to stub output"
                );
                (
                    stub_output_uri(request.job_id, request.iteration),
                    format!("Remote API unavailable; used stub fallback ({detail})"),
                )
            }
        };

        let execution_log =
            build_execution_log(&request, &output_uri, "api", &self.provider, &notes);
        Ok(ExecutionResult {
            output_uri,
            execution_log,
        })
    }

    fn runtime_mode(&self) -> &'static str {
        "api"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly_then_caps() {
        assert_eq!(RemoteExecutor::backoff_delay(1), Duration::from_secs_f64(1.2));
        assert_eq!(RemoteExecutor::backoff_delay(2), Duration::from_secs_f64(2.4));
        assert_eq!(RemoteExecutor::backoff_delay(3), Duration::from_secs_f64(3.0));
        assert_eq!(RemoteExecutor::backoff_delay(10), Duration::from_secs_f64(3.0));
    }

    #[test]
    fn endpoint_strips_trailing_slash() {
        assert_eq!(
            RemoteExecutor::endpoint("https://models.example/"),
            "https://models.example/v1/video/edit"
        );
        assert_eq!(
            RemoteExecutor::endpoint("https://models.example"),
            "https://models.example/v1/video/edit"
        );
    }

    #[tokio::test]
    async fn missing_base_url_degrades_to_stub_when_allowed() {
        let mut config = Config::for_tests();
        config.allow_api_stub_fallback = true;
        let executor = RemoteExecutor::from_config(&config).unwrap();

        let plan = crate::domains::planning::generate_plan(
            "Remove the closed book",
            "api_remote_bundle",
            &[],
            None,
            3,
        );
        let job_id = uuid::Uuid::new_v4();
        let result = executor
            .execute(ExecutionRequest {
                job_id,
                iteration: 1,
                input_uri: "file://samples/0101_raw.mp4",
                instruction: "Remove the closed book",
                plan: &plan,
            })
            .await
            .unwrap();

        assert_eq!(result.output_uri, stub_output_uri(job_id, 1));
        assert!(result.execution_log["notes"]
            .as_str()
            .unwrap()
            .contains("stub fallback"));
    }

    #[tokio::test]
    async fn missing_base_url_fails_when_stub_fallback_disabled() {
        let mut config = Config::for_tests();
        config.allow_api_stub_fallback = false;
        let executor = RemoteExecutor::from_config(&config).unwrap();

        let plan = crate::domains::planning::generate_plan(
            "Remove the closed book",
            "api_remote_bundle",
            &[],
            None,
            3,
        );
        let err = executor
            .execute(ExecutionRequest {
                job_id: uuid::Uuid::new_v4(),
                iteration: 1,
                input_uri: "file://samples/0101_raw.mp4",
                instruction: "Remove the closed book",
                plan: &plan,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::RemoteFailed { .. }));
    }
}
