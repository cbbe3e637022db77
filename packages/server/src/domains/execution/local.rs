//! Local execution against installed runner models.

use async_trait::async_trait;

use crate::config::Config;
use crate::domains::execution::executor::{
    build_execution_log, stub_output_uri, EditExecutor, ExecutionRequest, ExecutionResult,
    ExecutorError,
};
use crate::domains::execution::runners::ModelStore;
use crate::domains::planning::Capability;

/// Runner models the remove_object tool chain depends on.
const REMOVE_OBJECT_MODELS: &[&str] = &["sam2", "propainter"];

pub struct LocalExecutor {
    store: ModelStore,
    provider: String,
}

impl LocalExecutor {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: ModelStore::new(&config.models_dir),
            provider: config.model_api_provider.clone(),
        }
    }

    fn run_remove_object(&self, request: &ExecutionRequest<'_>) -> Result<String, ExecutorError> {
        for model in REMOVE_OBJECT_MODELS {
            if !self.store.is_installed(model) {
                return Err(ExecutorError::ModelNotInstalled {
                    model: model.to_string(),
                });
            }
        }

        tracing::info!(
            job_id = %request.job_id,
            iteration = request.iteration,
            "running remove_object tool chain with local runners"
        );
        Ok(format!(
            "remove_object tool chain executed with local runners: {}",
            request.plan.tool_chain.join(" -> ")
        ))
    }
}

#[async_trait]
impl EditExecutor for LocalExecutor {
    async fn execute(
        &self,
        request: ExecutionRequest<'_>,
    ) -> Result<ExecutionResult, ExecutorError> {
        let notes = match request.plan.capability {
            Capability::RemoveObject => self.run_remove_object(&request)?,
            other => format!("Capability {other} executed via local model runner"),
        };

        let output_uri = stub_output_uri(request.job_id, request.iteration);
        let execution_log =
            build_execution_log(&request, &output_uri, "local", &self.provider, &notes);
        Ok(ExecutionResult {
            output_uri,
            execution_log,
        })
    }

    fn runtime_mode(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domains::planning::generate_plan;
    use uuid::Uuid;

    fn executor_with_models_dir(dir: &std::path::Path) -> LocalExecutor {
        let mut config = Config::for_tests();
        config.models_dir = dir.to_string_lossy().to_string();
        config.model_runtime_mode = "local".to_string();
        LocalExecutor::from_config(&config)
    }

    #[tokio::test]
    async fn remove_object_fails_without_installed_models() {
        let dir = std::env::temp_dir().join(format!("local-exec-{}", Uuid::new_v4()));
        let executor = executor_with_models_dir(&dir);
        let plan = generate_plan("erase the parked car", "balanced_12g_bundle", &[], None, 3);

        let err = executor
            .execute(ExecutionRequest {
                job_id: Uuid::new_v4(),
                iteration: 1,
                input_uri: "file://samples/0101_raw.mp4",
                instruction: "erase the parked car",
                plan: &plan,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ExecutorError::ModelNotInstalled { .. }));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn remove_object_runs_once_models_are_installed() {
        let dir = std::env::temp_dir().join(format!("local-exec-{}", Uuid::new_v4()));
        let store = ModelStore::new(&dir);
        store.install("sam2").unwrap();
        store.install("propainter").unwrap();

        let executor = executor_with_models_dir(&dir);
        let plan = generate_plan("erase the parked car", "balanced_12g_bundle", &[], None, 3);
        let job_id = Uuid::new_v4();

        let result = executor
            .execute(ExecutionRequest {
                job_id,
                iteration: 2,
                input_uri: "file://samples/0101_raw.mp4",
                instruction: "erase the parked car",
                plan: &plan,
            })
            .await
            .unwrap();

        assert_eq!(result.output_uri, format!("minio://output/{job_id}/iter_2/edited.mp4"));
        assert_eq!(result.execution_log["runtime_mode"], "local");
        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn other_capabilities_pass_through_without_models() {
        let dir = std::env::temp_dir().join(format!("local-exec-{}", Uuid::new_v4()));
        let executor = executor_with_models_dir(&dir);
        let plan = generate_plan(
            "change color grading to cinematic look",
            "balanced_12g_bundle",
            &[],
            None,
            3,
        );

        let result = executor
            .execute(ExecutionRequest {
                job_id: Uuid::new_v4(),
                iteration: 1,
                input_uri: "file://samples/0101_raw.mp4",
                instruction: "change color grading to cinematic look",
                plan: &plan,
            })
            .await
            .unwrap();

        assert!(result.execution_log["notes"]
            .as_str()
            .unwrap()
            .contains("color_grade"));
        let _ = std::fs::remove_dir_all(dir);
    }
}
