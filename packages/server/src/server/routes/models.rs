//! Model catalog endpoints: recommendation and guarded local install.

use std::sync::Arc;

use axum::extract::Extension;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::common::{ApiError, ApiResult};
use crate::domains::catalog::{
    detect_device_profile, recommend_bundles, BundleSpec, DeviceProfile, InstallError,
    ModelManager,
};
use crate::kernel::ServerDeps;

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct ModelRecommendationRequest {
    #[serde(default = "default_true")]
    pub include_download_estimate: bool,
}

#[derive(Debug, Serialize)]
pub struct ModelRecommendationResponse {
    pub device: DeviceProfile,
    pub bundles: Vec<BundleSpec>,
    pub default_bundle: String,
    pub runtime_mode: String,
    pub api_provider: String,
}

pub async fn recommend_models_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Json(_payload): Json<ModelRecommendationRequest>,
) -> ApiResult<Json<ModelRecommendationResponse>> {
    let profile = detect_device_profile();
    let (bundles, default_bundle) =
        recommend_bundles(&profile, &deps.config.model_runtime_mode);

    Ok(Json(ModelRecommendationResponse {
        device: profile,
        bundles,
        default_bundle,
        runtime_mode: deps.config.model_runtime_mode.clone(),
        api_provider: deps.config.model_api_provider.clone(),
    }))
}

#[derive(Debug, Deserialize)]
pub struct ModelInstallRequest {
    pub bundle_name: String,
}

#[derive(Debug, Serialize)]
pub struct ModelInstallResponse {
    pub bundle_name: String,
    pub status: String,
    pub install_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Install is a no-op outside local mode; refusals respond `skipped`, not
/// an HTTP error.
pub async fn install_model_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
    Json(payload): Json<ModelInstallRequest>,
) -> ApiResult<Json<ModelInstallResponse>> {
    let manager = ModelManager::from_config(&deps.config);

    match manager.install_bundle(&payload.bundle_name) {
        Ok(install_path) => Ok(Json(ModelInstallResponse {
            bundle_name: payload.bundle_name,
            status: "installed".to_string(),
            install_path: install_path.display().to_string(),
            message: None,
        })),
        Err(refusal @ (InstallError::ApiRuntimeMode | InstallError::DisabledByConfig)) => {
            Ok(Json(ModelInstallResponse {
                bundle_name: payload.bundle_name,
                status: "skipped".to_string(),
                install_path: String::new(),
                message: Some(refusal.to_string()),
            }))
        }
        Err(InstallError::Io(err)) => Err(ApiError::Internal(err)),
    }
}
