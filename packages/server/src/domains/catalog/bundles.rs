//! The bundle catalog and recommendation policy.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::config::Config;
use crate::domains::catalog::device::DeviceProfile;
use crate::domains::execution::ModelStore;
use crate::domains::jobs::ModelBundleRow;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BundleSpec {
    pub name: String,
    pub min_vram_gb: u32,
    pub estimated_time_minutes: u32,
    pub download_size_gb: f64,
    pub quality_tier: String,
    pub enabled_modules: Vec<String>,
    pub recommended: bool,
}

struct CatalogEntry {
    name: &'static str,
    min_vram_gb: u32,
    estimated_time_minutes: u32,
    download_size_gb: f64,
    quality_tier: &'static str,
    enabled_modules: &'static [&'static str],
}

const CATALOG: &[CatalogEntry] = &[
    CatalogEntry {
        name: "quality_24g_bundle",
        min_vram_gb: 24,
        estimated_time_minutes: 10,
        download_size_gb: 18.0,
        quality_tier: "high",
        enabled_modules: &["full_qa", "temporal_constraints", "high_quality_generation"],
    },
    CatalogEntry {
        name: "balanced_12g_bundle",
        min_vram_gb: 12,
        estimated_time_minutes: 14,
        download_size_gb: 9.5,
        quality_tier: "balanced",
        enabled_modules: &["core_qa", "reduced_batch_generation"],
    },
    CatalogEntry {
        name: "lite_cpu_bundle",
        min_vram_gb: 0,
        estimated_time_minutes: 25,
        download_size_gb: 1.2,
        quality_tier: "lite",
        enabled_modules: &["workflow_debug", "basic_tools_only"],
    },
];

/// Local bundles as unrecommended specs (recommendation is device-relative).
pub fn catalog_bundles() -> Vec<BundleSpec> {
    CATALOG
        .iter()
        .map(|entry| BundleSpec {
            name: entry.name.to_string(),
            min_vram_gb: entry.min_vram_gb,
            estimated_time_minutes: entry.estimated_time_minutes,
            download_size_gb: entry.download_size_gb,
            quality_tier: entry.quality_tier.to_string(),
            enabled_modules: entry
                .enabled_modules
                .iter()
                .map(|module| module.to_string())
                .collect(),
            recommended: false,
        })
        .collect()
}

/// Rows seeded into the `model_bundles` table at startup.
pub fn seed_rows() -> Vec<ModelBundleRow> {
    CATALOG
        .iter()
        .map(|entry| ModelBundleRow {
            name: entry.name.to_string(),
            min_vram_gb: entry.min_vram_gb as i32,
            estimated_time_minutes: entry.estimated_time_minutes as i32,
            download_size_gb: entry.download_size_gb,
            quality_tier: entry.quality_tier.to_string(),
            metadata: json!({ "enabled_modules": entry.enabled_modules }),
        })
        .collect()
}

/// Bundle assigned to new jobs that did not choose one.
pub fn default_bundle_name(runtime_mode: &str) -> &'static str {
    if runtime_mode == "local" {
        "balanced_12g_bundle"
    } else {
        "api_remote_bundle"
    }
}

/// Recommend bundles for a device.
///
/// In api mode the answer is always the synthetic remote bundle. In local
/// mode each catalog bundle is marked recommended when the device has the
/// VRAM for it, and the default is the best recommended tier (quality >
/// balanced > lite); a GPU-less host always defaults to the CPU bundle.
pub fn recommend_bundles(profile: &DeviceProfile, runtime_mode: &str) -> (Vec<BundleSpec>, String) {
    if runtime_mode != "local" {
        let remote = BundleSpec {
            name: "api_remote_bundle".to_string(),
            min_vram_gb: 0,
            estimated_time_minutes: 6,
            download_size_gb: 0.0,
            quality_tier: "remote".to_string(),
            enabled_modules: vec![
                "remote_multimodal_llm".to_string(),
                "remote_video_edit_model".to_string(),
            ],
            recommended: true,
        };
        let default = remote.name.clone();
        return (vec![remote], default);
    }

    let specs: Vec<BundleSpec> = catalog_bundles()
        .into_iter()
        .map(|mut spec| {
            spec.recommended = profile.gpu_vram_gb >= spec.min_vram_gb;
            spec
        })
        .collect();

    let mut best_name = "lite_cpu_bundle".to_string();
    for candidate in ["quality_24g_bundle", "balanced_12g_bundle", "lite_cpu_bundle"] {
        if specs
            .iter()
            .any(|spec| spec.name == candidate && spec.recommended)
        {
            best_name = candidate.to_string();
            break;
        }
    }

    if profile.gpu_count == 0 {
        best_name = "lite_cpu_bundle".to_string();
    }

    (specs, best_name)
}

/// Why a local install was refused.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    #[error("Local bundle installation is disabled in API runtime mode.")]
    ApiRuntimeMode,

    #[error("Local bundle installation is disabled by configuration.")]
    DisabledByConfig,

    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// Install policy wrapper around the model store.
pub struct ModelManager {
    store: ModelStore,
    runtime_mode: String,
    allow_local_install: bool,
}

impl ModelManager {
    pub fn from_config(config: &Config) -> Self {
        Self {
            store: ModelStore::new(&config.models_dir),
            runtime_mode: config.model_runtime_mode.clone(),
            allow_local_install: config.allow_local_model_install,
        }
    }

    pub fn install_bundle(&self, bundle_name: &str) -> Result<std::path::PathBuf, InstallError> {
        if self.runtime_mode != "local" {
            return Err(InstallError::ApiRuntimeMode);
        }
        if !self.allow_local_install {
            return Err(InstallError::DisabledByConfig);
        }

        Ok(self.store.install(bundle_name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(gpu_count: u32, vram: u32) -> DeviceProfile {
        DeviceProfile {
            gpu_name: (gpu_count > 0).then(|| "GPU".to_string()),
            gpu_count,
            gpu_vram_gb: vram,
            cuda_available: gpu_count > 0,
            cpu_cores: 16,
            memory_gb: 64,
            disk_free_gb: 200,
        }
    }

    #[test]
    fn api_mode_always_recommends_the_remote_bundle() {
        let (bundles, default) = recommend_bundles(&profile(1, 24), "api");
        assert_eq!(bundles.len(), 1);
        assert_eq!(bundles[0].name, "api_remote_bundle");
        assert!(bundles[0].recommended);
        assert_eq!(default, "api_remote_bundle");
    }

    #[test]
    fn local_mode_prefers_the_quality_bundle_on_big_gpus() {
        let (bundles, default) = recommend_bundles(&profile(1, 24), "local");
        assert!(bundles
            .iter()
            .any(|spec| spec.name == "quality_24g_bundle" && spec.recommended));
        assert_eq!(default, "quality_24g_bundle");
    }

    #[test]
    fn local_mode_falls_back_to_balanced_on_mid_gpus() {
        let (_, default) = recommend_bundles(&profile(1, 12), "local");
        assert_eq!(default, "balanced_12g_bundle");
    }

    #[test]
    fn gpu_less_hosts_default_to_the_cpu_bundle() {
        let (_, default) = recommend_bundles(&profile(0, 0), "local");
        assert_eq!(default, "lite_cpu_bundle");
    }

    #[test]
    fn default_bundle_tracks_runtime_mode() {
        assert_eq!(default_bundle_name("api"), "api_remote_bundle");
        assert_eq!(default_bundle_name("local"), "balanced_12g_bundle");
    }

    #[test]
    fn install_refused_outside_local_mode() {
        let config = Config::for_tests();
        let manager = ModelManager::from_config(&config);
        assert!(matches!(
            manager.install_bundle("balanced_12g_bundle"),
            Err(InstallError::ApiRuntimeMode)
        ));
    }

    #[test]
    fn install_refused_when_disabled_by_config() {
        let mut config = Config::for_tests();
        config.model_runtime_mode = "local".to_string();
        config.allow_local_model_install = false;
        let manager = ModelManager::from_config(&config);
        assert!(matches!(
            manager.install_bundle("balanced_12g_bundle"),
            Err(InstallError::DisabledByConfig)
        ));
    }

    #[test]
    fn seed_rows_carry_enabled_modules_metadata() {
        let rows = seed_rows();
        assert_eq!(rows.len(), 3);
        assert!(rows.iter().all(|row| row.metadata["enabled_modules"].is_array()));
    }
}
