//! Installed-model bookkeeping for the local runner pipeline.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::json;

/// Tracks which runner models are installed under the models directory.
/// A model counts as installed when its manifest file exists.
#[derive(Debug, Clone)]
pub struct ModelStore {
    models_dir: PathBuf,
}

impl ModelStore {
    pub fn new(models_dir: impl Into<PathBuf>) -> Self {
        Self {
            models_dir: models_dir.into(),
        }
    }

    pub fn manifest_path(&self, name: &str) -> PathBuf {
        self.models_dir.join(name).join("manifest.json")
    }

    pub fn is_installed(&self, name: &str) -> bool {
        self.manifest_path(name).exists()
    }

    /// Write a placeholder install manifest and return the bundle directory.
    pub fn install(&self, name: &str) -> Result<PathBuf> {
        let target_dir = self.models_dir.join(name);
        std::fs::create_dir_all(&target_dir)
            .with_context(|| format!("create bundle directory {}", target_dir.display()))?;

        let manifest = json!({
            "bundle_name": name,
            "status": "installed",
            "source": "local-placeholder",
        });
        std::fs::write(
            self.manifest_path(name),
            serde_json::to_vec_pretty(&manifest)?,
        )
        .with_context(|| format!("write manifest for bundle {name}"))?;

        Ok(absolute(&target_dir))
    }
}

fn absolute(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (ModelStore, PathBuf) {
        let dir = std::env::temp_dir().join(format!("model-store-{}", uuid::Uuid::new_v4()));
        (ModelStore::new(&dir), dir)
    }

    #[test]
    fn uninstalled_models_are_reported_missing() {
        let (store, dir) = temp_store();
        assert!(!store.is_installed("sam2"));
        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn install_writes_a_manifest() {
        let (store, dir) = temp_store();
        let path = store.install("sam2").unwrap();
        assert!(store.is_installed("sam2"));
        assert!(path.join("manifest.json").exists());

        let manifest: serde_json::Value =
            serde_json::from_slice(&std::fs::read(store.manifest_path("sam2")).unwrap()).unwrap();
        assert_eq!(manifest["bundle_name"], "sam2");
        assert_eq!(manifest["status"], "installed");

        let _ = std::fs::remove_dir_all(dir);
    }
}
