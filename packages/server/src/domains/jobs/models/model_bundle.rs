//! Catalog row for an installable model bundle. Read-only from the
//! orchestrator's perspective.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(FromRow, Debug, Clone, Serialize, Deserialize)]
pub struct ModelBundleRow {
    pub name: String,
    pub min_vram_gb: i32,
    pub estimated_time_minutes: i32,
    pub download_size_gb: f64,
    pub quality_tier: String,
    pub metadata: serde_json::Value,
}
