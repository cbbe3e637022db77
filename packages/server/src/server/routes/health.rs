//! Liveness and dependency readiness.

use std::sync::Arc;

use axum::extract::Extension;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::kernel::ServerDeps;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub now: DateTime<Utc>,
}

pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        now: Utc::now(),
    })
}

#[derive(Debug, Serialize)]
pub struct DependencyHealth {
    pub name: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub dependencies: Vec<DependencyHealth>,
    pub now: DateTime<Utc>,
}

/// Readiness: database responsiveness plus workflow-engine reachability.
/// Any failing dependency degrades the endpoint to 503.
pub async fn readiness_handler(
    Extension(deps): Extension<Arc<ServerDeps>>,
) -> (StatusCode, Json<ReadyResponse>) {
    let mut dependencies = Vec::new();

    let db_check = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        sqlx::query("SELECT 1").execute(&deps.db_pool),
    )
    .await;
    let (db_ok, db_detail) = match db_check {
        Ok(Ok(_)) => (true, None),
        Ok(Err(err)) => (false, Some(format!("query failed: {err}"))),
        Err(_) => (false, Some("query timeout (>5s)".to_string())),
    };
    dependencies.push(DependencyHealth {
        name: "database".to_string(),
        ok: db_ok,
        detail: db_detail,
    });

    let engine_ok = deps.workflow_client.health().await;
    dependencies.push(DependencyHealth {
        name: "workflow_engine".to_string(),
        ok: engine_ok,
        detail: (!engine_ok).then(|| "workflow engine unreachable".to_string()),
    });

    let overall = dependencies.iter().all(|dep| dep.ok);
    let status_code = if overall {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status_code,
        Json(ReadyResponse {
            status: if overall { "ok" } else { "degraded" }.to_string(),
            dependencies,
            now: Utc::now(),
        }),
    )
}
