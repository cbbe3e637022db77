//! Application setup and server configuration.

use std::sync::Arc;

use axum::extract::Extension;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::kernel::ServerDeps;
use crate::server::middleware::{request_context, require_api_token};
use crate::server::routes::{cases, health, jobs, models, reviews};

/// Build the application router with all routes and middleware.
pub fn build_app(deps: Arc<ServerDeps>) -> Router {
    let api = Router::new()
        .route(
            "/jobs",
            post(jobs::create_job_handler).get(jobs::list_jobs_handler),
        )
        .route("/jobs/:job_id", get(jobs::get_job_handler))
        .route("/jobs/:job_id/events", get(jobs::job_events_handler))
        .route("/jobs/:job_id/artifacts", get(jobs::job_artifacts_handler))
        .route("/jobs/:job_id/qa-report", get(jobs::qa_report_handler))
        .route(
            "/reviews/:job_id/decision",
            post(reviews::review_decision_handler),
        )
        .route("/models/recommend", post(models::recommend_models_handler))
        .route("/models/install", post(models::install_model_handler))
        .route("/cases/search", post(cases::search_cases_handler))
        .route("/cases/:case_id", get(cases::get_case_handler))
        .layer(middleware::from_fn_with_state(
            deps.clone(),
            require_api_token,
        ));

    Router::new()
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::readiness_handler))
        .nest("/api/v1", api)
        .layer(Extension(deps))
        .layer(middleware::from_fn(request_context))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
