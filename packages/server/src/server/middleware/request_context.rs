//! Request-context middleware: request id propagation and access logging.
//!
//! Honors an inbound `X-Request-Id`, mints one otherwise, echoes it on the
//! response, and scopes it into the task-local the error type reads.

use std::time::Instant;

use axum::extract::Request;
use axum::http::HeaderValue;
use axum::middleware::Next;
use axum::response::Response;
use uuid::Uuid;

use crate::common::error::REQUEST_ID;

pub async fn request_context(request: Request, next: Next) -> Response {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = REQUEST_ID
        .scope(request_id.clone(), next.run(request))
        .await;

    let elapsed_ms = started.elapsed().as_millis() as u64;
    if let Ok(header_value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", header_value);
    }

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms,
        request_id = %request_id,
        "request handled"
    );

    response
}
