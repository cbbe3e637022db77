//! API token middleware
//!
//! Accepts the token via `X-API-Token` or `Authorization: Bearer`. An empty
//! configured token list disables auth entirely.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::common::ApiError;
use crate::kernel::ServerDeps;

pub async fn require_api_token(
    State(deps): State<Arc<ServerDeps>>,
    request: Request,
    next: Next,
) -> Response {
    let tokens = deps.config.api_tokens();
    if tokens.is_empty() {
        return next.run(request).await;
    }

    match extract_token(request.headers()) {
        Some(candidate) if tokens.iter().any(|token| token == &candidate) => {
            next.run(request).await
        }
        _ => ApiError::Unauthorized("invalid api token".to_string()).into_response(),
    }
}

fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get("x-api-token")
        .and_then(|value| value.to_str().ok())
    {
        return Some(token.to_string());
    }

    headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| {
            let mut parts = value.trim().split_whitespace();
            match (parts.next(), parts.next(), parts.next()) {
                (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") => {
                    Some(token.to_string())
                }
                _ => None,
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(
                axum::http::HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        map
    }

    #[test]
    fn reads_the_token_header() {
        let map = headers(&[("x-api-token", "dev-token")]);
        assert_eq!(extract_token(&map).as_deref(), Some("dev-token"));
    }

    #[test]
    fn reads_a_bearer_token() {
        let map = headers(&[("authorization", "Bearer dev-token")]);
        assert_eq!(extract_token(&map).as_deref(), Some("dev-token"));

        let map = headers(&[("authorization", "bearer dev-token")]);
        assert_eq!(extract_token(&map).as_deref(), Some("dev-token"));
    }

    #[test]
    fn token_header_wins_over_authorization() {
        let map = headers(&[
            ("x-api-token", "primary"),
            ("authorization", "Bearer secondary"),
        ]);
        assert_eq!(extract_token(&map).as_deref(), Some("primary"));
    }

    #[test]
    fn malformed_authorization_yields_nothing() {
        assert_eq!(extract_token(&headers(&[("authorization", "Basic abc")])), None);
        assert_eq!(extract_token(&headers(&[("authorization", "Bearer")])), None);
        assert_eq!(extract_token(&HeaderMap::new()), None);
    }
}
