//! HTTP middleware for request ids and the gateway API key check.

use axum::{
    extract::Request,
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::responses::ApiError;
use crate::config::API_KEY;

/// Header carrying the gateway API key
pub const API_KEY_HEADER: &str = "x-api-key";

/// Header carrying the generated request id
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Reject requests whose `X-API-Key` is present and wrong.
///
/// A missing key is let through.
pub async fn api_key_middleware(request: Request, next: Next) -> Response {
    let presented = request
        .headers()
        .get(API_KEY_HEADER)
        .map(HeaderValue::as_bytes)
        .unwrap_or_default();

    if !presented.is_empty() && presented != API_KEY.as_bytes() {
        warn!("Rejected request with invalid API key: {}", request.uri());
        return ApiError::unauthorized("Invalid API key").into_response();
    }

    next.run(request).await
}

/// Request ID middleware - adds a unique ID to each request
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let request_id = uuid::Uuid::new_v4().to_string();

    request.extensions_mut().insert(RequestId(request_id.clone()));

    let mut response = next.run(request).await;

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    response
}

/// Request ID extension type
#[derive(Clone, Debug)]
pub struct RequestId(pub String);

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use tower::ServiceExt;

    fn protected() -> Router {
        Router::new()
            .route("/ping", get(|| async { "pong" }))
            .layer(middleware::from_fn(api_key_middleware))
            .layer(middleware::from_fn(request_id_middleware))
    }

    async fn status_with_key(key: Option<&str>) -> StatusCode {
        let mut builder = Request::builder().uri("/ping");
        if let Some(key) = key {
            builder = builder.header(API_KEY_HEADER, key);
        }
        let response = protected()
            .oneshot(builder.body(Body::empty()).unwrap())
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn test_missing_api_key_passes() {
        assert_eq!(status_with_key(None).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_valid_api_key_passes() {
        assert_eq!(status_with_key(Some(API_KEY)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_wrong_api_key_rejected() {
        assert_eq!(status_with_key(Some("nope")).await, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_request_id_header_added() {
        let response = protected()
            .oneshot(Request::builder().uri("/ping").body(Body::empty()).unwrap())
            .await
            .unwrap();

        let id = response.headers().get(REQUEST_ID_HEADER).unwrap();
        assert!(uuid::Uuid::parse_str(id.to_str().unwrap()).is_ok());
    }
}
