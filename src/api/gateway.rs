//! Gateway handlers: blind proxying plus the debug and redirect endpoints.

use axum::{
    body::{to_bytes, Body},
    extract::{Extension, Query, Request},
    http::{
        header::{CONTENT_LENGTH, HOST, LOCATION, TRANSFER_ENCODING},
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use tracing::{debug, error, instrument};

use super::responses::{ApiError, ApiResult};
use super::GatewayState;

type ProxyFuture = Pin<Box<dyn Future<Output = Response> + Send>>;

/// Handler forwarding requests matched by `pattern` to `base` + `target`
pub(super) fn forward(
    state: Arc<GatewayState>,
    base: &str,
    pattern: &'static str,
    target: &'static str,
) -> impl FnOnce(Request) -> ProxyFuture + Clone + Send + Sync + 'static {
    let base = base.to_string();
    move |request: Request| -> ProxyFuture {
        Box::pin(async move { proxy(&state, &base, pattern, target, request).await })
    }
}

/// Pair each `:name` segment of `pattern` with the matching segment of `path`
pub fn bind_path_params(pattern: &str, path: &str) -> Vec<(String, String)> {
    pattern
        .split('/')
        .zip(path.split('/'))
        .filter_map(|(expected, actual)| {
            expected
                .strip_prefix(':')
                .map(|name| (name.to_string(), actual.to_string()))
        })
        .collect()
}

/// `base` + `target` with every `:` removed, each bound name replaced once
/// by its value, then the raw query appended
pub fn build_target_url(
    base: &str,
    target: &str,
    params: &[(String, String)],
    query: Option<&str>,
) -> String {
    let mut url = format!("{}{}", base, target.replace(':', ""));
    for (name, value) in params {
        url = url.replacen(name.as_str(), value, 1);
    }

    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(query);
    }

    url
}

async fn proxy(
    state: &GatewayState,
    base: &str,
    pattern: &str,
    target: &str,
    request: Request,
) -> Response {
    let (parts, body) = request.into_parts();

    let params = bind_path_params(pattern, parts.uri.path());
    let url = build_target_url(base, target, &params, parts.uri.query());
    debug!("Proxying {} {} -> {}", parts.method, parts.uri, url);

    let body = to_bytes(body, usize::MAX).await.unwrap_or_default();

    let mut headers = parts.headers;
    for hop in [HOST, CONTENT_LENGTH, TRANSFER_ENCODING] {
        headers.remove(hop);
    }

    let upstream = state
        .http
        .request(parts.method, &url)
        .headers(headers)
        .body(body)
        .send()
        .await;

    let upstream = match upstream {
        Ok(response) => response,
        Err(e) => {
            error!("Proxy request failed: {}", e);
            return ApiError::bad_gateway("Service unavailable").into_response();
        }
    };

    let status = upstream.status();
    let upstream_headers = upstream.headers().clone();
    let bytes = upstream.bytes().await.unwrap_or_default();

    let mut response = Response::new(Body::from(bytes));
    *response.status_mut() = status;
    copy_response_headers(&upstream_headers, response.headers_mut());
    response
}

fn copy_response_headers(from: &HeaderMap, to: &mut HeaderMap) {
    for (name, value) in from {
        if name == CONTENT_LENGTH || name == TRANSFER_ENCODING {
            continue;
        }
        to.append(name.clone(), value.clone());
    }
}

/// Service URLs, secrets and the process environment
#[instrument(skip_all)]
pub async fn debug_info(Extension(state): Extension<Arc<GatewayState>>) -> Json<Value> {
    let settings = &state.settings;
    let environment: Vec<String> = std::env::vars_os()
        .map(|(key, value)| format!("{}={}", key.to_string_lossy(), value.to_string_lossy()))
        .collect();

    Json(json!({
        "services": {
            "users": state.upstreams.users_service_url,
            "products": state.upstreams.products_service_url,
            "orders": state.upstreams.orders_service_url,
        },
        "config": {
            "database_host": settings.database_host,
            "database_user": settings.database_user,
            "database_pass": settings.database_password,
            "api_key": settings.api_key,
            "jwt_secret": settings.jwt_secret,
        },
        "environment": environment,
    }))
}

#[derive(Deserialize)]
pub struct RedirectQuery {
    #[serde(default)]
    url: String,
}

/// 302 to whatever `url` says
#[instrument(skip_all)]
pub async fn open_redirect(Query(params): Query<RedirectQuery>) -> ApiResult<Response> {
    if params.url.is_empty() {
        return Err(ApiError::bad_request("URL parameter required"));
    }

    let location = HeaderValue::from_str(&params.url)
        .map_err(|e| ApiError::bad_request(e.to_string()))?;

    Ok((StatusCode::FOUND, [(LOCATION, location)]).into_response())
}
