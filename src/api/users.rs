//! Users service handlers.

use axum::{
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::responses::{json_body, ApiError, ApiResult};
use super::AppState;
use crate::models::{LoginRequest, User};
use crate::storage::Row;
use crate::utils::{generate_insecure_token, log_to_file, md5_hex};

/// Register a user, storing the bare MD5 of the password
#[instrument(skip_all)]
pub async fn create_user(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<User>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let user = json_body(payload)?;
    let hashed = md5_hex(&user.password);

    state
        .store
        .create_user(&user.username, &user.email, &hashed)
        .await
        .map_err(|e| {
            error!("Failed to create user {}: {}", user.username, e);
            ApiError::internal("Failed to create user")
        })?;

    info!("User created: {}", user.username);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "User created successfully" })),
    ))
}

#[instrument(skip_all)]
pub async fn get_user(
    Extension(state): Extension<Arc<AppState>>,
    Path(username): Path<String>,
) -> ApiResult<Json<User>> {
    let user = state
        .store
        .get_user_by_username(&username)
        .await
        .map_err(|_| ApiError::not_found("User"))?;

    Ok(Json(user))
}

/// Lookup used by the orders service for snapshots; no password column
#[instrument(skip_all)]
pub async fn get_user_by_id(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let sql = format!("SELECT id, username, email FROM users WHERE id = {}", id);

    state
        .store
        .execute_query(&sql)
        .await
        .ok()
        .and_then(|rows| rows.into_iter().next())
        .map(Json)
        .ok_or_else(|| ApiError::not_found("User"))
}

#[instrument(skip_all)]
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let request = json_body(payload)?;

    let user = state
        .store
        .get_user_by_username(&request.username)
        .await
        .map_err(|_| ApiError::unauthorized("Invalid credentials"))?;

    if md5_hex(&request.password) != user.password {
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let token = generate_insecure_token(&request.username);
    Ok(Json(json!({ "token": token, "user": user })))
}

#[derive(Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[instrument(skip_all)]
pub async fn search_users(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<SearchQuery>,
) -> Json<Vec<Row>> {
    let sql = format!("SELECT * FROM users WHERE username LIKE '%{}%'", params.q);

    let rows = state.store.execute_query(&sql).await.unwrap_or_else(|e| {
        warn!("User search failed: {}", e);
        Vec::new()
    });

    Json(rows)
}

#[derive(Deserialize)]
pub struct ExportQuery {
    #[serde(default)]
    filename: String,
}

/// Log the export request to `filename` through the shell
#[instrument(skip_all)]
pub async fn export_users(Query(params): Query<ExportQuery>) -> Json<Value> {
    let filename = if params.filename.is_empty() {
        "users.txt"
    } else {
        params.filename.as_str()
    };

    if let Err(e) = log_to_file(filename, "User export requested").await {
        warn!("Export log to {} failed: {}", filename, e);
    }

    Json(json!({ "message": "Export completed" }))
}
