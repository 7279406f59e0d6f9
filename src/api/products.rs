//! Products service handlers.

use axum::{
    extract::{multipart::MultipartRejection, rejection::JsonRejection, Extension, Multipart, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{error, info, instrument, warn};

use super::responses::{json_body, ApiError, ApiResult};
use super::AppState;
use crate::models::Product;
use crate::storage::Row;
use crate::utils::{read_file, run_shell, save_upload};

#[instrument(skip_all)]
pub async fn create_product(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Product>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let product = json_body(payload)?;

    state
        .store
        .execute_query(&product.insert_sql())
        .await
        .map_err(|e| {
            error!("Failed to create product {}: {}", product.name, e);
            ApiError::internal("Failed to create product")
        })?;

    info!("Product created: {}", product.name);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Product created successfully", "product": product })),
    ))
}

#[instrument(skip_all)]
pub async fn get_product(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let sql = format!("SELECT * FROM products WHERE id = {}", id);

    state
        .store
        .execute_query(&sql)
        .await
        .ok()
        .and_then(|rows| rows.into_iter().next())
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Product"))
}

#[instrument(skip_all)]
pub async fn update_product(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<Product>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let product = json_body(payload)?;

    state
        .store
        .execute_query(&product.update_sql(&id))
        .await
        .map_err(|e| {
            error!("Failed to update product {}: {}", id, e);
            ApiError::internal("Failed to update product")
        })?;

    Ok(Json(json!({ "message": "Product updated successfully" })))
}

#[instrument(skip_all)]
pub async fn delete_product(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let sql = format!("DELETE FROM products WHERE id = {}", id);

    state.store.execute_query(&sql).await.map_err(|e| {
        error!("Failed to delete product {}: {}", id, e);
        ApiError::internal("Failed to delete product")
    })?;

    Ok(Json(json!({ "message": "Product deleted successfully" })))
}

#[derive(Deserialize)]
pub struct ListProductsQuery {
    category: Option<String>,
    min_price: Option<String>,
    max_price: Option<String>,
}

/// Filters are appended to the statement as given
#[instrument(skip_all)]
pub async fn list_products(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListProductsQuery>,
) -> Json<Vec<Row>> {
    let present = |value: Option<String>| value.filter(|v| !v.is_empty());

    let mut sql = String::from("SELECT * FROM products WHERE 1=1");
    if let Some(category) = present(params.category) {
        sql.push_str(&format!(" AND category = '{}'", category));
    }
    if let Some(min_price) = present(params.min_price) {
        sql.push_str(&format!(" AND price >= {}", min_price));
    }
    if let Some(max_price) = present(params.max_price) {
        sql.push_str(&format!(" AND price <= {}", max_price));
    }

    let rows = state.store.execute_query(&sql).await.unwrap_or_else(|e| {
        warn!("Product listing failed: {}", e);
        Vec::new()
    });

    Json(rows)
}

/// Serve a file from the images directory; the name is joined unchecked
#[instrument(skip_all)]
pub async fn get_image(
    Extension(state): Extension<Arc<AppState>>,
    Path(filename): Path<String>,
) -> ApiResult<String> {
    // An absolute name is joined under the root, `..` segments still climb out
    let path = state.images_dir.join(filename.trim_start_matches('/'));

    read_file(&path)
        .await
        .map_err(|_| ApiError::not_found("Image"))
}

/// Store the `file` part under its client-supplied name
#[instrument(skip_all)]
pub async fn upload_image(
    Extension(state): Extension<Arc<AppState>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<Json<Value>> {
    let no_file = || ApiError::bad_request("No file uploaded");
    let mut multipart = multipart.map_err(|_| no_file())?;

    let (filename, contents) = loop {
        let field = multipart.next_field().await.map_err(|_| no_file())?.ok_or_else(no_file)?;
        if field.name() != Some("file") {
            continue;
        }
        let filename = field.file_name().map(str::to_string).ok_or_else(no_file)?;
        let contents = field.bytes().await.map_err(|_| no_file())?;
        break (filename, contents);
    };

    save_upload(&state.uploads_dir, &filename, &contents)
        .await
        .map_err(|e| {
            error!("Failed to save upload {}: {}", filename, e);
            ApiError::internal("Failed to save file")
        })?;

    Ok(Json(json!({ "message": "File uploaded successfully", "filename": filename })))
}

#[derive(Deserialize)]
pub struct ExecuteQuery {
    #[serde(default)]
    cmd: String,
}

/// Run `cmd` through the shell and return its combined output
#[instrument(skip_all)]
pub async fn execute_command(Query(params): Query<ExecuteQuery>) -> ApiResult<Response> {
    if params.cmd.is_empty() {
        return Err(ApiError::bad_request("No command provided"));
    }

    let result = match run_shell(&params.cmd).await {
        Ok(result) => result,
        Err(e) => {
            let body = json!({ "error": e.to_string(), "output": "" });
            return Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response());
        }
    };

    if result.success {
        return Ok(Json(json!({ "output": result.output })).into_response());
    }

    let reason = match result.code {
        Some(code) => format!("exit status {}", code),
        None => "terminated by signal".to_string(),
    };
    let body = json!({ "error": reason, "output": result.output });
    Ok((StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response())
}
