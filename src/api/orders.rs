//! Orders service handlers.

use axum::{
    body::Bytes,
    extract::{rejection::JsonRejection, Extension, Path, Query},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

use super::responses::{json_body, rows_to_xml, ApiError, ApiResult, Xml};
use super::AppState;
use crate::models::{Order, OrderStatusUpdate, XmlOrder};
use crate::storage::Row;

/// Fetch a JSON object from another service, `{}` on any failure
async fn fetch_snapshot(client: &reqwest::Client, url: &str) -> String {
    let snapshot = match client.get(url).send().await {
        Ok(response) if response.status() == reqwest::StatusCode::OK => {
            response.json::<Map<String, Value>>().await.unwrap_or_default()
        }
        Ok(response) => {
            debug!("Snapshot {} returned {}", url, response.status());
            Map::new()
        }
        Err(e) => {
            debug!("Snapshot {} failed: {}", url, e);
            Map::new()
        }
    };

    Value::Object(snapshot).to_string()
}

/// Create a pending order with user and product snapshots attached
#[instrument(skip_all)]
pub async fn create_order(
    Extension(state): Extension<Arc<AppState>>,
    payload: Result<Json<Order>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let order = json_body(payload)?.into_pending();

    let user_url = format!("{}/users/id/{}", state.upstreams.users_service_url, order.user_id);
    let product_url = format!("{}/products/{}", state.upstreams.products_service_url, order.product_id);
    let (user_snapshot, product_snapshot) = tokio::join!(
        fetch_snapshot(&state.http, &user_url),
        fetch_snapshot(&state.http, &product_url),
    );

    state
        .store
        .execute_query(&order.insert_sql(&user_snapshot, &product_snapshot))
        .await
        .map_err(|e| {
            error!("Failed to create order: {}", e);
            ApiError::internal("Failed to create order")
        })?;

    info!("Order created for user {}", order.user_id);
    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order created successfully", "order": order })),
    ))
}

#[instrument(skip_all)]
pub async fn get_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Row>> {
    let sql = format!("SELECT * FROM orders WHERE id = {}", id);

    state
        .store
        .execute_query(&sql)
        .await
        .ok()
        .and_then(|rows| rows.into_iter().next())
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Order"))
}

#[derive(Deserialize)]
pub struct ListOrdersQuery {
    user_id: Option<String>,
    status: Option<String>,
    sort_by: Option<String>,
}

#[instrument(skip_all)]
pub async fn list_orders(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ListOrdersQuery>,
) -> Json<Vec<Row>> {
    let present = |value: Option<String>| value.filter(|v| !v.is_empty());

    let mut sql = String::from("SELECT * FROM orders WHERE 1=1");
    if let Some(user_id) = present(params.user_id) {
        sql.push_str(&format!(" AND user_id = {}", user_id));
    }
    if let Some(status) = present(params.status) {
        sql.push_str(&format!(" AND status = '{}'", status));
    }
    if let Some(sort_by) = present(params.sort_by) {
        sql.push_str(&format!(" ORDER BY {}", sort_by));
    }

    let rows = state.store.execute_query(&sql).await.unwrap_or_else(|e| {
        warn!("Order listing failed: {}", e);
        Vec::new()
    });

    Json(rows)
}

#[instrument(skip_all)]
pub async fn update_order_status(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<OrderStatusUpdate>, JsonRejection>,
) -> ApiResult<Json<Value>> {
    let update = json_body(payload)?;

    state
        .store
        .execute_query(&update.update_sql(&id))
        .await
        .map_err(|e| {
            error!("Failed to update order {}: {}", id, e);
            ApiError::internal("Failed to update order")
        })?;

    Ok(Json(json!({ "message": "Order status updated" })))
}

/// Import a single `<order>` document
#[instrument(skip_all)]
pub async fn import_orders(
    Extension(state): Extension<Arc<AppState>>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<Value>)> {
    let document = String::from_utf8_lossy(&body);
    let order = XmlOrder::parse(&document)
        .map_err(|e| ApiError::bad_request(format!("Invalid XML: {}", e)))?;

    state
        .store
        .execute_query(&order.insert_sql())
        .await
        .map_err(|e| {
            error!("Failed to import order: {}", e);
            ApiError::internal("Failed to import order")
        })?;

    Ok((
        StatusCode::CREATED,
        Json(json!({ "message": "Order imported successfully" })),
    ))
}

#[derive(Deserialize)]
pub struct ExportOrdersQuery {
    #[serde(default)]
    format: String,
    user_id: Option<String>,
}

/// Dump orders, every column included, as JSON or XML
#[instrument(skip_all)]
pub async fn export_orders(
    Extension(state): Extension<Arc<AppState>>,
    Query(params): Query<ExportOrdersQuery>,
) -> ApiResult<Response> {
    let mut sql = String::from("SELECT * FROM orders");
    if let Some(user_id) = params.user_id.filter(|v| !v.is_empty()) {
        sql.push_str(&format!(" WHERE user_id = {}", user_id));
    }

    let rows = state.store.execute_query(&sql).await.unwrap_or_else(|e| {
        warn!("Order export failed: {}", e);
        Vec::new()
    });

    if params.format == "xml" {
        let document = rows_to_xml("orders", "order", &rows)?;
        return Ok(Xml(document).into_response());
    }

    Ok(Json(rows).into_response())
}

#[instrument(skip_all)]
pub async fn delete_order(
    Extension(state): Extension<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Value>> {
    let sql = format!("DELETE FROM orders WHERE id = {}", id);

    state.store.execute_query(&sql).await.map_err(|e| {
        error!("Failed to delete order {}: {}", id, e);
        ApiError::internal("Failed to delete order")
    })?;

    Ok(Json(json!({ "message": "Order deleted successfully" })))
}
