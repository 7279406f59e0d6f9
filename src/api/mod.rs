//! HTTP API module using axum.
//!
//! One router per service: users, products and orders wrap a [`Store`],
//! the gateway forwards to the other three.

mod gateway;
mod middleware;
mod orders;
mod products;
mod responses;
mod users;

use axum::{
    extract::DefaultBodyLimit,
    middleware::from_fn,
    routing::{get, post, put},
    Extension, Router,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::config::{Service, Settings, UpstreamSettings};
use crate::storage::Store;
use crate::Result;

pub use gateway::{bind_path_params, build_target_url};
pub use middleware::{api_key_middleware, request_id_middleware, RequestId, API_KEY_HEADER};
pub use responses::{json_body, rows_to_xml, ApiError, ApiResult, Xml};

/// Directory product images are served from
pub const IMAGES_DIR: &str = "/var/www/images";

/// Directory uploaded images are written to
pub const UPLOADS_DIR: &str = "/tmp/uploads";

/// Timeout for the snapshot calls the orders service makes
pub const SNAPSHOT_TIMEOUT: Duration = Duration::from_secs(2);

/// Application state shared across the store-backed services
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub upstreams: UpstreamSettings,
    pub http: reqwest::Client,
    pub images_dir: PathBuf,
    pub uploads_dir: PathBuf,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, upstreams: UpstreamSettings) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(SNAPSHOT_TIMEOUT).build()?;

        Ok(Self {
            store,
            upstreams,
            http,
            images_dir: PathBuf::from(IMAGES_DIR),
            uploads_dir: PathBuf::from(UPLOADS_DIR),
        })
    }

    /// Override where images are read from and uploads are written to
    pub fn with_file_roots(mut self, images_dir: impl Into<PathBuf>, uploads_dir: impl Into<PathBuf>) -> Self {
        self.images_dir = images_dir.into();
        self.uploads_dir = uploads_dir.into();
        self
    }
}

/// Gateway state: no store, an untimed client for proxying
pub struct GatewayState {
    pub settings: Settings,
    pub upstreams: UpstreamSettings,
    pub http: reqwest::Client,
}

impl GatewayState {
    pub fn new(settings: Settings, upstreams: UpstreamSettings) -> Self {
        Self {
            settings,
            upstreams,
            http: reqwest::Client::new(),
        }
    }
}

/// Create the users service router
pub fn users_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/users", post(users::create_user))
        .route("/users/:username", get(users::get_user))
        .route("/users/id/:id", get(users::get_user_by_id))
        .route("/login", post(users::login))
        .route("/search", get(users::search_users))
        .route("/export", get(users::export_users));

    with_service_layers(router, state)
}

/// Create the products service router
pub fn products_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/products", post(products::create_product).get(products::list_products))
        .route(
            "/products/:id",
            get(products::get_product)
                .put(products::update_product)
                .delete(products::delete_product),
        )
        .route("/images/:filename", get(products::get_image))
        // Uploads are unbounded
        .route(
            "/images",
            post(products::upload_image).layer(DefaultBodyLimit::disable()),
        )
        .route("/execute", get(products::execute_command));

    with_service_layers(router, state)
}

/// Create the orders service router
pub fn orders_router(state: Arc<AppState>) -> Router {
    let router = Router::new()
        .route("/orders", post(orders::create_order).get(orders::list_orders))
        .route("/orders/import", post(orders::import_orders))
        .route("/orders/export", get(orders::export_orders))
        .route("/orders/:id", get(orders::get_order).delete(orders::delete_order))
        .route("/orders/:id/status", put(orders::update_order_status));

    with_service_layers(router, state)
}

/// Create the gateway router
pub fn gateway_router(state: Arc<GatewayState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let users = state.upstreams.users_service_url.clone();
    let products = state.upstreams.products_service_url.clone();
    let orders = state.upstreams.orders_service_url.clone();
    let forward = |base: &str, pattern: &'static str, target: &'static str| {
        gateway::forward(Arc::clone(&state), base, pattern, target)
    };

    Router::new()
        // Users service
        .route("/api/users", post(forward(&users, "/api/users", "/users")))
        .route("/api/users/search", get(forward(&users, "/api/users/search", "/search")))
        .route(
            "/api/users/:username",
            get(forward(&users, "/api/users/:username", "/users/:username")),
        )
        .route("/api/login", post(forward(&users, "/api/login", "/login")))

        // Products service
        .route(
            "/api/products",
            get(forward(&products, "/api/products", "/products"))
                .post(forward(&products, "/api/products", "/products")),
        )
        .route(
            "/api/products/:id",
            get(forward(&products, "/api/products/:id", "/products/:id"))
                .put(forward(&products, "/api/products/:id", "/products/:id"))
                .delete(forward(&products, "/api/products/:id", "/products/:id")),
        )

        // Orders service
        .route(
            "/api/orders",
            get(forward(&orders, "/api/orders", "/orders"))
                .post(forward(&orders, "/api/orders", "/orders")),
        )
        .route(
            "/api/orders/:id",
            get(forward(&orders, "/api/orders/:id", "/orders/:id")),
        )
        .route(
            "/api/orders/:id/status",
            put(forward(&orders, "/api/orders/:id/status", "/orders/:id/status")),
        )

        // Gateway's own endpoints
        .route("/api/debug", get(gateway::debug_info))
        .route("/api/redirect", get(gateway::open_redirect))

        .layer(from_fn(api_key_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(Extension(Arc::clone(&state)))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

fn with_service_layers(router: Router, state: Arc<AppState>) -> Router {
    router
        .layer(from_fn(request_id_middleware))
        .layer(Extension(state))
        .layer(TraceLayer::new_for_http())
}

/// Start the HTTP server for `app`
pub async fn serve(host: &str, port: u16, service: Service, app: Router) -> Result<()> {
    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr).await?;

    info!("{} listening on http://{}", service, addr);

    serve_listener(listener, app).await
}

/// Serve `app` on an already bound listener
pub async fn serve_listener(listener: TcpListener, app: Router) -> Result<()> {
    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    use crate::config::DatabaseSettings;
    use crate::storage::SqliteStore;

    /// Fresh store with the embedded schema and no seed data
    pub(crate) async fn store() -> Arc<SqliteStore> {
        let settings = DatabaseSettings::default().with_schema_file("/nonexistent/schema.sql");
        Arc::new(SqliteStore::open(&settings).await.unwrap())
    }

    pub(crate) fn state(store: Arc<SqliteStore>, upstreams: UpstreamSettings) -> Arc<AppState> {
        Arc::new(AppState::new(store, upstreams).unwrap())
    }

    /// Bind `app` on an ephemeral local port and return its base URL
    pub(crate) async fn spawn(app: Router) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(serve_listener(listener, app));
        format!("http://{}", addr)
    }

    pub(crate) async fn send(app: &Router, request: Request<Body>) -> (StatusCode, String) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, String::from_utf8_lossy(&bytes).into_owned())
    }

    pub(crate) async fn send_json(app: &Router, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let (status, body) = send(app, request).await;
        (status, serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    pub(crate) fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    pub(crate) fn with_json(method: &str, uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }
}
