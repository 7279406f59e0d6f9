//! Insecure Demo CLI - run the vulnerable services.
//!
//! Usage:
//!   insecure-demo serve users --port 8081
//!   insecure-demo serve gateway --config config.json
//!   insecure-demo demo
//!   insecure-demo query "SELECT * FROM users" --seed sql/seeds/users.sql

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use insecure_monorepo::{
    api::{self, AppState, GatewayState},
    DatabaseSettings, Service, Settings, SqliteStore, Store, UpstreamSettings,
};

/// Insecure Monorepo - deliberately vulnerable services for scanner testing
#[derive(Parser, Debug)]
#[command(name = "insecure-demo")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON settings file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start one of the services
    Serve {
        /// Which service to run
        #[arg(value_enum)]
        service: Service,
        /// Host to bind to
        #[arg(long, default_value = "0.0.0.0")]
        host: String,
        /// Port to listen on (falls back to $PORT, then the service default)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Run users, products and orders in-process and place a sample order
    Demo,

    /// Run one SQL statement against a fresh store
    Query {
        /// Statement to execute
        sql: String,
        /// Seed file applied before the statement
        #[arg(long)]
        seed: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref());

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        settings.log_level.parse().unwrap_or(Level::INFO)
    };
    let subscriber = FmtSubscriber::builder().with_max_level(level).finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;

    match cli.command {
        Commands::Serve { service, host, port } => {
            let port = port.or_else(port_from_env).unwrap_or(service.default_port());
            let upstreams = UpstreamSettings::from_env()?;

            let app = match service {
                Service::Gateway => {
                    api::gateway_router(Arc::new(GatewayState::new(settings, upstreams)))
                }
                Service::Users => api::users_router(open_state(service, upstreams).await?),
                Service::Products => {
                    api::products_router(open_state(service, upstreams).await?)
                }
                Service::Orders => api::orders_router(open_state(service, upstreams).await?),
            };

            info!("Starting {} on {}:{}", service, host, port);
            api::serve(&host, port, service, app).await?;
        }

        Commands::Demo => run_demo().await?,

        Commands::Query { sql, seed } => {
            let store = SqliteStore::open(&DatabaseSettings::from_env()?).await?;
            if let Some(seed) = seed {
                store.seed_from_file(&seed).await?;
            }

            let rows = store.execute_query(&sql).await?;
            println!("{}", serde_json::to_string_pretty(&rows)?);
            store.close().await?;
        }
    }

    Ok(())
}

/// `$PORT` when set to a non-empty value
fn port_from_env() -> Option<u16> {
    std::env::var("PORT")
        .ok()
        .filter(|port| !port.is_empty())
        .and_then(|port| port.parse().ok())
}

async fn open_state(
    service: Service,
    upstreams: UpstreamSettings,
) -> anyhow::Result<Arc<AppState>> {
    let database = DatabaseSettings::for_service(service)?;
    let store = SqliteStore::open(&database)
        .await
        .with_context(|| format!("Failed to open store for {}", service))?;

    Ok(Arc::new(AppState::new(Arc::new(store), upstreams)?))
}

/// Bind `app` on an ephemeral local port and return its base URL
async fn spawn_service(service: Service, app: axum::Router) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    info!("{} listening on http://{}", service, addr);

    tokio::spawn(async move {
        if let Err(e) = api::serve_listener(listener, app).await {
            error!("{} stopped: {}", service, e);
        }
    });

    Ok(format!("http://{}", addr))
}

async fn run_demo() -> anyhow::Result<()> {
    let database = DatabaseSettings::default();
    let mut upstreams = UpstreamSettings::default();

    let users = Arc::new(SqliteStore::open(&database).await?);
    let users_state = AppState::new(users, upstreams.clone())?;
    upstreams.users_service_url =
        spawn_service(Service::Users, api::users_router(Arc::new(users_state))).await?;

    let products = Arc::new(SqliteStore::open(&database).await?);
    let products_state = AppState::new(products, upstreams.clone())?;
    upstreams.products_service_url =
        spawn_service(Service::Products, api::products_router(Arc::new(products_state))).await?;

    let orders = Arc::new(SqliteStore::open(&database).await?);
    let orders_state = AppState::new(orders, upstreams.clone())?;
    upstreams.orders_service_url =
        spawn_service(Service::Orders, api::orders_router(Arc::new(orders_state))).await?;

    let client = reqwest::Client::new();

    client
        .post(format!("{}/users", upstreams.users_service_url))
        .json(&json!({"username": "alice", "email": "alice@example.com", "password": "password123"}))
        .send()
        .await?
        .error_for_status()?;

    client
        .post(format!("{}/products", upstreams.products_service_url))
        .json(&json!({
            "name": "Demo Widget",
            "description": "A widget for the demo",
            "price": 9.99,
            "category": "demo",
        }))
        .send()
        .await?
        .error_for_status()?;

    client
        .post(format!("{}/orders", upstreams.orders_service_url))
        .json(&json!({"user_id": 1, "product_id": 1, "quantity": 2, "total_price": 19.98}))
        .send()
        .await?
        .error_for_status()?;

    let orders: Value = client
        .get(format!("{}/orders", upstreams.orders_service_url))
        .send()
        .await?
        .error_for_status()?
        .json()
        .await?;

    println!("{}", serde_json::to_string_pretty(&orders)?);
    Ok(())
}
