//! Insecure Monorepo Library
//!
//! A deliberately vulnerable set of microservices used as a target for
//! static and dynamic application security testing tools.
//!
//! # Features
//!
//! - In-memory SQLite store with file-based schema bootstrap and seeding
//! - Raw SQL pass-through executor returning dynamically typed rows
//! - Users, products, orders and gateway HTTP services via axum
//! - Textbook vulnerability classes: SQL injection, command injection,
//!   path traversal, weak hashing, open redirect, information disclosure
//!
//! # Example
//!
//! ```rust,no_run
//! use insecure_monorepo::{config::DatabaseSettings, storage::{SqliteStore, Store}};
//!
//! #[tokio::main]
//! async fn main() -> insecure_monorepo::Result<()> {
//!     let store = SqliteStore::open(&DatabaseSettings::from_env()?).await?;
//!
//!     store.create_user("alice", "alice@example.com", "md5:abc").await?;
//!     let rows = store
//!         .execute_query("SELECT * FROM users WHERE username = 'x' OR '1'='1'")
//!         .await?;
//!     println!("{} rows", rows.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod models;
pub mod storage;
pub mod utils;

use thiserror::Error;

/// Result type alias for monorepo operations
pub type Result<T> = std::result::Result<T, MonorepoError>;

/// Errors that can occur across the services
#[derive(Error, Debug)]
pub enum MonorepoError {
    /// SQL execution failed (syntax, constraint, connectivity)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ::config::ConfigError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Outbound HTTP call failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// XML could not be parsed or written
    #[error("XML error: {0}")]
    Xml(String),
}

impl MonorepoError {
    /// Wrap any displayable XML failure
    pub fn xml(error: impl std::fmt::Display) -> Self {
        Self::Xml(error.to_string())
    }

    /// Get HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Xml(_) => 400,
            Self::Http(_) => 502,
            Self::Database(_) | Self::Config(_) | Self::Io(_) | Self::Serialization(_) => 500,
        }
    }
}

// Re-export commonly used types for convenience
pub use config::{DatabaseSettings, Service, Settings, UpstreamSettings};
pub use models::{Order, Product, User};
pub use storage::{Row, SqliteStore, Store, Value};
