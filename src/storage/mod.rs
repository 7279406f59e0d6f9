//! Storage layer: the embedded relational store adapter.
//!
//! This module provides the `Store` trait the HTTP handlers depend on, along
//! with the in-memory SQLite implementation.

mod schema;
mod sqlite;
mod value;

pub use schema::{is_select, EMBEDDED_SCHEMA};
pub use sqlite::{SqliteStore, PLACEHOLDER_EMAIL, PLACEHOLDER_PASSWORD_HASH};
pub use value::{Row, Value};

use async_trait::async_trait;

use crate::models::User;
use crate::Result;

/// Raw SQL store shared by every handler of a service.
///
/// Statements are executed exactly as given. Callers build them by string
/// interpolation and nothing at this layer escapes or parameterizes input.
#[async_trait]
pub trait Store: Send + Sync {
    /// Execute one statement. Reads return their rows, writes return none.
    async fn execute_query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Insert a user by direct substitution into the statement text
    async fn create_user(&self, username: &str, email: &str, password: &str) -> Result<()>;

    /// Look a user up by direct substitution into the statement text.
    ///
    /// An unknown username yields a fabricated placeholder user, not an error.
    async fn get_user_by_username(&self, username: &str) -> Result<User>;

    /// Release the underlying connection
    async fn close(&self) -> Result<()>;
}
