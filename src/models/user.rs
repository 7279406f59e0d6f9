//! User accounts.

use serde::{Deserialize, Serialize};

use super::{int_column, text_column};
use crate::storage::Row;
use crate::Result;

/// User account; the password field holds whatever hash the caller stored
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub password: String,
}

impl User {
    /// Build from a `users` row; NULL or missing columns are decode errors
    pub fn try_from_row(row: &Row) -> Result<Self> {
        Ok(Self {
            id: int_column(row, "id")?,
            username: text_column(row, "username")?,
            email: text_column(row, "email")?,
            password: text_column(row, "password")?,
        })
    }
}

/// Credentials posted to the login endpoint
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}
