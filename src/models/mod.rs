//! Data models for the services.
//!
//! Each model knows how to render the statements its service runs. Values are
//! substituted straight into the SQL text, so every builder here is an
//! injection sink by construction.

mod order;
mod product;
mod user;

pub use order::{Order, OrderStatusUpdate, XmlOrder};
pub use product::Product;
pub use user::{LoginRequest, User};

use sqlx::error::UnexpectedNullError;

use crate::storage::{Row, Value};
use crate::Result;

/// Look up a column that must be present and non-NULL
fn required<'a>(row: &'a Row, column: &str) -> Result<&'a Value> {
    match row.get(column) {
        None => Err(sqlx::Error::ColumnNotFound(column.to_string()).into()),
        Some(value) if value.is_null() => Err(sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: Box::new(UnexpectedNullError),
        }
        .into()),
        Some(value) => Ok(value),
    }
}

pub(crate) fn text_column(row: &Row, column: &str) -> Result<String> {
    required(row, column).map(Value::to_string)
}

pub(crate) fn int_column(row: &Row, column: &str) -> Result<i64> {
    required(row, column)?.as_i64().ok_or_else(|| {
        sqlx::Error::ColumnDecode {
            index: column.to_string(),
            source: format!("{} is not an integer", column).into(),
        }
        .into()
    })
}
