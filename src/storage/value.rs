//! Dynamically typed column values and ordered result rows.

use serde::ser::{Serialize, SerializeMap, Serializer};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Row as _, TypeInfo, ValueRef};
use std::fmt;

use crate::Result;

/// A single column value as returned by the engine
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(f) => Some(*f as i64),
            Self::Text(s) => s.parse().ok(),
            Self::Null => None,
        }
    }

}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => Ok(()),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Real(r) => write!(f, "{}", r),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            Self::Null => serializer.serialize_none(),
            Self::Integer(i) => serializer.serialize_i64(*i),
            Self::Real(f) => serializer.serialize_f64(*f),
            Self::Text(s) => serializer.serialize_str(s),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

/// One result row: column name to value, in engine column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    entries: Vec<(String, Value)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column. A repeated name shadows nothing; `get` returns the first.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.entries.push((column.into(), value.into()));
    }

    pub fn get(&self, column: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(name, value)| (name.as_str(), value))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Materialize a sqlx row, decoding each column by its runtime storage class
    pub(crate) fn from_sqlite(row: &SqliteRow) -> Result<Self> {
        let mut out = Row::new();

        for (index, column) in row.columns().iter().enumerate() {
            let raw = row.try_get_raw(index)?;
            let value = if raw.is_null() {
                Value::Null
            } else {
                let type_name = raw.type_info().name().to_ascii_uppercase();
                match type_name.as_str() {
                    "INTEGER" | "BIGINT" | "INT8" | "BOOLEAN" => {
                        Value::Integer(row.try_get_unchecked::<i64, _>(index)?)
                    }
                    "REAL" | "FLOAT" | "DOUBLE" => {
                        Value::Real(row.try_get_unchecked::<f64, _>(index)?)
                    }
                    "BLOB" => {
                        let bytes = row.try_get_unchecked::<Vec<u8>, _>(index)?;
                        Value::Text(String::from_utf8_lossy(&bytes).into_owned())
                    }
                    _ => Value::Text(row.try_get_unchecked::<String, _>(index)?),
                }
            };
            out.push(column.name(), value);
        }

        Ok(out)
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, value) in &self.entries {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}
