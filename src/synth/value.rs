//! Runtime value type for generated cells.

use crate::schema::Dialect;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Serialize, Serializer};
use std::fmt;

/// A generated cell value
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Null,
    Int(i64),
    Float(f64),
    Bool(bool),
    String(String),
    Timestamp(NaiveDateTime),
    Date(NaiveDate),
}

impl SqlValue {
    pub fn is_null(&self) -> bool {
        matches!(self, SqlValue::Null)
    }

    /// Format as a SQL literal for INSERT statements
    pub fn to_sql_literal(&self, dialect: Dialect) -> String {
        match self {
            SqlValue::Null => "NULL".to_string(),
            SqlValue::Int(n) => n.to_string(),
            SqlValue::Float(n) => format!("{:.2}", n),
            SqlValue::Bool(b) => match (dialect.has_boolean_literals(), b) {
                (true, true) => "TRUE".to_string(),
                (true, false) => "FALSE".to_string(),
                (false, true) => "1".to_string(),
                (false, false) => "0".to_string(),
            },
            SqlValue::String(s) => format!("'{}'", escape_string(s)),
            SqlValue::Timestamp(ts) => format!("'{}'", ts.format("%Y-%m-%d %H:%M:%S")),
            SqlValue::Date(d) => format!("'{}'", d.format("%Y-%m-%d")),
        }
    }
}

/// Escape a string literal body by doubling single quotes
pub fn escape_string(s: &str) -> String {
    s.replace('\'', "''")
}

impl fmt::Display for SqlValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SqlValue::Null => f.write_str("NULL"),
            SqlValue::Int(n) => write!(f, "{}", n),
            SqlValue::Float(n) => write!(f, "{:.2}", n),
            SqlValue::Bool(b) => write!(f, "{}", b),
            SqlValue::String(s) => f.write_str(s),
            SqlValue::Timestamp(ts) => write!(f, "{}", ts.format("%Y-%m-%d %H:%M:%S")),
            SqlValue::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for SqlValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            SqlValue::Null => serializer.serialize_none(),
            SqlValue::Int(n) => serializer.serialize_i64(*n),
            SqlValue::Float(n) => serializer.serialize_f64(*n),
            SqlValue::Bool(b) => serializer.serialize_bool(*b),
            SqlValue::String(s) => serializer.serialize_str(s),
            other => serializer.collect_str(other),
        }
    }
}

impl From<i64> for SqlValue {
    fn from(n: i64) -> Self {
        SqlValue::Int(n)
    }
}

impl From<&str> for SqlValue {
    fn from(s: &str) -> Self {
        SqlValue::String(s.to_string())
    }
}

impl From<String> for SqlValue {
    fn from(s: String) -> Self {
        SqlValue::String(s)
    }
}

impl From<bool> for SqlValue {
    fn from(b: bool) -> Self {
        SqlValue::Bool(b)
    }
}
