//! Schema model for test-data generation.
//!
//! This module provides:
//! - Data models for tables, columns, keys and relationships
//! - A tokenizer and recursive-descent parser for CREATE TABLE DDL
//! - Dependency ordering of tables along foreign keys
//! - Complexity scoring of a parsed schema

mod ddl;
mod graph;
mod lexer;

pub use ddl::*;
pub use graph::*;

use crate::error::Error;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// SQL dialect governing parsing and literal rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Dialect {
    /// MySQL and MariaDB
    #[default]
    MySql,
    /// PostgreSQL
    Postgres,
    /// SQLite (parsed with the MySQL-family rules)
    Sqlite,
}

impl Dialect {
    /// Whether booleans render as TRUE/FALSE rather than 1/0
    pub fn has_boolean_literals(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }

    /// Quote an identifier so reserved words and mixed case survive
    pub fn quote_identifier(&self, name: &str) -> String {
        match self {
            Dialect::MySql => format!("`{}`", name.replace('`', "``")),
            Dialect::Postgres | Dialect::Sqlite => format!("\"{}\"", name.replace('"', "\"\"")),
        }
    }

    /// Whether unquoted identifiers fold to lower case
    pub fn folds_unquoted_identifiers(&self) -> bool {
        matches!(self, Dialect::Postgres)
    }
}

impl FromStr for Dialect {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mysql" | "mariadb" => Ok(Dialect::MySql),
            "postgres" | "postgresql" => Ok(Dialect::Postgres),
            "sqlite" => Ok(Dialect::Sqlite),
            _ => Err(Error::UnsupportedDialect(s.to_string())),
        }
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dialect::MySql => write!(f, "mysql"),
            Dialect::Postgres => write!(f, "postgres"),
            Dialect::Sqlite => write!(f, "sqlite"),
        }
    }
}

/// Value category of a column, inferred from its declared type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Integer,
    #[default]
    String,
    Datetime,
    Decimal,
    Boolean,
    Binary,
    Json,
    Enum,
}

impl DataType {
    /// Categorize a base type token such as `VARCHAR` or `int4`.
    /// Unknown types fall back to `String`.
    pub fn from_sql_type(base_type: &str) -> Self {
        match base_type.to_lowercase().as_str() {
            "int" | "integer" | "tinyint" | "smallint" | "mediumint" | "bigint" | "int2"
            | "int4" | "int8" | "serial" | "smallserial" | "bigserial" | "serial4"
            | "serial8" => DataType::Integer,
            "varchar" | "char" | "text" | "tinytext" | "mediumtext" | "longtext"
            | "character" | "nvarchar" | "nchar" | "citext" | "uuid" | "clob" => {
                DataType::String
            }
            "date" | "datetime" | "timestamp" | "time" | "year" | "timestamptz" | "timetz"
            | "interval" => DataType::Datetime,
            "decimal" | "numeric" | "float" | "double" | "real" | "float4" | "float8"
            | "money" => DataType::Decimal,
            "boolean" | "bool" | "bit" => DataType::Boolean,
            "blob" | "binary" | "varbinary" | "tinyblob" | "mediumblob" | "longblob"
            | "bytea" => DataType::Binary,
            "json" | "jsonb" => DataType::Json,
            "enum" | "set" => DataType::Enum,
            _ => DataType::String,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataType::Integer => "integer",
            DataType::String => "string",
            DataType::Datetime => "datetime",
            DataType::Decimal => "decimal",
            DataType::Boolean => "boolean",
            DataType::Binary => "binary",
            DataType::Json => "json",
            DataType::Enum => "enum",
        };
        f.write_str(name)
    }
}

/// Column definition within a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Column {
    /// Column name
    pub name: String,
    /// Declared base type, uppercased (`VARCHAR`, `INT`, ...)
    #[serde(rename = "type")]
    pub sql_type: String,
    /// Raw size argument, e.g. `255` or `10,2`
    pub size: Option<String>,
    pub nullable: bool,
    pub auto_increment: bool,
    /// Default value with quotes stripped
    pub default: Option<String>,
    pub unique: bool,
    pub unsigned: bool,
    pub data_type: DataType,
    /// Declared options of ENUM/SET columns
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enum_values: Vec<String>,
}

impl Column {
    /// Create a nullable column of the given declared type
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        let sql_type = sql_type.into().to_uppercase();
        let data_type = DataType::from_sql_type(&sql_type);
        Self {
            name: name.into(),
            sql_type,
            size: None,
            nullable: true,
            auto_increment: false,
            default: None,
            unique: false,
            unsigned: false,
            data_type,
            enum_values: Vec::new(),
        }
    }

    /// Declared length (first size argument), if numeric
    pub fn declared_length(&self) -> Option<usize> {
        self.size
            .as_deref()
            .and_then(|s| s.split(',').next())
            .and_then(|s| s.trim().parse().ok())
    }
}

/// Index definition
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IndexDef {
    /// Index name (empty when the DDL did not name it)
    pub name: String,
    pub columns: Vec<String>,
    pub unique: bool,
}

/// Kind of table-level constraint not covered by keys and indexes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConstraintKind {
    Check,
}

/// Table-level constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
    pub kind: ConstraintKind,
    pub name: Option<String>,
    pub definition: String,
}

/// Foreign key from one column to a column of another (or the same) table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKey {
    /// Constraint name, if declared
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub column: String,
    pub referenced_table: String,
    pub referenced_column: String,
}

/// Complete table definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<Column>,
    /// Primary key column names, in key order
    pub primary_key: Vec<String>,
    pub foreign_keys: Vec<ForeignKey>,
    pub indexes: Vec<IndexDef>,
    pub constraints: Vec<Constraint>,
}

impl Table {
    /// Create an empty table
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            columns: Vec::new(),
            primary_key: Vec::new(),
            foreign_keys: Vec::new(),
            indexes: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Get a column by name (case-insensitive)
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
        self.columns
            .iter_mut()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// The primary key column when the key consists of exactly one column
    pub fn primary_key_column(&self) -> Option<&str> {
        match self.primary_key.as_slice() {
            [single] => Some(single.as_str()),
            _ => None,
        }
    }

    /// Foreign key declared on the given column
    pub fn foreign_key_for(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| fk.column.eq_ignore_ascii_case(column))
    }

    /// Column sets whose values must be unique per row: the primary key,
    /// unique indexes and inline UNIQUE columns
    pub fn unique_keys(&self) -> Vec<Vec<String>> {
        let mut keys: Vec<Vec<String>> = Vec::new();
        let candidates = std::iter::once(self.primary_key.clone())
            .chain(
                self.indexes
                    .iter()
                    .filter(|i| i.unique)
                    .map(|i| i.columns.clone()),
            )
            .chain(
                self.columns
                    .iter()
                    .filter(|c| c.unique)
                    .map(|c| vec![c.name.clone()]),
            );
        for key in candidates {
            let duplicate = keys.iter().any(|k| {
                k.len() == key.len()
                    && k.iter().zip(&key).all(|(a, b)| a.eq_ignore_ascii_case(b))
            });
            if !key.is_empty() && !duplicate {
                keys.push(key);
            }
        }
        keys
    }

    /// Check if this table references itself
    pub fn is_self_referencing(&self) -> bool {
        self.foreign_keys
            .iter()
            .any(|fk| fk.referenced_table.eq_ignore_ascii_case(&self.name))
    }

    fn add_primary_key(&mut self, column: &str) {
        if !self
            .primary_key
            .iter()
            .any(|c| c.eq_ignore_ascii_case(column))
        {
            self.primary_key.push(column.to_string());
        }
        if let Some(col) = self.column_mut(column) {
            col.nullable = false;
        }
    }
}

/// Flattened foreign key edge between two tables
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
}

/// Parsed structural model of a set of tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Schema {
    pub dialect: Dialect,
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

impl Schema {
    /// Build a schema, deriving relationships from the tables' foreign keys
    pub fn new(dialect: Dialect, tables: Vec<Table>) -> Self {
        let relationships = build_relationships(&tables);
        Self {
            dialect,
            tables,
            relationships,
        }
    }

    /// Get a table by name (case-insensitive)
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(name))
    }

    /// Names of tables linked to `name` by a relationship in either direction
    pub fn related_tables(&self, name: &str) -> Vec<String> {
        let mut related: Vec<String> = Vec::new();
        for rel in &self.relationships {
            let other = if rel.from_table.eq_ignore_ascii_case(name) {
                &rel.to_table
            } else if rel.to_table.eq_ignore_ascii_case(name) {
                &rel.from_table
            } else {
                continue;
            };
            if !related.iter().any(|r| r == other) {
                related.push(other.clone());
            }
        }
        related
    }

    /// Total number of columns across all tables
    pub fn column_count(&self) -> usize {
        self.tables.iter().map(|t| t.columns.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}

/// Flatten all foreign keys into relationships
pub fn build_relationships(tables: &[Table]) -> Vec<Relationship> {
    tables
        .iter()
        .flat_map(|table| {
            table.foreign_keys.iter().map(move |fk| Relationship {
                from_table: table.name.clone(),
                from_column: fk.column.clone(),
                to_table: fk.referenced_table.clone(),
                to_column: fk.referenced_column.clone(),
            })
        })
        .collect()
}

/// Complexity class derived from the weighted schema score
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, schemars::JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
    VeryComplex,
}

impl Complexity {
    pub fn from_score(score: f64) -> Self {
        if score < 20.0 {
            Complexity::Simple
        } else if score < 50.0 {
            Complexity::Moderate
        } else if score < 100.0 {
            Complexity::Complex
        } else {
            Complexity::VeryComplex
        }
    }
}

impl fmt::Display for Complexity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Complexity::Simple => "SIMPLE",
            Complexity::Moderate => "MODERATE",
            Complexity::Complex => "COMPLEX",
            Complexity::VeryComplex => "VERY_COMPLEX",
        };
        f.write_str(name)
    }
}

/// Size and complexity summary of a schema
#[derive(Debug, Clone, PartialEq, Serialize, schemars::JsonSchema)]
pub struct ComplexityReport {
    pub table_count: usize,
    pub column_count: usize,
    pub relationship_count: usize,
    pub score: f64,
    pub complexity: Complexity,
}

/// Score a schema: `tables + 2 * relationships + 0.5 * avg columns per table`
pub fn analyze_complexity(schema: &Schema) -> ComplexityReport {
    let table_count = schema.tables.len();
    let column_count = schema.column_count();
    let relationship_count = schema.relationships.len();

    let avg_columns = if table_count == 0 {
        0.0
    } else {
        column_count as f64 / table_count as f64
    };
    let score = table_count as f64 + relationship_count as f64 * 2.0 + avg_columns * 0.5;

    ComplexityReport {
        table_count,
        column_count,
        relationship_count,
        score,
        complexity: Complexity::from_score(score),
    }
}
