//! Schema-driven test data generation.
//!
//! Tables are generated in foreign-key dependency order so every foreign key
//! can be drawn from rows that already exist.

mod insert;

pub use insert::generate_insert_statements;

use crate::error::Result;
use crate::schema::{self, Dialect, Schema, Table};
use crate::synth::{ReferenceSource, SqlValue, Synthesizer};
use ahash::AHashSet;
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

/// Attempts at a row whose unique keys collide before the row is dropped
const MAX_KEY_ATTEMPTS: usize = 50;

/// One generated row: column values in table column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    values: Vec<(String, SqlValue)>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a column value, replacing an existing value for the same column
    pub fn insert(&mut self, column: impl Into<String>, value: SqlValue) {
        let column = column.into();
        match self
            .values
            .iter_mut()
            .find(|(c, _)| c.eq_ignore_ascii_case(&column))
        {
            Some((_, existing)) => *existing = value,
            None => self.values.push((column, value)),
        }
    }

    /// Value of a column (case-insensitive name lookup)
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.values
            .iter()
            .find(|(c, _)| c.eq_ignore_ascii_case(column))
            .map(|(_, v)| v)
    }

    /// Column names in insertion order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.values.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.values.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl FromIterator<(String, SqlValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, SqlValue)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.values.len()))?;
        for (column, value) in &self.values {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Rows generated for one table
#[derive(Debug, Clone, PartialEq)]
pub struct TableData {
    pub name: String,
    pub rows: Vec<Row>,
}

/// Generated rows for every table, in generation order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedDataset {
    tables: Vec<TableData>,
}

impl GeneratedDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rows of a table (case-insensitive name lookup)
    pub fn rows(&self, table: &str) -> Option<&[Row]> {
        self.tables
            .iter()
            .find(|t| t.name.eq_ignore_ascii_case(table))
            .map(|t| t.rows.as_slice())
    }

    /// Append a table's rows, replacing any earlier rows for the same name
    pub fn push(&mut self, name: impl Into<String>, rows: Vec<Row>) {
        let name = name.into();
        match self
            .tables
            .iter_mut()
            .find(|t| t.name.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.rows = rows,
            None => self.tables.push(TableData { name, rows }),
        }
    }

    pub fn tables(&self) -> &[TableData] {
        &self.tables
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.iter().map(|t| t.name.as_str())
    }

    pub fn total_rows(&self) -> usize {
        self.tables.iter().map(|t| t.rows.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Render INSERT statements for every table in generation order
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.tables
            .iter()
            .filter(|t| !t.rows.is_empty())
            .map(|t| generate_insert_statements(&t.name, &t.rows, dialect))
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Summary counts per table
    pub fn stats(&self) -> GenerationStats {
        let tables: Vec<TableStats> = self
            .tables
            .iter()
            .map(|t| TableStats {
                name: t.name.clone(),
                row_count: t.rows.len(),
                column_count: t.rows.first().map(Row::len).unwrap_or(0),
            })
            .collect();
        GenerationStats {
            total_tables: tables.len(),
            total_rows: self.total_rows(),
            tables,
        }
    }
}

impl Serialize for GeneratedDataset {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.tables.len()))?;
        for table in &self.tables {
            map.serialize_entry(&table.name, &table.rows)?;
        }
        map.end()
    }
}

/// Per-table generation counts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct TableStats {
    pub name: String,
    pub row_count: usize,
    pub column_count: usize,
}

/// Dataset summary
#[derive(Debug, Clone, PartialEq, Eq, Serialize, schemars::JsonSchema)]
pub struct GenerationStats {
    pub total_tables: usize,
    pub total_rows: usize,
    pub tables: Vec<TableStats>,
}

/// Output of a generation run
#[derive(Debug, Clone, Serialize)]
pub struct GenerationResult {
    pub schema: Schema,
    pub data: GeneratedDataset,
    pub stats: GenerationStats,
}

/// Values visible to foreign keys while generating one table: every finished
/// table plus the current table's rows so far (for self-references)
struct References<'a> {
    dataset: &'a GeneratedDataset,
    current_table: &'a str,
    current_rows: &'a [Row],
}

impl ReferenceSource for References<'_> {
    fn values<'a>(&'a self, table: &str, column: &str) -> Vec<&'a SqlValue> {
        let rows = if table.eq_ignore_ascii_case(self.current_table) {
            self.current_rows
        } else {
            self.dataset.rows(table).unwrap_or(&[])
        };
        rows.iter().filter_map(|row| row.get(column)).collect()
    }
}

/// Drives the synthesizer over a schema
#[derive(Debug)]
pub struct TestDataGenerator {
    synth: Synthesizer,
}

impl TestDataGenerator {
    pub fn new(synth: Synthesizer) -> Self {
        Self { synth }
    }

    /// Generator with a fixed seed
    pub fn with_seed(seed: u64) -> Self {
        Self::new(Synthesizer::new(seed))
    }

    pub fn seed(&self) -> u64 {
        self.synth.seed()
    }

    /// Parse a schema file, then generate `rows_per_table` rows per table
    pub fn generate_for_schema(
        &mut self,
        schema_path: &Path,
        dialect: &str,
        rows_per_table: usize,
    ) -> Result<GenerationResult> {
        let schema = schema::parse_file(schema_path, dialect)?;
        info!(
            path = %schema_path.display(),
            tables = schema.len(),
            "generating test data"
        );
        Ok(self.generate_for(schema, rows_per_table))
    }

    /// Generate `rows_per_table` rows for every table of an in-memory schema
    pub fn generate_for(&mut self, schema: Schema, rows_per_table: usize) -> GenerationResult {
        self.generate_with_progress(schema, rows_per_table, |_, _| {})
    }

    /// Like [`generate_for`](Self::generate_for), reporting each finished table
    /// with its row count.
    pub fn generate_with_progress<F>(
        &mut self,
        schema: Schema,
        rows_per_table: usize,
        mut on_table: F,
    ) -> GenerationResult
    where
        F: FnMut(&str, usize),
    {
        let mut data = GeneratedDataset::new();
        for table in schema::sort_tables_by_dependencies(&schema.tables) {
            debug!(table = %table.name, rows = rows_per_table, "generating rows");
            let rows = self.generate_table(&table, rows_per_table, &data);
            on_table(&table.name, rows.len());
            data.push(table.name.clone(), rows);
        }
        let stats = data.stats();
        GenerationResult {
            schema,
            data,
            stats,
        }
    }

    /// Generate rows for one table, drawing foreign keys from `existing`.
    ///
    /// A row colliding with an earlier row on the primary key or a unique
    /// index is drawn again; when the key space is exhausted the table ends
    /// up with fewer than `row_count` rows.
    pub fn generate_table(
        &mut self,
        table: &Table,
        row_count: usize,
        existing: &GeneratedDataset,
    ) -> Vec<Row> {
        self.synth.start_table();
        let unique_keys = table.unique_keys();
        let mut seen: Vec<AHashSet<Vec<String>>> = vec![AHashSet::new(); unique_keys.len()];
        let mut rows: Vec<Row> = Vec::with_capacity(row_count);

        for index in 0..row_count {
            let mut accepted = false;
            for _ in 0..MAX_KEY_ATTEMPTS {
                let row = self.generate_row(table, index, existing, &rows);
                let tuples: Vec<Option<Vec<String>>> =
                    unique_keys.iter().map(|key| key_tuple(&row, key)).collect();
                let collides = tuples
                    .iter()
                    .zip(&seen)
                    .any(|(tuple, seen)| tuple.as_ref().is_some_and(|t| seen.contains(t)));
                if collides {
                    continue;
                }
                for (tuple, seen) in tuples.into_iter().zip(seen.iter_mut()) {
                    if let Some(tuple) = tuple {
                        seen.insert(tuple);
                    }
                }
                rows.push(row);
                accepted = true;
                break;
            }
            if !accepted {
                warn!(
                    table = %table.name,
                    row = index,
                    "no unused unique key left, row skipped"
                );
            }
        }
        rows
    }

    fn generate_row(
        &mut self,
        table: &Table,
        index: usize,
        existing: &GeneratedDataset,
        rows: &[Row],
    ) -> Row {
        let mut row = Row::new();
        for column in &table.columns {
            let references = References {
                dataset: existing,
                current_table: &table.name,
                current_rows: rows,
            };
            let value = self
                .synth
                .generate_value(column, table, index, &references);
            row.insert(column.name.clone(), value);
        }
        row
    }
}

/// Comparable values of `key` in `row`; None when any part is NULL, since
/// NULLs never collide in a unique index
fn key_tuple(row: &Row, key: &[String]) -> Option<Vec<String>> {
    key.iter()
        .map(|column| match row.get(column) {
            None | Some(SqlValue::Null) => None,
            Some(value) => Some(value.to_sql_literal(Dialect::Postgres).to_lowercase()),
        })
        .collect()
}
