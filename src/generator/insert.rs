//! INSERT statement rendering.

use super::Row;
use crate::schema::Dialect;
use crate::synth::SqlValue;

/// Render one `INSERT INTO t (c1, c2) VALUES (...);` line per row, with
/// identifiers quoted for the dialect.
///
/// The column list comes from the first row; a column missing from a later
/// row is written as NULL. Returns an empty string for no rows.
pub fn generate_insert_statements(table: &str, rows: &[Row], dialect: Dialect) -> String {
    let Some(first) = rows.first() else {
        return String::new();
    };
    let columns: Vec<&str> = first.columns().collect();
    let table = dialect.quote_identifier(table);
    let column_list = columns
        .iter()
        .map(|c| dialect.quote_identifier(c))
        .collect::<Vec<_>>()
        .join(", ");

    rows.iter()
        .map(|row| {
            let values = columns
                .iter()
                .map(|c| {
                    row.get(c)
                        .unwrap_or(&SqlValue::Null)
                        .to_sql_literal(dialect)
                })
                .collect::<Vec<_>>()
                .join(", ");
            format!("INSERT INTO {} ({}) VALUES ({});", table, column_list, values)
        })
        .collect::<Vec<_>>()
        .join("\n")
}
