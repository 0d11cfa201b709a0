//! Order command - print tables in foreign-key dependency order.

use anyhow::{bail, Result};
use schemars::JsonSchema;
use serde::Serialize;
use sql_testbed::schema::{self, dependency_order};
use std::path::PathBuf;

/// JSON output for the order command
#[derive(Serialize, JsonSchema)]
pub(crate) struct OrderJsonOutput {
    file: String,
    /// Generation order, cyclic tables last
    order: Vec<String>,
    /// Tables that could not be placed by dependency
    cyclic_tables: Vec<String>,
}

pub fn run(file: PathBuf, dialect: String, json: bool) -> Result<()> {
    if !file.exists() {
        bail!("input file does not exist: {}", file.display());
    }

    let schema = schema::parse_file(&file, &dialect)?;
    let result = dependency_order(&schema.tables);
    let name = |i: &usize| schema.tables[*i].name.clone();
    let order: Vec<String> = result.order.iter().map(name).collect();
    let cyclic: Vec<String> = result.cyclic_tables.iter().map(name).collect();

    if json {
        let output = OrderJsonOutput {
            file: file.display().to_string(),
            order,
            cyclic_tables: cyclic,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    if order.is_empty() {
        eprintln!("No tables found in the file.");
        return Ok(());
    }

    if !cyclic.is_empty() {
        eprintln!("Warning: Circular dependencies detected!");
        eprintln!("The following tables are appended in declaration order:");
        for table in &cyclic {
            eprintln!("  - {}", table);
        }
        eprintln!();
    }

    println!("Dependency order ({} tables):", order.len());
    for (i, table) in order.iter().enumerate() {
        println!("  {}. {}", i + 1, table);
    }

    Ok(())
}
