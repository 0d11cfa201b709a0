use schemars::JsonSchema;
use serde::Serialize;
use sql_testbed::input::Compression;
use sql_testbed::schema::{self, analyze_complexity, ComplexityReport};
use std::path::PathBuf;
use std::time::Instant;

/// JSON output for the analyze command
#[derive(Serialize, JsonSchema)]
pub(crate) struct AnalyzeJsonOutput {
    file: String,
    dialect: String,
    complexity: ComplexityReport,
    tables: Vec<TableSummary>,
    relationships: Vec<RelationshipSummary>,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct TableSummary {
    name: String,
    columns: usize,
    primary_key: Vec<String>,
    foreign_keys: usize,
    indexes: usize,
}

#[derive(Serialize, JsonSchema)]
pub(crate) struct RelationshipSummary {
    from: String,
    to: String,
}

pub fn run(file: PathBuf, dialect: String, json: bool) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("input file does not exist: {}", file.display());
    }

    let start_time = Instant::now();
    let schema = schema::parse_file(&file, &dialect)?;
    let report = analyze_complexity(&schema);
    let elapsed = start_time.elapsed();

    if json {
        let output = AnalyzeJsonOutput {
            file: file.display().to_string(),
            dialect: schema.dialect.to_string(),
            complexity: report,
            tables: schema
                .tables
                .iter()
                .map(|t| TableSummary {
                    name: t.name.clone(),
                    columns: t.columns.len(),
                    primary_key: t.primary_key.clone(),
                    foreign_keys: t.foreign_keys.len(),
                    indexes: t.indexes.len(),
                })
                .collect(),
            relationships: schema
                .relationships
                .iter()
                .map(|r| RelationshipSummary {
                    from: format!("{}.{}", r.from_table, r.from_column),
                    to: format!("{}.{}", r.to_table, r.to_column),
                })
                .collect(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let compression = Compression::from_path(&file);
    if compression != Compression::None {
        println!("Detected compression: {}", compression);
    }
    println!(
        "Analyzed schema: {} [dialect: {}] in {:.3?}\n",
        file.display(),
        schema.dialect,
        elapsed
    );

    if schema.is_empty() {
        println!("No tables found in schema file.");
        return Ok(());
    }

    println!(
        "{:<40} {:>8} {:>6} {:>8}  {}",
        "Table Name", "Columns", "FKs", "Indexes", "Primary Key"
    );
    println!("{}", "─".repeat(80));
    for table in &schema.tables {
        println!(
            "{:<40} {:>8} {:>6} {:>8}  {}",
            truncate_string(&table.name, 40),
            table.columns.len(),
            table.foreign_keys.len(),
            table.indexes.len(),
            table.primary_key.join(", ")
        );
    }
    println!("{}", "─".repeat(80));

    if !schema.relationships.is_empty() {
        println!("\nRelationships:");
        for r in &schema.relationships {
            println!(
                "  {}.{} → {}.{}",
                r.from_table, r.from_column, r.to_table, r.to_column
            );
        }
    }

    println!(
        "\nComplexity: {} (score {:.1}; {} tables, {} columns, {} relationships)",
        report.complexity,
        report.score,
        report.table_count,
        report.column_count,
        report.relationship_count
    );

    Ok(())
}

fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
