use indicatif::{ProgressBar, ProgressStyle};
use schemars::JsonSchema;
use serde::Serialize;
use sql_testbed::config::Config;
use sql_testbed::generator::{GenerationStats, TestDataGenerator};
use sql_testbed::schema;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Instant;

/// JSON output for the generate command
#[derive(Serialize, JsonSchema)]
pub(crate) struct GenerateJsonOutput {
    input_file: String,
    dialect: String,
    /// Seed that reproduces this dataset
    seed: u64,
    rows_per_table: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    output_file: Option<String>,
    elapsed_secs: f64,
    statistics: GenerationStats,
}

#[allow(clippy::too_many_arguments)]
pub fn run(
    file: PathBuf,
    dialect: String,
    rows: Option<usize>,
    seed: Option<u64>,
    output: Option<PathBuf>,
    config: &Config,
    json: bool,
    progress: bool,
) -> anyhow::Result<()> {
    if !file.exists() {
        anyhow::bail!("input file does not exist: {}", file.display());
    }

    let rows_per_table = rows.unwrap_or(config.generation.rows);
    let start_time = Instant::now();
    let schema = schema::parse_file(&file, &dialect)?;
    let dialect = schema.dialect;
    let mut generator = TestDataGenerator::new(config.generation.synthesizer(seed));

    let progress_bar = if progress && !schema.is_empty() {
        let pb = ProgressBar::new(schema.len() as u64);
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} tables {msg}",
            )
            .unwrap()
            .progress_chars("█▓▒░  ")
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏"),
        );
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        Some(pb)
    } else {
        None
    };

    let result = generator.generate_with_progress(schema, rows_per_table, |table, _| {
        if let Some(pb) = &progress_bar {
            pb.set_message(table.to_string());
            pb.inc(1);
        }
    });
    if let Some(pb) = progress_bar {
        pb.finish_with_message("done");
    }

    let sql = result.data.to_sql(dialect);
    match &output {
        Some(path) => fs::write(path, &sql)?,
        None if !json => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(sql.as_bytes())?;
            if !sql.is_empty() {
                stdout.write_all(b"\n")?;
            }
        }
        None => {}
    }
    let elapsed = start_time.elapsed();

    if json {
        let output_json = GenerateJsonOutput {
            input_file: file.display().to_string(),
            dialect: dialect.to_string(),
            seed: generator.seed(),
            rows_per_table,
            output_file: output.as_ref().map(|p| p.display().to_string()),
            elapsed_secs: elapsed.as_secs_f64(),
            statistics: result.stats,
        };
        println!("{}", serde_json::to_string_pretty(&output_json)?);
        return Ok(());
    }

    eprintln!(
        "✓ Generated {} rows across {} tables in {:.3?} (seed {})",
        result.stats.total_rows,
        result.stats.total_tables,
        elapsed,
        generator.seed()
    );
    if let Some(path) = &output {
        eprintln!("  Output: {}", path.display());
    }

    Ok(())
}
