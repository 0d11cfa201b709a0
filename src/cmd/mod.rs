pub(crate) mod analyze;
mod check;
pub(crate) mod db;
mod env;
pub(crate) mod generate;
pub(crate) mod order;
mod shutdown;

use clap::{ArgAction, CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};
use sql_testbed::config::Config;
use std::io;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "sql-testbed")]
#[command(version)]
#[command(
    about = "Provision ephemeral database and application containers seeded from SQL schemas",
    long_about = None
)]
pub struct Cli {
    /// Increase log verbosity (-v debug for this tool, -vv debug for everything)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Check that the container runtime is installed and running
    Check {
        /// Container runtime CLI to check
        #[arg(long, default_value = "docker")]
        runtime: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Parse a schema file and report tables, relationships and complexity
    Analyze {
        /// Schema file (supports .gz, .bz2, .xz, .zst compression)
        file: PathBuf,

        /// SQL dialect: mysql, postgres, or sqlite
        #[arg(short, long, default_value = "mysql")]
        dialect: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print tables in foreign-key dependency order
    Order {
        /// Schema file (supports .gz, .bz2, .xz, .zst compression)
        file: PathBuf,

        /// SQL dialect: mysql, postgres, or sqlite
        #[arg(short, long, default_value = "mysql")]
        dialect: String,

        /// Output results as JSON
        #[arg(long)]
        json: bool,
    },

    /// Generate fake test data as INSERT statements
    Generate {
        /// Schema file (supports .gz, .bz2, .xz, .zst compression)
        file: PathBuf,

        /// SQL dialect: mysql, postgres, or sqlite
        #[arg(short, long, default_value = "mysql")]
        dialect: String,

        /// Rows per table (default from config, else 100)
        #[arg(short, long)]
        rows: Option<usize>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// Output SQL file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print a JSON summary instead of SQL (SQL still goes to --output)
        #[arg(long)]
        json: bool,

        /// Show progress during generation
        #[arg(short, long)]
        progress: bool,
    },

    /// Start a seeded test database container and keep it until Ctrl-C
    Db {
        /// Database type: mysql, postgres, or mongodb
        #[arg(short = 't', long = "type", default_value = "mysql")]
        kind: String,

        /// Schema file to apply and seed
        #[arg(short, long)]
        schema: Option<PathBuf>,

        /// Host port (default per database type)
        #[arg(short, long)]
        port: Option<u16>,

        /// Rows per table to insert (default from config, else 100)
        #[arg(short, long)]
        rows: Option<usize>,

        /// Random seed for reproducibility
        #[arg(long)]
        seed: Option<u64>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output handles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Start an application container serving a project directory until Ctrl-C
    Env {
        /// Project directory mounted read-only at /var/www/html
        #[arg(long)]
        project: PathBuf,

        /// Base image
        #[arg(long, default_value = "php:8.2-apache")]
        image: String,

        /// Host port for the application
        #[arg(short, long, default_value_t = 8888)]
        port: u16,

        /// Also start a database of this type (mysql, postgres, mongodb)
        #[arg(long)]
        db: Option<String>,

        /// Schema file to seed the database with
        #[arg(short, long, requires = "db")]
        schema: Option<PathBuf>,

        /// Rows per table to insert (default from config, else 100)
        #[arg(short, long)]
        rows: Option<usize>,

        /// Extra environment variable (KEY=VALUE, repeatable)
        #[arg(short, long = "env", value_parser = parse_key_val)]
        env_vars: Vec<(String, String)>,

        /// YAML config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output handles as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the JSON Schema of --json outputs
    Schema {
        /// Command name (default: all)
        command: Option<String>,
    },

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

fn parse_key_val(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got '{}'", s)),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    Ok(Config::resolve(path)?)
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Check { runtime, json } => check::run(runtime, json).await,
        Commands::Analyze {
            file,
            dialect,
            json,
        } => analyze::run(file, dialect, json),
        Commands::Order {
            file,
            dialect,
            json,
        } => order::run(file, dialect, json),
        Commands::Generate {
            file,
            dialect,
            rows,
            seed,
            output,
            config,
            json,
            progress,
        } => {
            let config = load_config(config.as_deref())?;
            generate::run(file, dialect, rows, seed, output, &config, json, progress)
        }
        Commands::Db {
            kind,
            schema,
            port,
            rows,
            seed,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            db::run(kind, schema, port, rows, seed, config, json).await
        }
        Commands::Env {
            project,
            image,
            port,
            db,
            schema,
            rows,
            env_vars,
            config,
            json,
        } => {
            let config = load_config(config.as_deref())?;
            let options = env::EnvOptions {
                project,
                image,
                port,
                db,
                schema,
                rows,
                env_vars,
                json,
            };
            env::run(options, config).await
        }
        Commands::Schema { command } => print_schemas(command),
        Commands::Completions { shell } => {
            generate(shell, &mut Cli::command(), "sql-testbed", &mut io::stdout());
            Ok(())
        }
    }
}

fn print_schemas(command: Option<String>) -> anyhow::Result<()> {
    match command {
        Some(name) => {
            let Some(schema) = crate::json_schema::get_schema(&name) else {
                anyhow::bail!(
                    "no JSON schema for '{}'. Available: {}",
                    name,
                    crate::json_schema::schema_names().join(", ")
                );
            };
            println!("{}", serde_json::to_string_pretty(&schema)?);
        }
        None => {
            let all = crate::json_schema::all_schemas();
            println!("{}", serde_json::to_string_pretty(&all)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_key_val() {
        assert_eq!(
            parse_key_val("APP_ENV=test").unwrap(),
            ("APP_ENV".to_string(), "test".to_string())
        );
        assert_eq!(
            parse_key_val("URL=a=b").unwrap(),
            ("URL".to_string(), "a=b".to_string())
        );
        assert!(parse_key_val("=x").is_err());
        assert!(parse_key_val("novalue").is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }
}
