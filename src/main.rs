mod cmd;
mod json_schema;

use clap::Parser;
use cmd::Cli;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let level = match cli.verbose {
        0 => "sql_testbed=info",
        1 => "sql_testbed=debug",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    if let Err(e) = cmd::run(cli).await {
        eprintln!("{e:#}");
        std::process::exit(1);
    }
}
