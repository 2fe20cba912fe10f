use std::path::PathBuf;

use census::{config::RunConfig, pipeline};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Aggregate AI model metadata into a canonical catalog.
#[derive(Parser)]
#[command(name = "census", version, about)]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "census.toml")]
    config: PathBuf,

    /// Assemble the catalog without writing anything back.
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("census=info")),
        )
        .init();

    let config = match RunConfig::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load configuration");
            std::process::exit(1);
        }
    };

    if let Err(e) = pipeline::run(&config, cli.dry_run).await {
        // The persisted catalog is untouched: writes only happen after the
        // entire in-memory catalog is assembled.
        tracing::error!(error = %e, "Aggregation run failed");
        std::process::exit(1);
    }
}
