use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;
mod config;

use cli::{Cli, Command};
use commands::Session;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    // Schedules are pure calculations; no ledger needed.
    if let Command::Schedule(terms) = &cli.command {
        return commands::schedule(terms);
    }

    let paths = config::Paths::resolve(cli.config.as_deref())?;
    let config = config::load(&paths)?;

    let db_path = match &config.database {
        Some(path) => path.clone(),
        None => {
            std::fs::create_dir_all(&paths.data_dir).context("Failed to create data directory")?;
            paths.data_dir.join("ledger.db")
        }
    };

    let pool = loansplit_storage::create_db(&db_path)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;
    loansplit_storage::seed_default_accounts(&pool)
        .await
        .context("Failed to seed default accounts")?;

    let session = Session::open(pool, &config).await?;
    commands::run(&session, cli.command).await
}
