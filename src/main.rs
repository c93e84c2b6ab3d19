use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::info;

use algolia_sync::algolia::AlgoliaClient;
use algolia_sync::{config, reconcile, store, sync};

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Probe the Algolia API with the configured credentials
    TestConnection,
    /// Push every published document of every enabled type
    SyncAll,
    /// Push a single document by id
    SyncDocument { id: i64 },
    /// Print the resolved settings (API key redacted)
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    cfg.ensure_dirs()?;

    if let Command::ShowConfig = args.command {
        println!("application_id: {}", cfg.algolia.application_id);
        println!(
            "api_key: {}",
            if cfg.algolia.api_key.trim().is_empty() {
                "(unset)"
            } else {
                "[REDACTED]"
            }
        );
        println!("host: {}", cfg.algolia.host);
        println!("enabled_types: {}", cfg.sync.enabled_types.join(", "));
        return Ok(());
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| format!("sqlite://{}/content.db", cfg.app.data_dir));
    let pool = store::init_pool(&database_url).await?;
    store::run_migrations(&pool).await?;

    let client = AlgoliaClient::from_config(&cfg)?;

    match args.command {
        Command::TestConnection => {
            sync::test_connection(&cfg, &client).await?;
            println!("Connection successful.");
        }
        Command::SyncAll => {
            let outcome = reconcile::sync_all(&pool, &cfg, &client).await?;
            println!("Synced {} documents.", outcome.synced);
            if !outcome.is_success() {
                for failure in &outcome.failures {
                    eprintln!("error: {failure}");
                }
                bail!("some types failed to sync");
            }
        }
        Command::SyncDocument { id } => {
            sync::sync_document(&pool, &cfg, &client, id).await?;
            info!(id, "document synced");
            println!("Document {id} synced.");
        }
        Command::ShowConfig => unreachable!(),
    }

    Ok(())
}
