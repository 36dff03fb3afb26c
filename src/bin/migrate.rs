//! Schema migration tool
//!
//! Creates each configured index if needed and applies its settings,
//! mappings, stored scripts and query templates from the migration base dir.
//! Any failure stops the run with exit code 1.

use std::process::ExitCode;

use people_search::config::AppConfig;
use people_search::engine::client::{cluster_info, create_client};
use people_search::schema::Migrator;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    match run().await {
        Ok(()) => {
            info!("=== Migration Complete! ===");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Migration failed: {e:?}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> anyhow::Result<()> {
    let config = AppConfig::load()?;
    info!(
        "Migrating {:?} from {}",
        config.migration.indices,
        config.migration.base_dir.display()
    );

    let es_client = create_client(&config.opensearch).await?;
    let info = cluster_info(&es_client).await?;
    info!(
        "Connection test successful! Cluster name: {}, Version: {}",
        info.cluster_name, info.version
    );

    let migrator = Migrator::new(es_client, config.migration.base_dir.clone());
    for (idx, index_name) in config.migration.indices.iter().enumerate() {
        info!(
            "[{}/{}] Migrating index {index_name}...",
            idx + 1,
            config.migration.indices.len()
        );
        migrator.migrate(index_name).await?;
    }
    Ok(())
}
