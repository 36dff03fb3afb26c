//! One-shot indexer: checks the cluster connection, then fetches user records
//! from the configured API and indexes them. Exits 1 on failure.

use std::process::ExitCode;
use std::time::Duration;

use people_search::config::AppConfig;
use people_search::engine::client::{cluster_info, create_client};
use people_search::engine::indexer::UserIndexer;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load()?;

    info!("Attempting to connect to OpenSearch...");
    let es_client = match create_client(&config.opensearch).await {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to connect to OpenSearch: {e}");
            println!("OpenSearch connection test: FAILED");
            return Ok(ExitCode::FAILURE);
        }
    };
    match cluster_info(&es_client).await {
        Ok(info) => {
            info!("Successfully connected to OpenSearch!");
            info!("Cluster name: {}", info.cluster_name);
            info!("OpenSearch version: {}", info.version);
            println!("OpenSearch connection test: PASSED");
        }
        Err(e) => {
            error!("Failed to connect to OpenSearch: {e}");
            println!("OpenSearch connection test: FAILED");
            return Ok(ExitCode::FAILURE);
        }
    }

    let indexer = UserIndexer::new(
        es_client,
        Duration::from_secs(config.indexer.fetch_timeout_secs),
    )?;
    let report = indexer
        .fetch_and_index(&config.indexer.api_url, &config.indexer.index_name)
        .await;
    println!("{}", serde_json::to_string_pretty(&report)?);

    if report.success {
        println!("Users indexed successfully");
        Ok(ExitCode::SUCCESS)
    } else {
        println!("Failed to index users");
        Ok(ExitCode::FAILURE)
    }
}
