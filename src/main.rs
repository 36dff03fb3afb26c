use people_search::api;
use people_search::config::AppConfig;
use people_search::engine::client::create_client;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("people_search=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .init();

    tracing::info!("Starting people-search...");

    // Load configuration (env vars override TOML)
    let config = AppConfig::load()?;

    let es_client = create_client(&config.opensearch).await?;
    tracing::info!("OpenSearch client initialized");

    let app = api::router(api::AppState::new(es_client, config.search));

    let addr = format!("{}:{}", config.server.listen_addr, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
