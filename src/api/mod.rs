//! HTTP surface of the query service.

pub mod handlers;

use axum::Router;
use axum::routing::get;
use opensearch::OpenSearch;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::config::SearchConfig;
use crate::engine::search::SearchClient;

#[derive(Clone)]
pub struct AppState {
    pub es: Arc<OpenSearch>,
    pub search: Arc<SearchClient>,
    pub config: Arc<SearchConfig>,
}

impl AppState {
    pub fn new(es: Arc<OpenSearch>, config: SearchConfig) -> Self {
        Self {
            search: Arc::new(SearchClient::new(es.clone())),
            es,
            config: Arc::new(config),
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/search", get(handlers::search))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
