use axum::Json;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::api::AppState;
use crate::engine::client::cluster_info;
use crate::engine::search::SearchParams;
use crate::models::search::SearchHit;

/// Error payload: `{"detail": "..."}` with the given status.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    fn new(status: StatusCode, detail: impl Into<String>) -> Self {
        Self {
            status,
            detail: detail.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub async fn root() -> Json<Value> {
    Json(json!({
        "message": "People Search API",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "search": "/search?keyword=<your_keyword>",
            "health": "/health"
        }
    }))
}

pub async fn health(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    match cluster_info(&state.es).await {
        Ok(info) => Ok(Json(json!({
            "status": "healthy",
            "opensearch": {
                "cluster_name": info.cluster_name,
                "version": info.version
            }
        }))),
        Err(e) => {
            tracing::error!("Health check failed: {e}");
            Err(ApiError::new(
                StatusCode::SERVICE_UNAVAILABLE,
                format!("OpenSearch connection failed: {e}"),
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub keyword: String,
    pub index_name: Option<String>,
    pub page: Option<usize>,
    pub size: Option<usize>,
    /// Comma-separated field list.
    pub fields: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub keyword: String,
    pub total_hits: u64,
    pub page: usize,
    pub size: usize,
    pub total_pages: u64,
    pub results: Vec<SearchHit>,
}

pub async fn search(
    State(state): State<AppState>,
    query: Result<Query<SearchQuery>, QueryRejection>,
) -> Result<Json<SearchResponse>, ApiError> {
    let Query(query) =
        query.map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()))?;
    let page = query.page.unwrap_or(1);
    let size = query.size.unwrap_or(state.config.default_page_size);

    if page < 1 {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            "page must be greater than or equal to 1",
        ));
    }
    if size < 1 || size > state.config.max_page_size {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("size must be between 1 and {}", state.config.max_page_size),
        ));
    }

    let params = SearchParams {
        keyword: query.keyword,
        index_name: query
            .index_name
            .unwrap_or_else(|| state.config.default_index.clone()),
        page,
        size,
        fields: SearchParams::parse_fields(query.fields.as_deref()),
    };
    if params.offset().is_none() {
        return Err(ApiError::new(
            StatusCode::UNPROCESSABLE_ENTITY,
            format!("page {page} is out of range for size {size}"),
        ));
    }

    let result = state.search.search(&params).await.map_err(|e| {
        tracing::error!("Search failed: {e}");
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Search failed: {e}"),
        )
    })?;

    Ok(Json(SearchResponse {
        success: true,
        keyword: params.keyword,
        total_hits: result.total_hits,
        page: result.page,
        size: result.size,
        total_pages: result.total_pages,
        results: result.results,
    }))
}
