use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
pub struct SearchPage {
    pub total_hits: u64,
    pub total_pages: u64,
    pub page: usize,
    pub size: usize,
    pub results: Vec<SearchHit>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub id: Option<String>,
    pub score: Option<f64>,
    pub source: Value,
    pub highlight: Value,
}
