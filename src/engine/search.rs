use opensearch::{OpenSearch, SearchParts};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::engine::client::success_json;
use crate::error::AppResult;
use crate::models::search::{SearchHit, SearchPage};

/// Searched when the caller does not name fields. `^n` boosts a field.
pub const DEFAULT_FIELDS: &[&str] = &[
    "name.first^2",
    "name.last^2",
    "name.first.ph",
    "name.last.ph",
    "email",
    "location.city",
    "location.state",
    "location.country",
    "location.street.name",
    "phone",
    "cell",
    "nat",
    "gender",
];

const SOURCE_INCLUDES: &[&str] = &[
    "gender",
    "name.*",
    "location.*",
    "email",
    "login.*",
    "dob.*",
    "registered.*",
    "phone",
    "cell",
    "id.*",
    "picture.*",
    "nat",
];

const HIGHLIGHT_FIELDS: &[&str] = &[
    "name.first",
    "name.last",
    "email",
    "location.city",
    "location.state",
    "location.country",
];

pub struct SearchClient {
    es: Arc<OpenSearch>,
}

#[derive(Debug, Clone)]
pub struct SearchParams {
    pub keyword: String,
    pub index_name: String,
    /// 1-based.
    pub page: usize,
    pub size: usize,
    pub fields: Option<Vec<String>>,
}

impl SearchParams {
    /// Parses a comma-separated field list; blank entries are dropped.
    pub fn parse_fields(raw: Option<&str>) -> Option<Vec<String>> {
        let fields: Vec<String> = raw?
            .split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(String::from)
            .collect();
        (!fields.is_empty()).then_some(fields)
    }

    /// Zero-based hit offset of the requested page, `None` when `page` is 0
    /// or the offset does not fit in `usize`.
    pub fn offset(&self) -> Option<usize> {
        self.page.checked_sub(1)?.checked_mul(self.size)
    }
}

impl SearchClient {
    pub fn new(es: Arc<OpenSearch>) -> Self {
        Self { es }
    }

    pub async fn search(&self, params: &SearchParams) -> AppResult<SearchPage> {
        let body = build_query(params);
        tracing::debug!("Search body for '{}': {body}", params.index_name);

        let response = self
            .es
            .search(SearchParts::Index(&[params.index_name.as_str()]))
            .body(body)
            .send()
            .await?;

        let body = success_json(response, "Search").await?;
        Ok(parse_response(&body, params.page, params.size))
    }
}

pub fn build_keyword_query(keyword: &str, fields: Option<&[String]>) -> Value {
    let fields: Vec<&str> = match fields {
        Some(fields) => fields.iter().map(String::as_str).collect(),
        None => DEFAULT_FIELDS.to_vec(),
    };

    json!({
        "multi_match": {
            "query": keyword,
            "fields": fields,
            "type": "best_fields",
            "operator": "or",
            "fuzziness": "AUTO"
        }
    })
}

pub fn build_query(params: &SearchParams) -> Value {
    let from = params.offset().unwrap_or(0);
    let highlight: serde_json::Map<String, Value> = HIGHLIGHT_FIELDS
        .iter()
        .map(|field| (field.to_string(), json!({})))
        .collect();

    json!({
        "from": from,
        "size": params.size,
        "query": build_keyword_query(&params.keyword, params.fields.as_deref()),
        "_source": { "includes": SOURCE_INCLUDES },
        "highlight": { "fields": highlight }
    })
}

/// `hits.total` is a plain number on older engines and `{"value": n}` on newer ones.
pub fn total_hits(total: &Value) -> u64 {
    match total {
        Value::Object(obj) => obj.get("value").and_then(Value::as_u64).unwrap_or(0),
        other => other.as_u64().unwrap_or(0),
    }
}

pub fn total_pages(total: u64, size: usize) -> u64 {
    if total == 0 || size == 0 {
        0
    } else {
        total.div_ceil(size as u64)
    }
}

pub fn parse_response(body: &Value, page: usize, size: usize) -> SearchPage {
    let total = total_hits(&body["hits"]["total"]);

    let results = body["hits"]["hits"]
        .as_array()
        .map(|hits| {
            hits.iter()
                .map(|hit| SearchHit {
                    id: hit["_id"].as_str().map(String::from),
                    score: hit["_score"].as_f64(),
                    source: hit.get("_source").cloned().unwrap_or_else(|| json!({})),
                    highlight: hit.get("highlight").cloned().unwrap_or_else(|| json!({})),
                })
                .collect()
        })
        .unwrap_or_default();

    SearchPage {
        total_hits: total,
        total_pages: total_pages(total, size),
        page,
        size,
        results,
    }
}
