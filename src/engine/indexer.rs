use opensearch::indices::{IndicesCreateParts, IndicesExistsParts};
use opensearch::params::Refresh;
use opensearch::{IndexParts, OpenSearch};
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;

use crate::engine::client::{ensure_open, success_json};
use crate::error::{AppError, AppResult};
use crate::models::user::{IndexReport, document_id, extract_records};

pub struct UserIndexer {
    es: Arc<OpenSearch>,
    http: reqwest::Client,
}

impl UserIndexer {
    pub fn new(es: Arc<OpenSearch>, fetch_timeout: Duration) -> AppResult<Self> {
        let http = reqwest::Client::builder().timeout(fetch_timeout).build()?;
        Ok(Self { es, http })
    }

    /// Fetches user records from `api_url` and upserts each one into
    /// `index_name`. Failures are reported in the returned `IndexReport`.
    pub async fn fetch_and_index(&self, api_url: &str, index_name: &str) -> IndexReport {
        match self.try_fetch_and_index(api_url, index_name).await {
            Ok(report) => report,
            Err(e) => {
                let message = match e {
                    AppError::Fetch(_) => e.to_string(),
                    other => format!("Unexpected error: {other}"),
                };
                tracing::error!("{message}");
                IndexReport::failed(message)
            }
        }
    }

    async fn try_fetch_and_index(&self, api_url: &str, index_name: &str) -> AppResult<IndexReport> {
        tracing::info!("Fetching user data from API: {api_url}");
        let users = self.fetch_users(api_url).await?;

        if users.is_empty() {
            tracing::warn!("No users found in API response");
            return Ok(IndexReport::failed("No users found in API response"));
        }
        tracing::info!("Received {} users from API", users.len());

        self.ensure_index(index_name).await?;

        let mut indexed_count = 0;
        let mut errors = Vec::new();

        for (idx, user) in users.iter().enumerate() {
            let doc_id = document_id(user, idx);
            match self.index_user(index_name, &doc_id, user).await {
                Ok(true) => {
                    indexed_count += 1;
                    tracing::debug!("Indexed user {}/{}: {doc_id}", idx + 1, users.len());
                }
                Ok(false) => {
                    tracing::warn!("User {} ({doc_id}) was neither created nor updated", idx + 1);
                }
                Err(e) => {
                    let message = format!("Failed to index user {}: {e}", idx + 1);
                    tracing::error!("{message}");
                    errors.push(message);
                }
            }
        }

        tracing::info!(
            "Successfully indexed {indexed_count}/{} users into index '{index_name}'",
            users.len()
        );

        Ok(IndexReport {
            success: indexed_count > 0,
            total_users: users.len(),
            indexed_count,
            index_name: Some(index_name.to_string()),
            errors,
            error: None,
        })
    }

    async fn fetch_users(&self, api_url: &str) -> AppResult<Vec<Value>> {
        let body: Value = self
            .http
            .get(api_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(extract_records(body))
    }

    async fn ensure_index(&self, index_name: &str) -> AppResult<()> {
        let exists = self
            .es
            .indices()
            .exists(IndicesExistsParts::Index(&[index_name]))
            .send()
            .await?;

        if exists.status_code().as_u16() == 404 {
            tracing::info!("Creating index: {index_name}");
            let response = self
                .es
                .indices()
                .create(IndicesCreateParts::Index(index_name))
                .body(json!({
                    "settings": {
                        "number_of_shards": 1,
                        "number_of_replicas": 0
                    }
                }))
                .send()
                .await?;
            success_json(response, "Create index").await?;
        } else {
            ensure_open(&self.es, index_name).await;
        }
        Ok(())
    }

    /// Returns whether the engine reported the document as created or updated.
    async fn index_user(&self, index_name: &str, doc_id: &str, user: &Value) -> AppResult<bool> {
        let response = self
            .es
            .index(IndexParts::IndexId(index_name, doc_id))
            .refresh(Refresh::True)
            .body(user)
            .send()
            .await?;

        let body = success_json(response, "Index document").await?;
        Ok(matches!(body["result"].as_str(), Some("created" | "updated")))
    }
}
