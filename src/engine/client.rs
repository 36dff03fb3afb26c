use opensearch::OpenSearch;
use opensearch::auth::Credentials;
use opensearch::cert::{Certificate, CertificateValidation};
use opensearch::http::response::Response;
use opensearch::http::transport::{SingleNodeConnectionPool, TransportBuilder};
use opensearch::indices::{IndicesOpenParts, IndicesStatsParts};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::config::OpenSearchConfig;
use crate::error::{AppError, AppResult};

const LOCAL_PORT: u16 = 9200;
const REMOTE_PORT: u16 = 443;
const DEFAULT_LOCAL_HOST: &str = "localhost";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub cluster_name: String,
    pub version: String,
}

pub async fn create_client(config: &OpenSearchConfig) -> AppResult<Arc<OpenSearch>> {
    let timeout = Duration::from_secs(config.timeout_secs);
    tracing::info!(
        "Initializing OpenSearch client ({} mode, timeout {}s)",
        if config.local { "LOCAL" } else { "REMOTE" },
        config.timeout_secs
    );

    let client = if config.local {
        let host = config
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .unwrap_or(DEFAULT_LOCAL_HOST);
        let url = node_url("http", host, LOCAL_PORT)?;

        let credentials = if config.has_basic_auth() {
            tracing::info!("Authentication enabled with username/password");
            Some(Credentials::Basic(
                config.username.clone(),
                config.password.clone(),
            ))
        } else {
            tracing::info!("No authentication configured (no username/password provided)");
            None
        };

        connect(url, credentials, None, timeout)?
    } else {
        let host = config
            .host
            .as_deref()
            .filter(|h| !h.is_empty())
            .ok_or_else(|| {
                AppError::Config("OPENSEARCH_HOSTS must be set when not using LOCAL mode".into())
            })?;
        let url = node_url("https", host, REMOTE_PORT)?;

        tracing::info!("Loading AWS credentials for region {}", config.aws_region);
        let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .region(aws_config::Region::new(config.aws_region.clone()))
            .load()
            .await;
        let credentials: Credentials = sdk_config.try_into()?;

        let pem = std::fs::read(&config.ca_cert_path)
            .map_err(|e| AppError::io(&config.ca_cert_path, e))?;
        let certificate = Certificate::from_pem(&pem)?;

        connect(
            url,
            Some(credentials),
            Some(CertificateValidation::Full(certificate)),
            timeout,
        )?
    };

    Ok(Arc::new(client))
}

/// Builds a client for a single node. Shared by both connection modes.
pub fn connect(
    url: Url,
    credentials: Option<Credentials>,
    cert_validation: Option<CertificateValidation>,
    timeout: Duration,
) -> AppResult<OpenSearch> {
    tracing::info!("OpenSearch node: {url}");
    let pool = SingleNodeConnectionPool::new(url);
    let mut builder = TransportBuilder::new(pool).disable_proxy().timeout(timeout);

    if let Some(credentials) = credentials {
        builder = builder.auth(credentials);
    }
    if let Some(validation) = cert_validation {
        builder = builder.cert_validation(validation);
    }

    let transport = builder
        .build()
        .map_err(|e| AppError::Config(format!("Failed to build transport: {e}")))?;
    Ok(OpenSearch::new(transport))
}

fn node_url(scheme: &str, host: &str, port: u16) -> AppResult<Url> {
    Url::parse(&format!("{scheme}://{host}:{port}"))
        .map_err(|e| AppError::Config(format!("Invalid OpenSearch host '{host}': {e}")))
}

pub async fn cluster_info(client: &OpenSearch) -> AppResult<ClusterInfo> {
    let response = client.info().send().await?;
    let body = success_json(response, "Cluster info").await?;

    Ok(ClusterInfo {
        cluster_name: body["cluster_name"].as_str().unwrap_or("N/A").to_string(),
        version: body["version"]["number"]
            .as_str()
            .unwrap_or("N/A")
            .to_string(),
    })
}

/// Opens `index`, treating an already-open index as success. Failures are
/// logged and never returned.
pub async fn ensure_open(client: &OpenSearch, index_name: &str) {
    tracing::info!("Ensuring index {index_name} is open...");
    let failure = match client
        .indices()
        .open(IndicesOpenParts::Index(&[index_name]))
        .send()
        .await
    {
        Ok(response) if response.status_code().is_success() => {
            tracing::info!("Index {index_name} is now open");
            return;
        }
        Ok(response) => {
            let status = response.status_code();
            let body = response.text().await.unwrap_or_default();
            format!("status {status}: {body}")
        }
        Err(e) => e.to_string(),
    };

    if failure.contains("index_not_closed_exception")
        || failure.to_lowercase().contains("already open")
    {
        tracing::debug!("Index {index_name} is already open");
        return;
    }

    match client
        .indices()
        .stats(IndicesStatsParts::Index(&[index_name]))
        .send()
        .await
    {
        Ok(response) if response.status_code().is_success() => {
            tracing::debug!("Index {index_name} is accessible");
        }
        _ => tracing::warn!("Could not verify index {index_name} state: {failure}"),
    }
}

/// Reads the body of a 2xx response, mapping anything else to `AppError::Engine`.
pub(crate) async fn success_json(response: Response, operation: &str) -> AppResult<Value> {
    let status = response.status_code();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(AppError::Engine {
            operation: operation.to_string(),
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.json().await?)
}

/// Requires `{"acknowledged": true}` in the response body.
pub(crate) async fn expect_acknowledged(response: Response, operation: &str) -> AppResult<Value> {
    let body: Value = response.json().await?;
    tracing::debug!("{operation} response: {body}");
    if body["acknowledged"].as_bool() != Some(true) {
        return Err(AppError::Unacknowledged {
            operation: operation.to_string(),
            response: body,
        });
    }
    Ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_node_urls_per_mode() {
        assert_eq!(
            node_url("http", "localhost", LOCAL_PORT).unwrap().as_str(),
            "http://localhost:9200/"
        );
        assert_eq!(
            node_url("https", "search.example.com", REMOTE_PORT)
                .unwrap()
                .as_str(),
            // 443 is the https default, so the url crate omits it
            "https://search.example.com/"
        );
    }

    #[tokio::test]
    async fn remote_mode_without_host_is_a_config_error() {
        let config = OpenSearchConfig {
            local: false,
            host: None,
            ..OpenSearchConfig::default()
        };
        let err = create_client(&config).await.unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
        assert!(err.to_string().contains("OPENSEARCH_HOSTS"));
    }

    #[tokio::test]
    async fn local_mode_defaults_host() {
        let config = OpenSearchConfig::default();
        assert!(create_client(&config).await.is_ok());
    }
}
