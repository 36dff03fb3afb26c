use anyhow::Context;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub opensearch: OpenSearchConfig,
    pub server: ServerConfig,
    pub indexer: IndexerConfig,
    pub search: SearchConfig,
    pub migration: MigrationConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenSearchConfig {
    /// Plain HTTP on port 9200 when true, signed HTTPS on port 443 otherwise.
    pub local: bool,
    /// Bare host name, without scheme or port.
    pub host: Option<String>,
    pub username: String,
    pub password: String,
    pub aws_region: String,
    pub timeout_secs: u64,
    /// Pinned CA certificate used to verify the remote cluster.
    pub ca_cert_path: PathBuf,
}

impl Default for OpenSearchConfig {
    fn default() -> Self {
        Self {
            local: true,
            host: None,
            username: String::new(),
            password: String::new(),
            aws_region: "us-east-1".into(),
            timeout_secs: 60,
            ca_cert_path: "/usr/local/share/ca-certificates/McK_Entrust_Root_G1.crt".into(),
        }
    }
}

impl OpenSearchConfig {
    pub fn has_basic_auth(&self) -> bool {
        !self.username.is_empty() && !self.password.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0".into(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IndexerConfig {
    pub api_url: String,
    pub index_name: String,
    pub fetch_timeout_secs: u64,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            api_url: "https://randomuser.me/api/?results=50".into(),
            index_name: "expertise".into(),
            fetch_timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    pub default_index: String,
    pub default_page_size: usize,
    pub max_page_size: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_index: "people".into(),
            default_page_size: 10,
            max_page_size: 100,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Directory holding `schema/`, `scripts/` and `templates/`.
    pub base_dir: PathBuf,
    pub indices: Vec<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            base_dir: "opensearch_settings".into(),
            indices: vec!["expertise".into()],
        }
    }
}

impl AppConfig {
    pub fn load() -> anyhow::Result<Self> {
        // Step 1: Try loading .env file (silently ignore if not found)
        let _ = dotenvy::dotenv();

        // Step 2: Try loading TOML config as base
        let mut config = if Path::new("config.toml").exists() {
            let content = std::fs::read_to_string("config.toml")?;
            toml::from_str::<AppConfig>(&content).context("Failed to parse config.toml")?
        } else {
            AppConfig::default()
        };

        // Step 3: Override with environment variables where present
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn apply_env<F>(&mut self, lookup: F) -> anyhow::Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(val) = lookup("OPENSEARCH_CONNECTION_TIMEOUT") {
            self.opensearch.timeout_secs = val
                .parse()
                .context("OPENSEARCH_CONNECTION_TIMEOUT must be a number of seconds")?;
        }
        if let Some(val) = lookup("LOCAL") {
            self.opensearch.local = parse_flag(&val);
        }
        if let Some(val) = lookup("OPENSEARCH_HOSTS") {
            self.opensearch.host = Some(val).filter(|h| !h.is_empty());
        }
        if let Some(val) = lookup("OPENSEARCH_USERNAME") {
            self.opensearch.username = val;
        }
        if let Some(val) = lookup("OPENSEARCH_PASSWORD") {
            self.opensearch.password = val;
        }
        if let Some(val) = lookup("AWS_REGION") {
            self.opensearch.aws_region = val;
        }
        if let Some(val) = lookup("OPENSEARCH_CA_CERT") {
            self.opensearch.ca_cert_path = val.into();
        }
        if let Some(val) = lookup("SERVER_LISTEN_ADDR") {
            self.server.listen_addr = val;
        }
        if let Some(val) = lookup("SERVER_PORT") {
            self.server.port = val.parse().context("SERVER_PORT must be a port number")?;
        }
        if let Some(val) = lookup("INDEXER_API_URL") {
            self.indexer.api_url = val;
        }
        if let Some(val) = lookup("INDEX_NAME") {
            self.indexer.index_name = val;
        }
        if let Some(val) = lookup("INDEXER_FETCH_TIMEOUT") {
            self.indexer.fetch_timeout_secs = val
                .parse()
                .context("INDEXER_FETCH_TIMEOUT must be a number of seconds")?;
        }
        if let Some(val) = lookup("SEARCH_DEFAULT_INDEX") {
            self.search.default_index = val;
        }
        if let Some(val) = lookup("MIGRATION_BASE_DIR") {
            self.migration.base_dir = val.into();
        }
        if let Some(val) = lookup("MIGRATION_INDICES") {
            self.migration.indices = val
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(String::from)
                .collect();
        }
        Ok(())
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "true" | "1" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_local_mode() {
        let config = AppConfig::default();
        assert!(config.opensearch.local);
        assert_eq!(config.opensearch.timeout_secs, 60);
        assert_eq!(config.opensearch.aws_region, "us-east-1");
        assert_eq!(config.search.max_page_size, 100);
        assert_eq!(config.migration.indices, vec!["expertise".to_string()]);
    }

    #[test]
    fn local_flag_accepts_common_truthy_values() {
        for (raw, expected) in [
            ("True", true),
            ("yes", true),
            ("1", true),
            ("false", false),
            ("no", false),
            ("", false),
        ] {
            let mut config = AppConfig::default();
            config.apply_env(env(&[("LOCAL", raw)])).unwrap();
            assert_eq!(config.opensearch.local, expected, "LOCAL={raw}");
        }
    }

    #[test]
    fn env_overrides_connection_settings() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[
                ("OPENSEARCH_CONNECTION_TIMEOUT", "15"),
                ("OPENSEARCH_HOSTS", "search.internal"),
                ("OPENSEARCH_USERNAME", "admin"),
                ("OPENSEARCH_PASSWORD", "secret"),
                ("AWS_REGION", "eu-west-1"),
                ("MIGRATION_INDICES", "expertise, people ,"),
            ]))
            .unwrap();

        assert_eq!(config.opensearch.timeout_secs, 15);
        assert_eq!(config.opensearch.host.as_deref(), Some("search.internal"));
        assert!(config.opensearch.has_basic_auth());
        assert_eq!(config.opensearch.aws_region, "eu-west-1");
        assert_eq!(config.migration.indices, vec!["expertise", "people"]);
    }

    #[test]
    fn empty_host_is_treated_as_unset() {
        let mut config = AppConfig::default();
        config.apply_env(env(&[("OPENSEARCH_HOSTS", "")])).unwrap();
        assert!(config.opensearch.host.is_none());
    }

    #[test]
    fn basic_auth_requires_both_credentials() {
        let mut config = AppConfig::default();
        config
            .apply_env(env(&[("OPENSEARCH_USERNAME", "admin")]))
            .unwrap();
        assert!(!config.opensearch.has_basic_auth());
    }

    #[test]
    fn rejects_non_numeric_timeout() {
        let mut config = AppConfig::default();
        let result = config.apply_env(env(&[("OPENSEARCH_CONNECTION_TIMEOUT", "soon")]));
        assert!(result.is_err());
    }

    #[test]
    fn parses_partial_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            [opensearch]
            local = false
            host = "vpc-search.example.com"

            [search]
            default_index = "expertise"
            "#,
        )
        .unwrap();
        assert!(!config.opensearch.local);
        assert_eq!(config.opensearch.timeout_secs, 60);
        assert_eq!(config.search.default_index, "expertise");
        assert_eq!(config.search.default_page_size, 10);
    }
}
