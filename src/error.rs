use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("OpenSearch error: {0}")]
    OpenSearch(#[from] opensearch::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Failed to fetch data from API: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{operation} was not acknowledged: {response}")]
    Unacknowledged {
        operation: String,
        response: serde_json::Value,
    },

    #[error("{operation} failed (status {status}): {body}")]
    Engine {
        operation: String,
        status: u16,
        body: String,
    },
}

impl AppError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
