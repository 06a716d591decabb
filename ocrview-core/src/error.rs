use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ViewerError {
    #[error("no document is loaded")]
    NoDocument,
    #[error("failed to load document: {0:#}")]
    Load(#[source] anyhow::Error),
    #[error("failed to save document: {0:#}")]
    Download(#[source] anyhow::Error),
    #[error("unsupported document source: {0}")]
    UnsupportedSource(String),
    #[error("malformed data url: {0}")]
    InvalidDataUrl(String),
    #[error("failed to decode base64 payload")]
    Base64(#[from] base64::DecodeError),
    #[error("failed to parse config {path:?}")]
    Config {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("failed to parse field list")]
    Fields(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
