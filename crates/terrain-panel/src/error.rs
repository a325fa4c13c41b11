use thiserror::Error;

#[derive(Debug, Error)]
pub enum PanelError {
    #[error("Config error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Unknown API namespace: {0}")]
    UnknownNamespace(String),

    #[error("Fetch failed: {0}")]
    Fetch(String),
}
