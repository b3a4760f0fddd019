use thiserror::Error;

/// Errors surfaced by the trading loop and its collaborators
#[derive(Debug, Error)]
pub enum BotError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{service} API error ({status}): {message}")]
    Api {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Failed to parse {what}: {detail}")]
    Parse { what: &'static str, detail: String },

    #[error("Insufficient data: {have} candles, need {need}")]
    InsufficientData { have: usize, need: usize },

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Halted after {failures} consecutive failed cycles")]
    Halted { failures: u32 },
}

/// Failures while writing the position store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to write position store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to encode positions: {0}")]
    Encode(#[from] serde_json::Error),
}

impl From<config::ConfigError> for BotError {
    fn from(e: config::ConfigError) -> Self {
        BotError::Config(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BotError>;
