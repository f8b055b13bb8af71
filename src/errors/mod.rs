use thiserror::Error;

#[derive(Debug, Error)]
pub enum ZapdashError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scan engine error: {0}")]
    Engine(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}
