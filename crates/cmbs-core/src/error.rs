//! Centralized error types for the CMBS pipeline.

use thiserror::Error;

/// Main error type for pipeline operations.
#[derive(Error, Debug)]
pub enum CmbsError {
    #[error("Database error: {0}")]
    Database(#[from] cmbs_db::DbError),

    #[error("Dangling reference: '{from}' points to '{target}' via '{relation}', which is not in the document")]
    DanglingReference {
        from: String,
        relation: String,
        target: String,
    },

    #[error("Invalid graph document: {0}")]
    InvalidDocument(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Config file error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Result type for pipeline operations.
pub type CmbsResult<T> = Result<T, CmbsError>;

impl CmbsError {
    pub fn invalid_document(msg: impl Into<String>) -> Self {
        Self::InvalidDocument(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
