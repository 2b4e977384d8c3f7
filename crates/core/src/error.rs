//! Error types for the domain core

use thiserror::Error;

/// Result type for domain operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("resource not found: {0}")]
    NotFound(String),

    #[error("duplicate resource: {0}")]
    Duplicate(String),

    #[error("invalid resource reference '{0}', expected '<type>.<name>'")]
    InvalidReference(String),

    #[error("invalid payload for {fqdn}: {source}")]
    Payload {
        fqdn: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),
}
