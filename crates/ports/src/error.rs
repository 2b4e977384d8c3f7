//! Errors surfaced by client adapters

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("container runtime error: {0}")]
    Runtime(String),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("command '{command}' failed: {message}")]
    Command { command: String, message: String },

    #[error("http check failed: {0}")]
    Http(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
