//! Engine error types
//!
//! One enum per the error kinds the engine surfaces: configuration
//! problems are fatal before any action runs, state problems wrap the
//! persisted snapshot, provider failures carry the node they happened
//! on, and cancellation is its own kind so callers can tell an aborted
//! run from a failed one.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("config error: {0}")]
    Config(String),

    #[error("dependency cycle: {0}")]
    Cycle(String),

    #[error("state error: {0}")]
    State(String),

    #[error("resource '{fqdn}' failed: {message}")]
    Provider { fqdn: String, message: String },

    #[error("run cancelled")]
    Cancelled,

    #[error("unknown resource: {0}")]
    UnknownResource(String),

    #[error("no log streams could be opened")]
    NoStreams,

    #[error(transparent)]
    Core(#[from] drydock_core::CoreError),
}
