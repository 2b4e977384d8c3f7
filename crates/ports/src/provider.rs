//! The per-resource provider contract
//!
//! A provider is the actuator for one resource. The orchestrator never
//! switches on resource type; it only calls the three operations below
//! and records the outcome.

use async_trait::async_trait;
use thiserror::Error;

use crate::error::ClientError;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error(transparent)]
    Core(#[from] drydock_core::CoreError),

    #[error(transparent)]
    Client(#[from] ClientError),
}

/// Lifecycle operations for a single resource.
///
/// `create` is called at most once per visit for a resource whose status
/// demands it. `destroy` must tolerate partially-created resources and
/// may succeed on "already gone". `lookup` enumerates the external IDs
/// the provider knows for the resource and is diagnostic only.
#[async_trait]
pub trait Provider: Send + Sync {
    async fn create(&self) -> Result<(), ProviderError>;

    async fn destroy(&self) -> Result<(), ProviderError>;

    async fn lookup(&self) -> Result<Vec<String>, ProviderError>;
}
