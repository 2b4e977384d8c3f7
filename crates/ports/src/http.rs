//! HTTP readiness seam

use async_trait::async_trait;
use std::time::Duration;

use crate::error::ClientError;

#[async_trait]
pub trait HttpChecker: Send + Sync {
    /// Poll a URL until it answers with a success status or the timeout
    /// elapses.
    async fn wait_healthy(&self, url: &str, timeout: Duration) -> Result<(), ClientError>;
}
