//! HTTP readiness checks backed by reqwest

use std::time::{Duration, Instant};

use async_trait::async_trait;
use tracing::debug;

use drydock_ports::{ClientError, HttpChecker};

const POLL_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct ReqwestChecker {
    client: reqwest::Client,
}

impl ReqwestChecker {
    pub fn new() -> Self {
        // local dev clusters answer with self-signed certificates
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .unwrap_or_default();

        Self { client }
    }
}

impl Default for ReqwestChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl HttpChecker for ReqwestChecker {
    async fn wait_healthy(&self, url: &str, timeout: Duration) -> Result<(), ClientError> {
        let deadline = Instant::now() + timeout;

        loop {
            match self.client.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    debug!(url, "endpoint healthy");
                    return Ok(());
                }
                Ok(response) => {
                    debug!(url, status = %response.status(), "endpoint not ready");
                }
                Err(e) => {
                    debug!(url, error = %e, "endpoint unreachable");
                }
            }

            if Instant::now() >= deadline {
                return Err(ClientError::Http(format!(
                    "timeout after {timeout:?} waiting for {url}"
                )));
            }

            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}
