//! Ingress provider
//!
//! Exposes ports of a target resource on the host by running a small
//! TCP proxy container attached to the target's networks.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use drydock_core::specs::{Image, IngressSpec};
use drydock_ports::{ContainerConfig, ContainerRuntime, Provider, ProviderError};

const PROXY_IMAGE: &str = "alpine/socat:1.7.4.4";

pub struct IngressProvider {
    fqdn: String,
    spec: IngressSpec,
    /// Runtime name of the target container, resolved by the factory.
    upstream: String,
    runtime: Arc<dyn ContainerRuntime>,
}

impl IngressProvider {
    pub fn new(
        fqdn: String,
        spec: IngressSpec,
        upstream: String,
        runtime: Arc<dyn ContainerRuntime>,
    ) -> Self {
        Self {
            fqdn,
            spec,
            upstream,
            runtime,
        }
    }
}

#[async_trait]
impl Provider for IngressProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, upstream = %self.upstream, "creating ingress");

        let first = self.spec.ports.first().ok_or_else(|| {
            ProviderError::InvalidConfiguration(format!(
                "ingress '{}' declares no ports",
                self.fqdn
            ))
        })?;

        let image = Image {
            name: PROXY_IMAGE.to_string(),
            ..Default::default()
        };
        self.runtime.pull_image(&image).await?;

        let config = ContainerConfig {
            name: self.fqdn.clone(),
            image,
            command: vec![
                format!("tcp-listen:{},fork,reuseaddr", first.local),
                format!("tcp-connect:{}:{}", self.upstream, first.local),
            ],
            ports: self.spec.ports.clone(),
            ..Default::default()
        };

        self.runtime.create_container(&config).await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "destroying ingress");
        self.runtime.remove_container(&self.fqdn).await?;
        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self
            .runtime
            .find_container(&self.fqdn)
            .await?
            .into_iter()
            .collect())
    }
}
