//! Network provider

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use drydock_core::specs::NetworkSpec;
use drydock_ports::{ContainerRuntime, Provider, ProviderError};

pub struct NetworkProvider {
    fqdn: String,
    spec: NetworkSpec,
    runtime: Arc<dyn ContainerRuntime>,
}

impl NetworkProvider {
    pub fn new(fqdn: String, spec: NetworkSpec, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            fqdn,
            spec,
            runtime,
        }
    }
}

#[async_trait]
impl Provider for NetworkProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, subnet = %self.spec.subnet, "creating network");

        if self.runtime.find_network(&self.fqdn).await?.is_some() {
            debug!(reference = %self.fqdn, "network already exists");
            return Ok(());
        }

        self.runtime
            .create_network(&self.fqdn, &self.spec.subnet)
            .await?;

        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "destroying network");
        self.runtime.remove_network(&self.fqdn).await?;
        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self
            .runtime
            .find_network(&self.fqdn)
            .await?
            .into_iter()
            .collect())
    }
}
