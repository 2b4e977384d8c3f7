//! Container provider

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use drydock_core::specs::ContainerSpec;
use drydock_ports::{ContainerConfig, ContainerRuntime, Provider, ProviderError};

pub struct ContainerProvider {
    fqdn: String,
    spec: ContainerSpec,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ContainerProvider {
    pub fn new(fqdn: String, spec: ContainerSpec, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            fqdn,
            spec,
            runtime,
        }
    }

    fn container_config(&self) -> ContainerConfig {
        ContainerConfig {
            name: self.fqdn.clone(),
            image: self.spec.image.clone(),
            command: self.spec.command.clone(),
            env: self
                .spec
                .env
                .iter()
                .map(|e| format!("{}={}", e.key, e.value))
                .collect(),
            volumes: self.spec.volumes.clone(),
            ports: self.spec.ports.clone(),
            networks: self.spec.networks.clone(),
            privileged: self.spec.privileged.unwrap_or(false),
        }
    }
}

#[async_trait]
impl Provider for ContainerProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, image = %self.spec.image.name, "creating container");

        self.runtime.pull_image(&self.spec.image).await?;
        self.runtime
            .create_container(&self.container_config())
            .await?;

        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "destroying container");
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
