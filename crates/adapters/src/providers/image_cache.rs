//! Image cache provider
//!
//! Runs the single pull-through registry container the orchestrator
//! synthesizes per run. Image pulls from clusters and containers are
//! pointed at it so repeated runs do not hammer the upstream registry.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info};

use drydock_core::paths;
use drydock_core::specs::{Image, ImageCacheSpec, NetworkAttachment, Volume};
use drydock_ports::{ContainerConfig, ContainerRuntime, Provider, ProviderError};

const CACHE_IMAGE: &str = "registry:2.8";
const UPSTREAM: &str = "https://registry-1.docker.io";

pub struct ImageCacheProvider {
    fqdn: String,
    spec: ImageCacheSpec,
    runtime: Arc<dyn ContainerRuntime>,
}

impl ImageCacheProvider {
    pub fn new(fqdn: String, spec: ImageCacheSpec, runtime: Arc<dyn ContainerRuntime>) -> Self {
        Self {
            fqdn,
            spec,
            runtime,
        }
    }
}

#[async_trait]
impl Provider for ImageCacheProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "creating image cache");

        // the cache survives destroys of everything else; reuse it
        if self.runtime.find_container(&self.fqdn).await?.is_some() {
            debug!(reference = %self.fqdn, "image cache already running");
            return Ok(());
        }

        let image = Image {
            name: CACHE_IMAGE.to_string(),
            ..Default::default()
        };
        self.runtime.pull_image(&image).await?;

        let cache_dir = paths::home_dir().join("images");
        std::fs::create_dir_all(&cache_dir)
            .map_err(|e| ProviderError::Provider(format!("unable to create cache dir: {e}")))?;

        let config = ContainerConfig {
            name: self.fqdn.clone(),
            image,
            env: vec![format!("REGISTRY_PROXY_REMOTEURL={UPSTREAM}")],
            volumes: vec![Volume {
                source: cache_dir.to_string_lossy().to_string(),
                destination: "/var/lib/registry".to_string(),
            }],
            networks: self
                .spec
                .networks
                .iter()
                .map(|name| NetworkAttachment {
                    name: name.clone(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        };

        self.runtime.create_container(&config).await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "destroying image cache");
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
