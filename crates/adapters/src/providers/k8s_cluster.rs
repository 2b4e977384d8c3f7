//! Kubernetes cluster provider
//!
//! Runs a single-server k3s cluster in a container, waits for the API
//! to answer, then extracts the kubeconfig into the drydock home so
//! helm and k8s_config providers can reach the cluster.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use drydock_core::specs::{ClusterSpec, Image, Port};
use drydock_core::{paths, Resource};
use drydock_ports::{
    Clients, ContainerConfig, ContainerRuntime, HttpChecker, Provider, ProviderError,
};

use super::run_checked;

const DEFAULT_IMAGE: &str = "rancher/k3s";
const DEFAULT_VERSION: &str = "v1.27.4-k3s1";
const API_PORT: &str = "6443";
const STARTUP_TIMEOUT: Duration = Duration::from_secs(120);

pub struct K8sClusterProvider {
    resource: Resource,
    spec: ClusterSpec,
    clients: Clients,
}

impl K8sClusterProvider {
    pub fn new(resource: Resource, spec: ClusterSpec, clients: Clients) -> Self {
        Self {
            resource,
            spec,
            clients,
        }
    }

    fn server_name(&self) -> String {
        self.resource.cluster_server_name()
    }

    fn image(&self) -> Image {
        let version = self.spec.version.as_deref().unwrap_or(DEFAULT_VERSION);
        Image {
            name: format!("{DEFAULT_IMAGE}:{version}"),
            ..Default::default()
        }
    }

    async fn write_kubeconfig(&self) -> Result<(), ProviderError> {
        let dir = paths::kubeconfig_dir();
        std::fs::create_dir_all(&dir)
            .map_err(|e| ProviderError::Provider(format!("unable to create {dir:?}: {e}")))?;

        let destination = paths::kubeconfig_path(&self.resource.name);
        let source = format!("{}:/etc/rancher/k3s/k3s.yaml", self.server_name());

        run_checked(
            self.clients.command.as_ref(),
            "docker",
            &["cp", &source, &destination.to_string_lossy()],
        )
        .await?;

        debug!(path = %destination.display(), "kubeconfig written");
        Ok(())
    }
}

#[async_trait]
impl Provider for K8sClusterProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.resource.fqdn(), "creating k8s cluster");

        let runtime: &dyn ContainerRuntime = self.clients.runtime.as_ref();
        let image = self.image();
        runtime.pull_image(&image).await?;

        let mut env: Vec<String> = self
            .spec
            .env
            .iter()
            .map(|e| format!("{}={}", e.key, e.value))
            .collect();
        env.push("K3S_KUBECONFIG_MODE=666".to_string());

        let config = ContainerConfig {
            name: self.server_name(),
            image,
            command: vec!["server".to_string(), "--disable=traefik".to_string()],
            env,
            ports: vec![Port {
                local: API_PORT.to_string(),
                host: None,
            }],
            networks: self.spec.networks.clone(),
            privileged: true,
            ..Default::default()
        };

        runtime.create_container(&config).await?;

        // k3s answers /ping unauthenticated once the API server is up
        let checker: &dyn HttpChecker = self.clients.http.as_ref();
        checker
            .wait_healthy(&format!("https://localhost:{API_PORT}/ping"), STARTUP_TIMEOUT)
            .await?;

        self.write_kubeconfig().await
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.resource.fqdn(), "destroying k8s cluster");

        self.clients
            .runtime
            .remove_container(&self.server_name())
            .await?;

        let kubeconfig = paths::kubeconfig_path(&self.resource.name);
        if kubeconfig.exists() {
            let _ = std::fs::remove_file(kubeconfig);
        }

        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(self
            .clients
            .runtime
            .find_container(&self.server_name())
            .await?
            .into_iter()
            .collect())
    }
}
