//! Kubernetes config provider
//!
//! Applies manifest files to a dependent cluster through kubectl.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use drydock_core::specs::K8sConfigSpec;
use drydock_ports::{Clients, Provider, ProviderError};

use super::run_checked;

pub struct K8sConfigProvider {
    fqdn: String,
    spec: K8sConfigSpec,
    kubeconfig: PathBuf,
    clients: Clients,
}

impl K8sConfigProvider {
    pub fn new(fqdn: String, spec: K8sConfigSpec, kubeconfig: PathBuf, clients: Clients) -> Self {
        Self {
            fqdn,
            spec,
            kubeconfig,
            clients,
        }
    }
}

#[async_trait]
impl Provider for K8sConfigProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, paths = ?self.spec.paths, "applying kubernetes config");

        let kubeconfig = self.kubeconfig.to_string_lossy().to_string();

        for path in &self.spec.paths {
            let mut args = vec![
                "apply",
                "--kubeconfig",
                kubeconfig.as_str(),
                "--filename",
                path.as_str(),
            ];
            if self.spec.wait_until_ready {
                args.push("--wait=true");
            }

            run_checked(self.clients.command.as_ref(), "kubectl", &args).await?;
        }

        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "removing kubernetes config");

        let kubeconfig = self.kubeconfig.to_string_lossy().to_string();

        for path in &self.spec.paths {
            // deleting objects that are already gone is fine
            if let Err(e) = run_checked(
                self.clients.command.as_ref(),
                "kubectl",
                &[
                    "delete",
                    "--kubeconfig",
                    kubeconfig.as_str(),
                    "--filename",
                    path.as_str(),
                    "--ignore-not-found=true",
                ],
            )
            .await
            {
                debug!(reference = %self.fqdn, error = %e, "ignoring kubectl delete failure");
            }
        }

        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}
