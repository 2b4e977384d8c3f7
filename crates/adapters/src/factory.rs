//! Default provider factory
//!
//! The single place a resource type is bound to an implementation.
//! Dependencies a provider needs are resolved here, against the merged
//! set: network references become runtime network names, cluster
//! references become kubeconfig paths, ingress targets become upstream
//! container names.

use std::sync::Arc;

use drydock_core::specs::{
    CertificateSpec, ClusterSpec, ContainerSpec, CopySpec, HelmSpec, ImageCacheSpec, IngressSpec,
    K8sConfigSpec, NetworkAttachment, NetworkSpec, OutputSpec, TemplateSpec,
};
use drydock_core::{paths, Resource, ResourceSet, ResourceType};
use drydock_ports::{Clients, Provider, ProviderError, ProviderFactory};

use crate::command::TokioCommandRunner;
use crate::docker::DockerRuntime;
use crate::http::ReqwestChecker;
use crate::providers::{
    CertificateProvider, ContainerProvider, CopyProvider, HelmProvider, ImageCacheProvider,
    IngressProvider, K8sClusterProvider, K8sConfigProvider, NetworkProvider, NomadClusterProvider,
    OutputProvider, TemplateProvider,
};

/// Build the production client bundle: Docker over the local socket,
/// subprocesses via tokio, health checks via reqwest.
pub fn new_clients() -> Result<Clients, drydock_ports::ClientError> {
    Ok(Clients {
        runtime: Arc::new(DockerRuntime::connect()?),
        command: Arc::new(TokioCommandRunner),
        http: Arc::new(ReqwestChecker::new()),
    })
}

pub struct DefaultProviderFactory {
    clients: Clients,
}

impl DefaultProviderFactory {
    pub fn new(clients: Clients) -> Self {
        Self { clients }
    }
}

impl ProviderFactory for DefaultProviderFactory {
    fn provider_for(
        &self,
        resource: &Resource,
        set: &ResourceSet,
    ) -> Result<Arc<dyn Provider>, ProviderError> {
        let fqdn = resource.fqdn();
        let runtime = self.clients.runtime.clone();

        let provider: Arc<dyn Provider> = match resource.rtype {
            ResourceType::Network => {
                let spec: NetworkSpec = resource.spec()?;
                Arc::new(NetworkProvider::new(fqdn, spec, runtime))
            }

            ResourceType::Container => {
                let mut spec: ContainerSpec = resource.spec()?;
                resolve_attachments(&mut spec.networks, set)?;
                Arc::new(ContainerProvider::new(fqdn, spec, runtime))
            }

            ResourceType::ImageCache => {
                let mut spec: ImageCacheSpec = resource.spec()?;
                for name in &mut spec.networks {
                    *name = set.find_dependent_resource(name)?.fqdn();
                }
                Arc::new(ImageCacheProvider::new(fqdn, spec, runtime))
            }

            ResourceType::K8sCluster => {
                let mut spec: ClusterSpec = resource.spec()?;
                resolve_attachments(&mut spec.networks, set)?;
                Arc::new(K8sClusterProvider::new(
                    resource.clone(),
                    spec,
                    self.clients.clone(),
                ))
            }

            ResourceType::NomadCluster => {
                let mut spec: ClusterSpec = resource.spec()?;
                resolve_attachments(&mut spec.networks, set)?;
                Arc::new(NomadClusterProvider::new(
                    resource.clone(),
                    spec,
                    self.clients.clone(),
                ))
            }

            ResourceType::Helm => {
                let spec: HelmSpec = resource.spec()?;
                let cluster = set.find_dependent_resource(&spec.cluster)?;
                let kubeconfig = paths::kubeconfig_path(&cluster.name);
                Arc::new(HelmProvider::new(
                    fqdn,
                    spec,
                    kubeconfig,
                    self.clients.clone(),
                ))
            }

            ResourceType::K8sConfig => {
                let spec: K8sConfigSpec = resource.spec()?;
                let cluster = set.find_dependent_resource(&spec.cluster)?;
                let kubeconfig = paths::kubeconfig_path(&cluster.name);
                Arc::new(K8sConfigProvider::new(
                    fqdn,
                    spec,
                    kubeconfig,
                    self.clients.clone(),
                ))
            }

            ResourceType::Ingress => {
                let spec: IngressSpec = resource.spec()?;
                let target = set.find_dependent_resource(&spec.target)?;
                let upstream = match target.rtype {
                    ResourceType::K8sCluster | ResourceType::NomadCluster => {
                        target.cluster_server_name()
                    }
                    _ => target.fqdn(),
                };
                Arc::new(IngressProvider::new(fqdn, spec, upstream, runtime))
            }

            ResourceType::Output => {
                let spec: OutputSpec = resource.spec()?;
                Arc::new(OutputProvider::new(fqdn, spec))
            }

            ResourceType::Template => {
                let spec: TemplateSpec = resource.spec()?;
                Arc::new(TemplateProvider::new(fqdn, spec))
            }

            ResourceType::Certificate => {
                let spec: CertificateSpec = resource.spec()?;
                Arc::new(CertificateProvider::new(fqdn, spec, self.clients.clone()))
            }

            ResourceType::Copy => {
                let spec: CopySpec = resource.spec()?;
                Arc::new(CopyProvider::new(fqdn, spec))
            }
        };

        Ok(provider)
    }
}

/// Network attachments are declared as `network.<name>` references; the
/// runtime knows networks by FQDN.
fn resolve_attachments(
    attachments: &mut [NetworkAttachment],
    set: &ResourceSet,
) -> Result<(), ProviderError> {
    for attachment in attachments {
        attachment.name = set.find_dependent_resource(&attachment.name)?.fqdn();
    }
    Ok(())
}
