//! Per-type resource providers
//!
//! Each provider implements the three-operation lifecycle contract for
//! one resource type. Providers are constructed by the factory with
//! everything they need resolved up front; they hold no mutable state.

pub mod certificate;
pub mod container;
pub mod copy;
pub mod helm;
pub mod image_cache;
pub mod ingress;
pub mod k8s_cluster;
pub mod k8s_config;
pub mod network;
pub mod nomad_cluster;
pub mod output;
pub mod template;

pub use certificate::CertificateProvider;
pub use container::ContainerProvider;
pub use copy::CopyProvider;
pub use helm::HelmProvider;
pub use image_cache::ImageCacheProvider;
pub use ingress::IngressProvider;
pub use k8s_cluster::K8sClusterProvider;
pub use k8s_config::K8sConfigProvider;
pub use network::NetworkProvider;
pub use nomad_cluster::NomadClusterProvider;
pub use output::OutputProvider;
pub use template::TemplateProvider;

use drydock_ports::{CommandRunner, ProviderError};

/// Run a CLI to completion, turning a non-zero exit into a provider
/// error carrying the command's stderr.
pub(crate) async fn run_checked(
    runner: &dyn CommandRunner,
    program: &str,
    args: &[&str],
) -> Result<String, ProviderError> {
    let output = runner.run(program, args, &[]).await?;

    if !output.success {
        return Err(ProviderError::Provider(format!(
            "{program} failed: {}",
            output.stderr.trim()
        )));
    }

    Ok(output.stdout)
}
