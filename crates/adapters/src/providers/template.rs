//! Template provider
//!
//! Renders a source file to a destination with `${name}` substitution
//! from the template's own vars.

use async_trait::async_trait;
use tracing::info;

use drydock_core::specs::TemplateSpec;
use drydock_ports::{Provider, ProviderError};

pub struct TemplateProvider {
    fqdn: String,
    spec: TemplateSpec,
}

impl TemplateProvider {
    pub fn new(fqdn: String, spec: TemplateSpec) -> Self {
        Self { fqdn, spec }
    }
}

#[async_trait]
impl Provider for TemplateProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, destination = %self.spec.destination, "rendering template");

        let source = tokio::fs::read_to_string(&self.spec.source)
            .await
            .map_err(|e| {
                ProviderError::Provider(format!("unable to read {}: {e}", self.spec.source))
            })?;

        let mut rendered = source;
        for (key, value) in &self.spec.vars {
            rendered = rendered.replace(&format!("${{{key}}}"), value);
        }

        let destination = std::path::Path::new(&self.spec.destination);
        if let Some(dir) = destination.parent() {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                ProviderError::Provider(format!("unable to create {}: {e}", dir.display()))
            })?;
        }

        tokio::fs::write(destination, rendered).await.map_err(|e| {
            ProviderError::Provider(format!("unable to write {}: {e}", self.spec.destination))
        })?;

        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "removing rendered template");

        match tokio::fs::remove_file(&self.spec.destination).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ProviderError::Provider(format!(
                "unable to remove {}: {e}",
                self.spec.destination
            ))),
        }
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec![self.spec.destination.clone()])
    }
}
