//! Output variable provider
//!
//! Outputs carry a value from the config into the saved state; there is
//! nothing external to act on.

use async_trait::async_trait;
use tracing::info;

use drydock_core::specs::OutputSpec;
use drydock_ports::{Provider, ProviderError};

pub struct OutputProvider {
    fqdn: String,
    spec: OutputSpec,
}

impl OutputProvider {
    pub fn new(fqdn: String, spec: OutputSpec) -> Self {
        Self { fqdn, spec }
    }
}

#[async_trait]
impl Provider for OutputProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, value = %self.spec.value, "recording output");
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec![self.spec.value.clone()])
    }
}
