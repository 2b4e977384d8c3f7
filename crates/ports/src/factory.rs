//! Provider factory seam
//!
//! The single place a resource type is bound to an implementation. The
//! engine resolves a provider per node through this trait; tests inject
//! factories that return recording mocks.

use std::sync::Arc;

use drydock_core::{Resource, ResourceSet};

use crate::provider::{Provider, ProviderError};

pub trait ProviderFactory: Send + Sync {
    /// Produce the provider for one resource. The full merged set is
    /// available so providers can resolve the resources they depend on
    /// (a helm release finding its cluster's kubeconfig, for example).
    fn provider_for(
        &self,
        resource: &Resource,
        set: &ResourceSet,
    ) -> Result<Arc<dyn Provider>, ProviderError>;
}
