//! The orchestrator
//!
//! Drives the resource graph using the state store, the status policy
//! and the provider factory: merge the parsed declaration with prior
//! state, synthesize the image cache, walk the graph with a bounded
//! task pool, record per-resource outcomes, and persist the snapshot
//! whether or not the walk succeeded.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::{info, warn};

use drydock_core::{
    apply_action, destroy_action, Action, Blueprint, Resource, ResourceSet, ResourceType, Status,
};
use drydock_ports::{Clients, Provider, ProviderFactory};

use crate::config::{load_config_with_variables, ParsedConfig};
use crate::error::{EngineError, Result};
use crate::graph::{ResourceGraph, WalkOptions};
use crate::merge::merge;
use crate::state::StateDocument;

/// Name of the pull-through registry synthesized for each run.
pub const IMAGE_CACHE_NAME: &str = "docker-cache";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper bound on concurrently running visits; the effective pool
    /// is never larger than the number of graph leaves.
    pub max_parallel: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { max_parallel: 8 }
    }
}

/// Which way a walk drives providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Apply,
    Destroy,
}

pub struct Engine {
    clients: Clients,
    factory: Arc<dyn ProviderFactory>,
    config: EngineConfig,
    cancel: watch::Sender<bool>,
    /// The set of the most recent parse, apply or destroy.
    resources: Mutex<ResourceSet>,
}

impl Engine {
    pub fn new(clients: Clients, factory: Arc<dyn ProviderFactory>) -> Self {
        Self::with_config(clients, factory, EngineConfig::default())
    }

    pub fn with_config(
        clients: Clients,
        factory: Arc<dyn ProviderFactory>,
        config: EngineConfig,
    ) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            clients,
            factory,
            config,
            cancel,
            resources: Mutex::new(ResourceSet::new()),
        }
    }

    /// The client bundle providers are built with.
    pub fn clients(&self) -> &Clients {
        &self.clients
    }

    /// Ask in-flight visits to wind down and stop all new scheduling.
    pub fn cancel(&self) {
        let _ = self.cancel.send(true);
    }

    pub fn resource_count_for_type(&self, rtype: ResourceType) -> usize {
        self.resources.lock().resource_count_for_type(rtype)
    }

    /// Parse only; never instantiates providers or touches the runtime.
    pub fn parse_config(&self, config_path: impl AsRef<Path>) -> Result<ParsedConfig> {
        self.parse_config_with_variables(config_path, &HashMap::new(), None)
    }

    pub fn parse_config_with_variables(
        &self,
        config_path: impl AsRef<Path>,
        vars: &HashMap<String, String>,
        vars_file: Option<&Path>,
    ) -> Result<ParsedConfig> {
        let parsed = load_config_with_variables(config_path, vars, vars_file)?;
        *self.resources.lock() = parsed.resources.clone();
        Ok(parsed)
    }

    /// Bring the world into conformance with the config at `config_path`
    /// plus the prior state. An empty path applies the prior state alone,
    /// which is how interrupted runs are resumed.
    pub async fn apply(&self, config_path: &str) -> Result<Option<Blueprint>> {
        self.apply_with_variables(config_path, &HashMap::new(), None)
            .await
    }

    pub async fn apply_with_variables(
        &self,
        config_path: &str,
        vars: &HashMap<String, String>,
        vars_file: Option<&Path>,
    ) -> Result<Option<Blueprint>> {
        let _ = self.cancel.send(false);

        let parsed = if config_path.is_empty() {
            ParsedConfig::default()
        } else {
            load_config_with_variables(config_path, vars, vars_file)?
        };

        let prior = StateDocument::load()?;
        let mut merged = merge(parsed.resources, &prior.resources);
        ensure_image_cache(&mut merged);

        let graph = ResourceGraph::build(&merged)?;
        info!(resources = merged.len(), "applying configuration");

        let shared = Arc::new(Mutex::new(merged));
        let report = graph
            .walk_forward(
                WalkOptions {
                    max_parallel: self.config.max_parallel,
                    halt_on_error: true,
                },
                self.cancel.subscribe(),
                self.visit(shared.clone(), Phase::Apply),
            )
            .await;

        let resources = shared.lock().clone();
        *self.resources.lock() = resources.clone();

        let blueprint = parsed.blueprint.or(prior.blueprint);
        let document = StateDocument {
            blueprint: blueprint.clone(),
            resources,
        };
        let saved = document.save();

        report.into_first_error()?;
        saved?;

        Ok(blueprint)
    }

    /// Tear down, dependents first. With `force` a failed destroy is
    /// logged and the walk keeps going; the first error is still
    /// returned so the caller knows the teardown was incomplete.
    pub async fn destroy(&self, config_path: &str, force: bool) -> Result<()> {
        let _ = self.cancel.send(false);

        let parsed = if config_path.is_empty() {
            ParsedConfig::default()
        } else {
            load_config_with_variables(config_path, &HashMap::new(), None)?
        };

        let prior = StateDocument::load()?;
        let merged = merge(parsed.resources, &prior.resources);

        let graph = ResourceGraph::build(&merged)?;
        info!(resources = merged.len(), force, "destroying resources");

        let shared = Arc::new(Mutex::new(merged));
        let report = graph
            .walk_reverse(
                WalkOptions {
                    max_parallel: self.config.max_parallel,
                    halt_on_error: !force,
                },
                self.cancel.subscribe(),
                self.visit(shared.clone(), Phase::Destroy),
            )
            .await;

        let resources = shared.lock().clone();
        *self.resources.lock() = resources.clone();

        let document = StateDocument {
            blueprint: if resources.is_empty() {
                None
            } else {
                prior.blueprint
            },
            resources,
        };
        let saved = document.save();

        report.into_first_error()?;
        saved?;

        Ok(())
    }

    /// Build the per-node visit closure for one walk. Reads the shared
    /// set for the resource and its dependencies, decides the action
    /// from the status policy, runs the provider, and writes the
    /// outcome back. The shared set is only written here, after the
    /// provider returns.
    fn visit(
        &self,
        shared: Arc<Mutex<ResourceSet>>,
        phase: Phase,
    ) -> impl Fn(String) -> BoxFuture<'static, Result<()>> + Send + Sync {
        let factory = self.factory.clone();

        move |fqdn: String| {
            let factory = factory.clone();
            let shared = shared.clone();

            async move {
                let (resource, snapshot) = {
                    let set = shared.lock();
                    let resource = set
                        .find_by_fqdn(&fqdn)
                        .cloned()
                        .ok_or_else(|| EngineError::UnknownResource(fqdn.clone()))?;
                    (resource, set.clone())
                };

                let action = match phase {
                    Phase::Apply => apply_action(&resource),
                    // a destroy walk always drives the provider, even for
                    // resources that never fully existed; destroy is
                    // tolerant of "already gone" and the node leaves the
                    // state only after it succeeds
                    Phase::Destroy => match destroy_action(&resource) {
                        Action::None => Action::Destroy,
                        other => other,
                    },
                };

                if action == Action::None {
                    return Ok(());
                }

                let provider = factory.provider_for(&resource, &snapshot).map_err(|e| {
                    shared.lock().set_status(&fqdn, Status::Failed);
                    EngineError::Provider {
                        fqdn: fqdn.clone(),
                        message: e.to_string(),
                    }
                })?;

                let result = run_action(&resource, action, provider.as_ref()).await;

                let mut set = shared.lock();
                match (&result, phase, action) {
                    (Ok(()), Phase::Apply, Action::Destroy) => {
                        // reconciled a disabled resource; it stays disabled
                        set.set_status(&fqdn, Status::Disabled);
                    }
                    (Ok(()), Phase::Apply, _) => set.set_status(&fqdn, Status::Applied),
                    (Ok(()), Phase::Destroy, _) => set.remove(&fqdn),
                    (Err(_), _, _) => set.set_status(&fqdn, Status::Failed),
                }

                result.map_err(|message| EngineError::Provider { fqdn, message })
            }
            .boxed()
        }
    }
}

/// Run one action against a provider. Returns the provider's message on
/// failure; the caller owns status bookkeeping.
async fn run_action(
    resource: &Resource,
    action: Action,
    provider: &dyn Provider,
) -> std::result::Result<(), String> {
    let fqdn = resource.fqdn();

    match action {
        Action::None => Ok(()),

        Action::Create => {
            info!(resource = %fqdn, "creating");
            provider.create().await.map_err(|e| e.to_string())
        }

        Action::Destroy => {
            info!(resource = %fqdn, "destroying");
            provider.destroy().await.map_err(|e| e.to_string())
        }

        Action::Replace => {
            info!(resource = %fqdn, "recreating after modification");
            provider.destroy().await.map_err(|e| e.to_string())?;
            provider.create().await.map_err(|e| e.to_string())
        }

        Action::Recover => {
            info!(resource = %fqdn, "recovering failed resource");
            if let Err(e) = provider.destroy().await {
                warn!(resource = %fqdn, error = %e, "cleanup of failed resource did not complete");
            }
            provider.create().await.map_err(|e| e.to_string())
        }
    }
}

/// Synthesize the single image cache and make every container and
/// cluster depend on it, so the cache exists before the first image
/// pull. The cache itself waits for all declared networks.
fn ensure_image_cache(set: &mut ResourceSet) {
    let existing_cache_reference = set
        .iter()
        .find(|r| r.rtype == ResourceType::ImageCache)
        .map(|cache| cache.reference());
    let cache_reference = match existing_cache_reference {
        Some(reference) => reference,
        None => {
            let mut cache = Resource::new(IMAGE_CACHE_NAME, ResourceType::ImageCache);

            let networks: Vec<String> = set
                .iter()
                .filter(|r| r.rtype == ResourceType::Network && !r.disabled)
                .map(|r| r.reference())
                .collect();
            cache.depends_on = networks.clone();
            cache.payload.insert(
                "networks".into(),
                serde_json::Value::Array(
                    networks.into_iter().map(serde_json::Value::String).collect(),
                ),
            );

            let reference = cache.reference();
            // the set cannot already contain this FQDN; we just looked
            let _ = set.add(cache);
            reference
        }
    };

    for resource in set.iter_mut() {
        let pulls_images = matches!(
            resource.rtype,
            ResourceType::Container | ResourceType::K8sCluster | ResourceType::NomadCluster
        );

        if pulls_images && !resource.depends_on.contains(&cache_reference) {
            resource.depends_on.push(cache_reference.clone());
        }
    }
}
