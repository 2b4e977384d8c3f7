//! The declared resource and its identity
//!
//! A resource is the unit the orchestrator acts on. Identity across runs
//! is the FQDN `<name>.<type>.<suffix>`; dependencies are declared as
//! `<type>.<name>` references. The type-specific payload is kept opaque
//! here and captured as a flattened JSON map so state files round-trip
//! fields this crate does not model.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{CoreError, Result};
use crate::status::Status;

/// Suffix appended to every FQDN. Container names created by providers
/// carry it too, which is how the log tailer finds them.
pub const FQDN_SUFFIX: &str = "drydock.dev";

/// The resource kinds the factory can bind to a provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceType {
    Network,
    Container,
    ImageCache,
    K8sCluster,
    NomadCluster,
    Helm,
    K8sConfig,
    Ingress,
    Output,
    Template,
    Certificate,
    Copy,
}

impl ResourceType {
    /// The identifier used in config documents, state files and
    /// dependency references.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::Network => "network",
            ResourceType::Container => "container",
            ResourceType::ImageCache => "image_cache",
            ResourceType::K8sCluster => "k8s_cluster",
            ResourceType::NomadCluster => "nomad_cluster",
            ResourceType::Helm => "helm",
            ResourceType::K8sConfig => "k8s_config",
            ResourceType::Ingress => "ingress",
            ResourceType::Output => "output",
            ResourceType::Template => "template",
            ResourceType::Certificate => "certificate",
            ResourceType::Copy => "copy",
        }
    }

    /// The segment used inside FQDNs; underscores become dashes there.
    pub fn fqdn_segment(&self) -> &'static str {
        match self {
            ResourceType::ImageCache => "image-cache",
            ResourceType::K8sCluster => "k8s-cluster",
            ResourceType::NomadCluster => "nomad-cluster",
            ResourceType::K8sConfig => "k8s-config",
            other => other.as_str(),
        }
    }
}

impl std::fmt::Display for ResourceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ResourceType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| CoreError::InvalidReference(s.to_string()))
    }
}

/// Parse a `<type>.<name>` dependency reference.
pub fn parse_reference(reference: &str) -> Result<(ResourceType, &str)> {
    let (rtype, name) = reference
        .split_once('.')
        .ok_or_else(|| CoreError::InvalidReference(reference.to_string()))?;

    if name.is_empty() {
        return Err(CoreError::InvalidReference(reference.to_string()));
    }

    Ok((rtype.parse()?, name))
}

/// Strip the trailing `.<suffix>` from an FQDN, yielding the short name
/// used as the log prefix.
pub fn strip_fqdn_suffix(fqdn: &str) -> &str {
    fqdn.strip_suffix(FQDN_SUFFIX)
        .and_then(|s| s.strip_suffix('.'))
        .unwrap_or(fqdn)
}

/// A declared resource plus its orchestration bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Resource {
    pub name: String,

    #[serde(rename = "type")]
    pub rtype: ResourceType,

    #[serde(default)]
    pub status: Status,

    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub disabled: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,

    /// Status the resource carried in the prior state, before merging.
    /// In-memory only; the transition policy needs it to reconcile
    /// disabled resources that were applied by an earlier run.
    #[serde(skip)]
    pub prior_status: Option<Status>,

    /// Type-specific payload, opaque to the orchestrator.
    #[serde(flatten)]
    pub payload: Map<String, Value>,
}

impl Resource {
    pub fn new(name: impl Into<String>, rtype: ResourceType) -> Self {
        Self {
            name: name.into(),
            rtype,
            status: Status::PendingCreation,
            disabled: false,
            depends_on: Vec::new(),
            prior_status: None,
            payload: Map::new(),
        }
    }

    /// Identity key across runs: `<name>.<type>.<suffix>`.
    pub fn fqdn(&self) -> String {
        format!("{}.{}.{}", self.name, self.rtype.fqdn_segment(), FQDN_SUFFIX)
    }

    /// The `<type>.<name>` form other resources use in `depends_on`.
    pub fn reference(&self) -> String {
        format!("{}.{}", self.rtype, self.name)
    }

    /// Name of the server container a cluster resource runs. Only
    /// meaningful for `k8s_cluster` and `nomad_cluster` resources.
    pub fn cluster_server_name(&self) -> String {
        format!("server.{}", self.fqdn())
    }

    /// Name of the `index`th client container of a nomad cluster;
    /// clients are indexed from 1.
    pub fn cluster_client_name(&self, index: usize) -> String {
        format!("{index}.client.{}", self.fqdn())
    }

    /// Deserialize the opaque payload into a typed spec.
    pub fn spec<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(Value::Object(self.payload.clone())).map_err(|source| {
            CoreError::Payload {
                fqdn: self.fqdn(),
                source,
            }
        })
    }
}
