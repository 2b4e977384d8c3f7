//! Typed views over resource payloads
//!
//! The orchestrator treats payloads as opaque; providers deserialize the
//! view for their type with [`Resource::spec`](crate::Resource::spec).
//! Fields mirror what the config language emits into the state file.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// `network` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkSpec {
    pub subnet: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvVar {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    pub source: String,
    pub destination: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Port {
    pub local: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Attachment of a container to a declared network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkAttachment {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

/// `container` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContainerSpec {
    pub image: Image,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub command: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privileged: Option<bool>,
}

/// `image_cache` payload. The cache is a pull-through registry container
/// attached to every declared network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageCacheSpec {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<String>,
}

/// `k8s_cluster` and `nomad_cluster` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClusterSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub driver: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(default)]
    pub client_nodes: usize,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub networks: Vec<NetworkAttachment>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<EnvVar>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HelmRepository {
    pub name: String,
    pub url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HealthCheck {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http: Option<String>,
}

fn default_retry() -> usize {
    1
}

/// `helm` payload. `retry` must be at least 1; the provider fails after
/// that many attempts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HelmSpec {
    /// Reference to the `k8s_cluster` the release targets.
    pub cluster: String,
    pub chart: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default)]
    pub create_namespace: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub values_string: HashMap<String, String>,
    #[serde(default = "default_retry")]
    pub retry: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub health_check: Option<HealthCheck>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository: Option<HelmRepository>,
}

/// `k8s_config` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct K8sConfigSpec {
    /// Reference to the `k8s_cluster` the manifests apply to.
    pub cluster: String,
    pub paths: Vec<String>,
    #[serde(default)]
    pub wait_until_ready: bool,
}

/// `ingress` payload: exposes a port of a target resource on the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngressSpec {
    /// Reference to the resource traffic is routed to.
    pub target: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ports: Vec<Port>,
}

/// `output` payload: a named value surfaced to the user and kept in state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputSpec {
    pub value: String,
}

/// `template` payload: render a file with variable substitution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemplateSpec {
    pub source: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub vars: HashMap<String, String>,
}

/// `certificate` payload: a self-signed certificate written to disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CertificateSpec {
    pub common_name: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sans: Vec<String>,
}

/// `copy` payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CopySpec {
    pub source: String,
    pub destination: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub permissions: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{Resource, ResourceType};

    #[test]
    fn test_container_spec_from_state_shape() {
        let json = r#"{
            "name": "consul",
            "type": "container",
            "status": "applied",
            "depends_on": ["network.onprem"],
            "image": { "name": "consul:1.8.1" },
            "command": ["consul", "agent"],
            "env": [{ "key": "foo", "value": "bar" }],
            "networks": [{ "name": "network.onprem", "ip_address": "10.6.0.200", "aliases": ["myalias"] }]
        }"#;

        let r: Resource = serde_json::from_str(json).unwrap();
        let spec: ContainerSpec = r.spec().unwrap();

        assert_eq!(spec.image.name, "consul:1.8.1");
        assert_eq!(spec.env[0].key, "foo");
        assert_eq!(spec.networks[0].aliases, vec!["myalias"]);
    }

    #[test]
    fn test_helm_retry_defaults_to_one() {
        let mut r = Resource::new("vault", ResourceType::Helm);
        r.payload
            .insert("cluster".into(), "k8s_cluster.dev".into());
        r.payload.insert("chart".into(), "vault".into());

        let spec: HelmSpec = r.spec().unwrap();
        assert_eq!(spec.retry, 1);
    }

    #[test]
    fn test_cluster_spec_client_nodes() {
        let mut r = Resource::new("dev", ResourceType::NomadCluster);
        r.payload.insert("client_nodes".into(), 2u64.into());

        let spec: ClusterSpec = r.spec().unwrap();
        assert_eq!(spec.client_nodes, 2);
    }
}
