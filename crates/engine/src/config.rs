//! Declarative config loading
//!
//! A config is a YAML document (or a directory of them) with an optional
//! `blueprint` block and a `resources` list. `${name}` placeholders are
//! substituted from caller-supplied variables and a vars file before
//! parsing. Loading never touches providers or the outside world.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::debug;

use drydock_core::specs::HelmSpec;
use drydock_core::{parse_reference, Blueprint, Resource, ResourceSet, ResourceType};

use crate::error::{EngineError, Result};

/// Result of parsing a config path.
#[derive(Debug, Clone, Default)]
pub struct ParsedConfig {
    pub blueprint: Option<Blueprint>,
    pub resources: ResourceSet,
}

#[derive(Debug, Deserialize)]
struct ConfigDocument {
    #[serde(default)]
    blueprint: Option<Blueprint>,
    #[serde(default)]
    resources: Vec<Resource>,
}

/// Parse a config file or directory without variable injection.
pub fn load_config(path: impl AsRef<Path>) -> Result<ParsedConfig> {
    load_config_with_variables(path, &HashMap::new(), None)
}

/// Parse a config file or directory. Variables from `vars` override
/// variables of the same name from `vars_file`.
pub fn load_config_with_variables(
    path: impl AsRef<Path>,
    vars: &HashMap<String, String>,
    vars_file: Option<&Path>,
) -> Result<ParsedConfig> {
    let path = path.as_ref();

    let mut variables = match vars_file {
        Some(f) => load_vars_file(f)?,
        None => HashMap::new(),
    };
    variables.extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));

    let files = config_files(path)?;
    if files.is_empty() {
        return Err(EngineError::Config(format!(
            "no config files found at {}",
            path.display()
        )));
    }

    let mut blueprint = None;
    let mut resources = ResourceSet::new();

    for file in files {
        debug!(file = %file.display(), "parsing config");

        let raw = std::fs::read_to_string(&file).map_err(|e| {
            EngineError::Config(format!("unable to read {}: {e}", file.display()))
        })?;
        let substituted = substitute(&raw, &variables);

        let doc: ConfigDocument = serde_yaml::from_str(&substituted).map_err(|e| {
            EngineError::Config(format!("unable to parse {}: {e}", file.display()))
        })?;

        if blueprint.is_none() {
            blueprint = doc.blueprint;
        }

        for resource in doc.resources {
            resources
                .add(resource)
                .map_err(|e| EngineError::Config(e.to_string()))?;
        }
    }

    validate(&resources)?;

    Ok(ParsedConfig {
        blueprint,
        resources,
    })
}

fn config_files(path: &Path) -> Result<Vec<std::path::PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }

    if path.is_dir() {
        let mut files: Vec<_> = std::fs::read_dir(path)
            .map_err(|e| EngineError::Config(format!("unable to read {}: {e}", path.display())))?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| {
                matches!(
                    p.extension().and_then(|e| e.to_str()),
                    Some("yaml") | Some("yml")
                )
            })
            .collect();
        files.sort();
        return Ok(files);
    }

    Err(EngineError::Config(format!(
        "config path {} does not exist",
        path.display()
    )))
}

fn load_vars_file(path: &Path) -> Result<HashMap<String, String>> {
    let raw = std::fs::read_to_string(path).map_err(|e| {
        EngineError::Config(format!("unable to read vars file {}: {e}", path.display()))
    })?;

    let values: HashMap<String, serde_yaml::Value> = serde_yaml::from_str(&raw).map_err(|e| {
        EngineError::Config(format!("unable to parse vars file {}: {e}", path.display()))
    })?;

    Ok(values
        .into_iter()
        .map(|(k, v)| {
            let rendered = match v {
                serde_yaml::Value::String(s) => s,
                serde_yaml::Value::Bool(b) => b.to_string(),
                serde_yaml::Value::Number(n) => n.to_string(),
                other => serde_yaml::to_string(&other).unwrap_or_default().trim().to_string(),
            };
            (k, rendered)
        })
        .collect())
}

/// Replace `${name}` for every known variable; unknown placeholders are
/// left for downstream consumers (templates have their own vars).
fn substitute(source: &str, vars: &HashMap<String, String>) -> String {
    let mut out = source.to_string();
    for (key, value) in vars {
        out = out.replace(&format!("${{{key}}}"), value);
    }
    out
}

fn validate(resources: &ResourceSet) -> Result<()> {
    for resource in resources.iter() {
        for reference in &resource.depends_on {
            parse_reference(reference)
                .map_err(|e| EngineError::Config(format!("{}: {e}", resource.fqdn())))?;
        }

        if resource.rtype == ResourceType::Helm {
            let spec: HelmSpec = resource
                .spec()
                .map_err(|e| EngineError::Config(e.to_string()))?;
            if spec.retry == 0 {
                return Err(EngineError::Config(format!(
                    "{}: retry must be at least 1",
                    resource.fqdn()
                )));
            }
        }
    }

    Ok(())
}
