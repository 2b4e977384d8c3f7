//! Persisted state snapshot
//!
//! The state file is the record of what exists on the machine:
//! `{ "blueprint": ..., "resources": [...] }` under the drydock home.
//! Loads of a missing file yield an empty document so a first run and a
//! fully destroyed run look the same. Saves go through a temp file and a
//! rename so a crash cannot leave a half-written snapshot.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use drydock_core::{paths, Blueprint, ResourceSet};

use crate::error::{EngineError, Result};

/// Top level of the state file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateDocument {
    #[serde(default)]
    pub blueprint: Option<Blueprint>,

    #[serde(default)]
    pub resources: ResourceSet,
}

impl StateDocument {
    /// Load from the default state path.
    pub fn load() -> Result<Self> {
        Self::load_from(paths::state_path())
    }

    /// Load from an explicit path. A missing file is an empty document,
    /// not an error; an unreadable or unparsable file is.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let contents = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no prior state");
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(EngineError::State(format!(
                    "unable to read {}: {e}",
                    path.display()
                )))
            }
        };

        serde_json::from_str(&contents).map_err(|e| {
            EngineError::State(format!("unable to parse {}: {e}", path.display()))
        })
    }

    /// Save to the default state path.
    pub fn save(&self) -> Result<()> {
        self.save_to(paths::state_path())
    }

    /// Save atomically: write a sibling temp file, then rename it over
    /// the target.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                EngineError::State(format!("unable to create {}: {e}", dir.display()))
            })?;
        }

        let contents = serde_json::to_string_pretty(self)
            .map_err(|e| EngineError::State(format!("unable to serialize state: {e}")))?;

        let tmp: PathBuf = path.with_extension("json.tmp");
        std::fs::write(&tmp, contents).map_err(|e| {
            EngineError::State(format!("unable to write {}: {e}", tmp.display()))
        })?;

        std::fs::rename(&tmp, path).map_err(|e| {
            EngineError::State(format!("unable to replace {}: {e}", path.display()))
        })?;

        debug!(path = %path.display(), resources = self.resources.len(), "state saved");
        Ok(())
    }
}
