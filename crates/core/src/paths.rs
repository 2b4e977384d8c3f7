//! Home-directory layout
//!
//! Everything drydock persists lives under a single base directory,
//! resolved from the `DRYDOCK_HOME` environment variable so tests can
//! point it at a scratch dir. Without the override it is `~/.drydock`.

use std::path::PathBuf;

/// Environment variable naming the base directory.
pub const HOME_ENV: &str = "DRYDOCK_HOME";

pub fn home_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(HOME_ENV) {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home).join(".drydock")
}

pub fn state_dir() -> PathBuf {
    home_dir().join("state")
}

pub fn state_path() -> PathBuf {
    state_dir().join("state.json")
}

pub fn kubeconfig_dir() -> PathBuf {
    home_dir().join("kubeconfig")
}

/// Path of the kubeconfig written for a cluster resource.
pub fn kubeconfig_path(cluster_name: &str) -> PathBuf {
    kubeconfig_dir().join(format!("{cluster_name}.yaml"))
}

pub fn helm_charts_dir() -> PathBuf {
    home_dir().join("helm_charts")
}
