//! Copy provider
//!
//! Copies a file or directory tree to a destination, optionally setting
//! unix permissions on the copied files.

use std::path::Path;

use async_trait::async_trait;
use tracing::info;

use drydock_core::specs::CopySpec;
use drydock_ports::{Provider, ProviderError};

pub struct CopyProvider {
    fqdn: String,
    spec: CopySpec,
}

impl CopyProvider {
    pub fn new(fqdn: String, spec: CopySpec) -> Self {
        Self { fqdn, spec }
    }
}

#[async_trait]
impl Provider for CopyProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(
            reference = %self.fqdn,
            source = %self.spec.source,
            destination = %self.spec.destination,
            "copying"
        );

        let source = Path::new(&self.spec.source).to_path_buf();
        let destination = Path::new(&self.spec.destination).to_path_buf();
        let mode = match &self.spec.permissions {
            Some(p) => Some(u32::from_str_radix(p, 8).map_err(|_| {
                ProviderError::InvalidConfiguration(format!("permissions '{p}' are not octal"))
            })?),
            None => None,
        };

        // plain fs recursion; cheap enough to run on the blocking pool
        tokio::task::spawn_blocking(move || copy_tree(&source, &destination, mode))
            .await
            .map_err(|e| ProviderError::Provider(e.to_string()))?
            .map_err(|e| ProviderError::Provider(e.to_string()))
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "removing copied files");

        let destination = Path::new(&self.spec.destination);
        let result = if destination.is_dir() {
            std::fs::remove_dir_all(destination)
        } else {
            std::fs::remove_file(destination)
        };

        match result {
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

fn copy_tree(source: &Path, destination: &Path, mode: Option<u32>) -> std::io::Result<()> {
    if source.is_dir() {
        std::fs::create_dir_all(destination)?;
        for entry in std::fs::read_dir(source)? {
            let entry = entry?;
            copy_tree(&entry.path(), &destination.join(entry.file_name()), mode)?;
        }
        return Ok(());
    }

    if let Some(dir) = destination.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::copy(source, destination)?;

    #[cfg(unix)]
    if let Some(mode) = mode {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(destination, std::fs::Permissions::from_mode(mode))?;
    }

    Ok(())
}
