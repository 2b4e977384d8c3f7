//! Certificate provider
//!
//! Generates a self-signed certificate and key pair on disk, shelling
//! out to openssl.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::info;

use drydock_core::specs::CertificateSpec;
use drydock_ports::{Clients, Provider, ProviderError};

use super::run_checked;

pub struct CertificateProvider {
    fqdn: String,
    spec: CertificateSpec,
    clients: Clients,
}

impl CertificateProvider {
    pub fn new(fqdn: String, spec: CertificateSpec, clients: Clients) -> Self {
        Self {
            fqdn,
            spec,
            clients,
        }
    }

    fn key_path(&self) -> PathBuf {
        Path::new(&self.spec.output).join(format!("{}.key", self.spec.common_name))
    }

    fn cert_path(&self) -> PathBuf {
        Path::new(&self.spec.output).join(format!("{}.cert", self.spec.common_name))
    }
}

#[async_trait]
impl Provider for CertificateProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, common_name = %self.spec.common_name, "creating certificate");

        std::fs::create_dir_all(&self.spec.output).map_err(|e| {
            ProviderError::Provider(format!("unable to create {}: {e}", self.spec.output))
        })?;

        let key = self.key_path().to_string_lossy().to_string();
        let cert = self.cert_path().to_string_lossy().to_string();
        let subject = format!("/CN={}", self.spec.common_name);

        let mut args = vec![
            "req",
            "-x509",
            "-newkey",
            "rsa:2048",
            "-nodes",
            "-days",
            "365",
            "-keyout",
            key.as_str(),
            "-out",
            cert.as_str(),
            "-subj",
            subject.as_str(),
        ];

        let san = if self.spec.sans.is_empty() {
            None
        } else {
            Some(format!(
                "subjectAltName={}",
                self.spec
                    .sans
                    .iter()
                    .map(|s| format!("DNS:{s}"))
                    .collect::<Vec<_>>()
                    .join(",")
            ))
        };
        if let Some(san) = &san {
            args.push("-addext");
            args.push(san.as_str());
        }

        run_checked(self.clients.command.as_ref(), "openssl", &args).await?;
        Ok(())
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "removing certificate");

        for path in [self.key_path(), self.cert_path()] {
            match std::fs::remove_file(&path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(ProviderError::Provider(format!(
                        "unable to remove {}: {e}",
                        path.display()
                    )))
                }
            }
        }

        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(vec![
            self.cert_path().to_string_lossy().to_string(),
            self.key_path().to_string_lossy().to_string(),
        ])
    }
}
