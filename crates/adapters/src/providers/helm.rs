//! Helm release provider
//!
//! Installs a chart into a dependent cluster through the helm CLI. The
//! install is attempted up to `retry` times (config validation
//! guarantees `retry >= 1`) and the whole create is bounded by the
//! release timeout, 300s unless the resource sets one.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, info};

use drydock_core::specs::HelmSpec;
use drydock_ports::{Clients, Provider, ProviderError};

use super::run_checked;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

pub struct HelmProvider {
    fqdn: String,
    spec: HelmSpec,
    /// Kubeconfig of the cluster the release targets, resolved by the
    /// factory from the `cluster` reference.
    kubeconfig: PathBuf,
    clients: Clients,
}

impl HelmProvider {
    pub fn new(fqdn: String, spec: HelmSpec, kubeconfig: PathBuf, clients: Clients) -> Self {
        Self {
            fqdn,
            spec,
            kubeconfig,
            clients,
        }
    }

    fn release_name(&self) -> String {
        self.spec
            .chart_name
            .clone()
            .unwrap_or_else(|| sanitize(&self.fqdn))
    }

    fn namespace(&self) -> &str {
        self.spec.namespace.as_deref().unwrap_or("default")
    }

    fn release_timeout(&self) -> Result<Duration, ProviderError> {
        match &self.spec.timeout {
            None => Ok(DEFAULT_TIMEOUT),
            Some(t) => parse_duration(t).ok_or_else(|| {
                ProviderError::InvalidConfiguration(format!("unable to parse timeout '{t}'"))
            }),
        }
    }

    async fn install_once(&self) -> Result<(), ProviderError> {
        let kubeconfig = self.kubeconfig.to_string_lossy().to_string();
        let release = self.release_name();

        let mut args: Vec<String> = vec![
            "upgrade".into(),
            "--install".into(),
            release,
            self.spec.chart.clone(),
            "--kubeconfig".into(),
            kubeconfig,
            "--namespace".into(),
            self.namespace().to_string(),
            "--wait".into(),
        ];

        if self.spec.create_namespace {
            args.push("--create-namespace".into());
        }

        if let Some(values) = &self.spec.values {
            args.push("--values".into());
            args.push(values.clone());
        }

        for (key, value) in &self.spec.values_string {
            args.push("--set".into());
            args.push(format!("{key}={value}"));
        }

        if let Some(repository) = &self.spec.repository {
            args.push("--repo".into());
            args.push(repository.url.clone());
        }

        let borrowed: Vec<&str> = args.iter().map(String::as_str).collect();
        run_checked(self.clients.command.as_ref(), "helm", &borrowed).await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), ProviderError> {
        let Some(check) = &self.spec.health_check else {
            return Ok(());
        };

        let wait = check.timeout.as_deref().unwrap_or("60s");
        let kubeconfig = self.kubeconfig.to_string_lossy().to_string();

        for selector in &check.pods {
            debug!(reference = %self.fqdn, selector, "waiting for pods");
            run_checked(
                self.clients.command.as_ref(),
                "kubectl",
                &[
                    "wait",
                    "--kubeconfig",
                    &kubeconfig,
                    "--namespace",
                    self.namespace(),
                    "--for=condition=Ready",
                    "pod",
                    "--selector",
                    selector,
                    &format!("--timeout={wait}"),
                ],
            )
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl Provider for HelmProvider {
    async fn create(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, chart = %self.spec.chart, "creating helm release");

        let deadline = self.release_timeout()?;

        let install = async {
            let mut last_error = None;

            for attempt in 1..=self.spec.retry.max(1) {
                match self.install_once().await {
                    Ok(()) => return Ok(()),
                    Err(e) => {
                        debug!(reference = %self.fqdn, attempt, error = %e, "chart apply failed");
                        last_error = Some(e);
                    }
                }
            }

            Err(last_error
                .unwrap_or_else(|| ProviderError::Provider("install never attempted".into())))
        };

        timeout(deadline, install).await.map_err(|_| {
            ProviderError::Timeout(format!(
                "helm release '{}' did not complete within {deadline:?}",
                self.fqdn
            ))
        })??;

        self.health_check().await
    }

    async fn destroy(&self) -> Result<(), ProviderError> {
        info!(reference = %self.fqdn, "destroying helm release");

        let kubeconfig = self.kubeconfig.to_string_lossy().to_string();
        let release = self.release_name();

        // an uninstall of a release that never installed is not an error
        if let Err(e) = run_checked(
            self.clients.command.as_ref(),
            "helm",
            &[
                "uninstall",
                &release,
                "--kubeconfig",
                &kubeconfig,
                "--namespace",
                self.namespace(),
            ],
        )
        .await
        {
            debug!(reference = %self.fqdn, error = %e, "ignoring helm uninstall failure");
        }

        Ok(())
    }

    async fn lookup(&self) -> Result<Vec<String>, ProviderError> {
        Ok(Vec::new())
    }
}

/// Replace characters helm rejects in release names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' {
                c
            } else {
                '-'
            }
        })
        .collect::<String>()
        .trim_matches('-')
        .to_lowercase()
}

/// Parse `300s`, `5m` or `1h` shorthand durations.
fn parse_duration(text: &str) -> Option<Duration> {
    let text = text.trim();
    let (value, unit) = text.split_at(text.len().checked_sub(1)?);
    let value: u64 = value.parse().ok()?;

    match unit {
        "s" => Some(Duration::from_secs(value)),
        "m" => Some(Duration::from_secs(value * 60)),
        "h" => Some(Duration::from_secs(value * 3600)),
        _ => None,
    }
}
