//! Docker-backed container runtime
//!
//! Implements the `ContainerRuntime` port with bollard-next. Container
//! and network names are resource FQDNs, so everything drydock creates
//! can be found again by name on the next run.

use std::collections::HashMap;

use async_trait::async_trait;
use bollard_next::container::{
    Config, CreateContainerOptions, InspectContainerOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard_next::image::CreateImageOptions;
use bollard_next::network::{CreateNetworkOptions, InspectNetworkOptions};
use bollard_next::service::{
    EndpointIpamConfig, EndpointSettings, HostConfig, Ipam, IpamConfig, PortBinding,
};
use bollard_next::Docker;
use futures::{StreamExt, TryStreamExt};
use tracing::{debug, info};

use drydock_core::specs::Image;
use drydock_ports::{
    ClientError, ContainerConfig, ContainerRuntime, LogFrame, LogFrameStream, LogStreamOptions,
    StreamKind,
};

#[derive(Debug, Clone)]
pub struct DockerRuntime {
    docker: Docker,
}

impl DockerRuntime {
    /// Connect with the platform defaults (the local socket on unix).
    pub fn connect() -> Result<Self, ClientError> {
        #[cfg(unix)]
        let docker = Docker::connect_with_socket_defaults()
            .map_err(|e| ClientError::Runtime(format!("unable to connect to Docker: {e}")))?;

        #[cfg(windows)]
        let docker = Docker::connect_with_local_defaults()
            .map_err(|e| ClientError::Runtime(format!("unable to connect to Docker: {e}")))?;

        info!("connected to the Docker runtime");
        Ok(Self { docker })
    }

    pub fn from_client(docker: Docker) -> Self {
        Self { docker }
    }
}

fn is_not_found(e: &bollard_next::errors::Error) -> bool {
    e.to_string().contains("404")
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    async fn pull_image(&self, image: &Image) -> Result<(), ClientError> {
        debug!(image = %image.name, "pulling image");

        let credentials = image.username.as_ref().map(|username| {
            bollard_next::auth::DockerCredentials {
                username: Some(username.clone()),
                password: image.password.clone(),
                ..Default::default()
            }
        });

        let mut stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: image.name.as_str(),
                ..Default::default()
            }),
            None,
            credentials,
        );

        while let Some(progress) = stream.next().await {
            progress.map_err(|e| {
                ClientError::Runtime(format!("unable to pull image '{}': {e}", image.name))
            })?;
        }

        Ok(())
    }

    async fn create_network(&self, name: &str, subnet: &str) -> Result<String, ClientError> {
        let response = self
            .docker
            .create_network(CreateNetworkOptions {
                name: name.to_string(),
                driver: "bridge".to_string(),
                ipam: Ipam {
                    config: Some(vec![IpamConfig {
                        subnet: Some(subnet.to_string()),
                        ..Default::default()
                    }]),
                    ..Default::default()
                },
                ..Default::default()
            })
            .await
            .map_err(|e| ClientError::Runtime(format!("unable to create network '{name}': {e}")))?;

        Ok(response.id.unwrap_or_default())
    }

    async fn remove_network(&self, name: &str) -> Result<(), ClientError> {
        match self.docker.remove_network(name).await {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(ClientError::Runtime(format!(
                "unable to remove network '{name}': {e}"
            ))),
        }
    }

    async fn find_network(&self, name: &str) -> Result<Option<String>, ClientError> {
        match self
            .docker
            .inspect_network(name, None::<InspectNetworkOptions<String>>)
            .await
        {
            Ok(network) => Ok(network.id),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(ClientError::Runtime(format!(
                "unable to inspect network '{name}': {e}"
            ))),
        }
    }

    async fn create_container(&self, config: &ContainerConfig) -> Result<String, ClientError> {
        let env: Vec<String> = config.env.clone();

        let binds: Vec<String> = config
            .volumes
            .iter()
            .map(|v| format!("{}:{}", v.source, v.destination))
            .collect();

        let mut port_bindings = HashMap::new();
        for port in &config.ports {
            let host_port = port.host.clone().unwrap_or_else(|| port.local.clone());
            port_bindings.insert(
                format!("{}/tcp", port.local),
                Some(vec![PortBinding {
                    host_ip: Some("0.0.0.0".to_string()),
                    host_port: Some(host_port),
                }]),
            );
        }

        let mut endpoints = HashMap::new();
        for attachment in &config.networks {
            endpoints.insert(
                attachment.name.clone(),
                EndpointSettings {
                    aliases: if attachment.aliases.is_empty() {
                        None
                    } else {
                        Some(attachment.aliases.clone())
                    },
                    ipam_config: attachment.ip_address.as_ref().map(|ip| EndpointIpamConfig {
                        ipv4_address: Some(ip.clone()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            );
        }

        let container_config = Config {
            image: Some(config.image.name.clone()),
            cmd: if config.command.is_empty() {
                None
            } else {
                Some(config.command.clone())
            },
            env: Some(env),
            host_config: Some(HostConfig {
                binds: if binds.is_empty() { None } else { Some(binds) },
                port_bindings: if port_bindings.is_empty() {
                    None
                } else {
                    Some(port_bindings)
                },
                privileged: Some(config.privileged),
                ..Default::default()
            }),
            networking_config: if endpoints.is_empty() {
                None
            } else {
                Some(bollard_next::container::NetworkingConfig {
                    endpoints_config: endpoints,
                })
            },
            ..Default::default()
        };

        let response = self
            .docker
            .create_container(
                Some(CreateContainerOptions {
                    name: config.name.clone(),
                    ..Default::default()
                }),
                container_config,
            )
            .await
            .map_err(|e| {
                ClientError::Runtime(format!("unable to create container '{}': {e}", config.name))
            })?;

        self.docker
            .start_container::<&str>(&config.name, Some(StartContainerOptions::default()))
            .await
            .map_err(|e| {
                ClientError::Runtime(format!("unable to start container '{}': {e}", config.name))
            })?;

        debug!(container = %config.name, id = %response.id, "container started");
        Ok(response.id)
    }

    async fn remove_container(&self, name: &str) -> Result<(), ClientError> {
        // ignore stop failures; force remove below is what matters
        let _ = self
            .docker
            .stop_container(name, Some(StopContainerOptions { t: 5 }))
            .await;

        match self
            .docker
            .remove_container(
                name,
                Some(RemoveContainerOptions {
                    force: true,
                    ..Default::default()
                }),
            )
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if is_not_found(&e) => Ok(()),
            Err(e) => Err(ClientError::Runtime(format!(
                "unable to remove container '{name}': {e}"
            ))),
        }
    }

    async fn find_container(&self, name: &str) -> Result<Option<String>, ClientError> {
        match self
            .docker
            .inspect_container(name, Some(InspectContainerOptions::default()))
            .await
        {
            Ok(container) => Ok(container.id),
            Err(e) if is_not_found(&e) => Ok(None),
            Err(e) => Err(ClientError::Runtime(format!(
                "unable to inspect container '{name}': {e}"
            ))),
        }
    }

    async fn container_logs(
        &self,
        name: &str,
        options: LogStreamOptions,
    ) -> Result<LogFrameStream, ClientError> {
        // confirm the container exists so a bad name errors here rather
        // than as an empty stream
        if self.find_container(name).await?.is_none() {
            return Err(ClientError::NotFound(name.to_string()));
        }

        let stream = self.docker.logs(
            name,
            Some(LogsOptions::<String> {
                follow: options.follow,
                stdout: options.stdout,
                stderr: options.stderr,
                tail: options.tail.to_string(),
                ..Default::default()
            }),
        );

        let frames = stream
            .map_err(std::io::Error::other)
            .try_filter_map(|output| async move {
                let frame = match output {
                    LogOutput::StdOut { message } | LogOutput::Console { message } => {
                        Some(LogFrame {
                            kind: StreamKind::Stdout,
                            payload: message.to_vec(),
                        })
                    }
                    LogOutput::StdErr { message } => Some(LogFrame {
                        kind: StreamKind::Stderr,
                        payload: message.to_vec(),
                    }),
                    LogOutput::StdIn { .. } => None,
                };
                Ok(frame)
            });

        Ok(Box::pin(frames))
    }
}
