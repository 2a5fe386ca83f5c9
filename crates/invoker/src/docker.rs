use std::collections::HashMap;

use async_trait::async_trait;
use bollard::container::{
    Config, CreateContainerOptions, ListContainersOptions, LogOutput, LogsOptions,
    RemoveContainerOptions, StartContainerOptions, StopContainerOptions,
};
use bollard::models::{ContainerCreateResponse, HostConfig, PortBinding, RestartPolicy,
                      RestartPolicyNameEnum};
use bollard::Docker;
use futures_util::StreamExt;
use slipway_models::{DockerConfig, SlipwayError};
use tracing::{error, info, instrument};

/// Label stamped on every container this tool creates, so `ps` can find them
/// again across process restarts.
pub const MANAGED_LABEL: &str = "dev.slipway.managed";

/// What a container gets created from: the image, a name, the container port
/// the entrypoint binds, and the host port to publish it on (None picks an
/// ephemeral one, which is how N containers from one image coexist).
#[derive(Clone, Debug)]
pub struct CreateSpec {
    pub image: String,
    pub name: String,
    pub container_port: u16,
    pub host_port: Option<u16>,
    pub labels: Vec<(String, String)>,
}

impl Default for CreateSpec {
    fn default() -> Self {
        Self {
            image: "slipway/app:latest".to_string(),
            name: "slipway-test".to_string(),
            container_port: 8000,
            host_port: None,
            labels: vec![],
        }
    }
}

/// Point-in-time view of a container's process, as reported by the engine.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ObservedState {
    pub running: bool,
    pub exit_code: Option<i64>,
}

#[async_trait]
pub trait DockerLike: Send + Sync + 'static {
    async fn create(&self, spec: CreateSpec) -> anyhow::Result<String>; // returns container_id
    async fn start(&self, container_id: &str) -> anyhow::Result<()>;
    async fn stop(&self, container_id: &str, timeout_secs: u64) -> anyhow::Result<()>;
    async fn remove(&self, container_id: &str, force: bool) -> anyhow::Result<()>;
    async fn logs(&self, container_id: &str) -> anyhow::Result<String>;
    async fn inspect_state(&self, container_id: &str) -> anyhow::Result<ObservedState>;
    async fn published_port(
        &self,
        container_id: &str,
        container_port: u16,
    ) -> anyhow::Result<Option<u16>>;
}

/// Bollard-backed launcher: one immutable image in, independent containers
/// out, each with its own writable layer and process instance.
pub struct Launcher {
    docker: Docker,
}

impl Launcher {
    pub fn new(config: &DockerConfig) -> Result<Self, SlipwayError> {
        let docker = if config.host.is_empty() {
            Docker::connect_with_socket_defaults()
        } else {
            Docker::connect_with_socket(&config.host, 120, bollard::API_DEFAULT_VERSION)
        }
        .map_err(|e| SlipwayError::Docker {
            message: e.to_string(),
        })?;

        Ok(Self { docker })
    }

    /// Containers carrying the managed label, running or exited.
    pub async fn list_managed(&self) -> Result<Vec<ManagedContainer>, SlipwayError> {
        let mut filters = HashMap::new();
        filters.insert(
            "label".to_string(),
            vec![format!("{}=true", MANAGED_LABEL)],
        );
        let options = ListContainersOptions {
            all: true,
            filters,
            ..Default::default()
        };

        let summaries = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| SlipwayError::Docker {
                message: e.to_string(),
            })?;

        Ok(summaries
            .into_iter()
            .map(|c| ManagedContainer {
                id: c.id.unwrap_or_default(),
                image: c.image.unwrap_or_default(),
                state: c.state.unwrap_or_default(),
                status: c.status.unwrap_or_default(),
            })
            .collect())
    }
}

/// Row of `ps` output: the engine's view of one managed container.
#[derive(Debug, Clone)]
pub struct ManagedContainer {
    pub id: String,
    pub image: String,
    pub state: String,
    pub status: String,
}

#[async_trait]
impl DockerLike for Launcher {
    #[instrument(skip(self))]
    async fn create(&self, spec: CreateSpec) -> anyhow::Result<String> {
        let port_key = format!("{}/tcp", spec.container_port);

        let mut exposed_ports = HashMap::new();
        exposed_ports.insert(port_key.clone(), HashMap::new());

        let binding = PortBinding {
            host_ip: Some("0.0.0.0".to_string()),
            // Empty host port asks the engine for an ephemeral one.
            host_port: Some(
                spec.host_port
                    .map(|p| p.to_string())
                    .unwrap_or_default(),
            ),
        };
        let mut port_bindings = HashMap::new();
        port_bindings.insert(port_key, Some(vec![binding]));

        let host_config = HostConfig {
            port_bindings: Some(port_bindings),
            // Exit is terminal; supervision belongs to whoever runs us.
            restart_policy: Some(RestartPolicy {
                name: Some(RestartPolicyNameEnum::NO),
                maximum_retry_count: None,
            }),
            ..Default::default()
        };

        let container_config = Config {
            image: Some(spec.image.clone()),
            exposed_ports: Some(exposed_ports),
            host_config: Some(host_config),
            labels: Some(spec.labels.iter().cloned().collect()),
            ..Default::default()
        };

        let options = CreateContainerOptions {
            name: spec.name.clone(),
            ..Default::default()
        };

        let response: ContainerCreateResponse = self
            .docker
            .create_container(Some(options), container_config)
            .await?;

        info!("Created container: {} with ID: {}", spec.name, response.id);
        Ok(response.id)
    }

    #[instrument(skip(self))]
    async fn start(&self, container_id: &str) -> anyhow::Result<()> {
        self.docker
            .start_container(container_id, Some(StartContainerOptions::<String>::default()))
            .await?;

        info!("Started container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stop(&self, container_id: &str, timeout_secs: u64) -> anyhow::Result<()> {
        let options = StopContainerOptions {
            t: timeout_secs as i64,
        };

        self.docker.stop_container(container_id, Some(options)).await?;

        info!("Stopped container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn remove(&self, container_id: &str, force: bool) -> anyhow::Result<()> {
        let options = RemoveContainerOptions {
            force,
            ..Default::default()
        };

        self.docker
            .remove_container(container_id, Some(options))
            .await?;

        info!("Removed container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    async fn logs(&self, container_id: &str) -> anyhow::Result<String> {
        let options = LogsOptions::<String> {
            stdout: true,
            stderr: true,
            timestamps: true,
            ..Default::default()
        };

        let mut stream = self.docker.logs(container_id, Some(options));

        let mut logs = String::new();
        while let Some(log) = stream.next().await {
            match log {
                Ok(LogOutput::StdOut { message })
                | Ok(LogOutput::StdErr { message })
                | Ok(LogOutput::StdIn { message })
                | Ok(LogOutput::Console { message }) => {
                    logs.push_str(&String::from_utf8_lossy(&message));
                }
                Err(e) => {
                    error!("Error reading container logs: {}", e);
                    break;
                }
            }
        }

        Ok(logs)
    }

    #[instrument(skip(self))]
    async fn inspect_state(&self, container_id: &str) -> anyhow::Result<ObservedState> {
        let container = self.docker.inspect_container(container_id, None).await?;
        let state = container.state.unwrap_or_default();
        Ok(ObservedState {
            running: state.running.unwrap_or(false),
            exit_code: state.exit_code,
        })
    }

    #[instrument(skip(self))]
    async fn published_port(
        &self,
        container_id: &str,
        container_port: u16,
    ) -> anyhow::Result<Option<u16>> {
        let container = self.docker.inspect_container(container_id, None).await?;
        let ports = container
            .network_settings
            .and_then(|settings| settings.ports)
            .unwrap_or_default();

        let key = format!("{}/tcp", container_port);
        let host_port = ports
            .get(&key)
            .and_then(|bindings| bindings.as_ref())
            .and_then(|bindings| bindings.first())
            .and_then(|binding| binding.host_port.as_ref())
            .and_then(|p| p.parse().ok());

        Ok(host_port)
    }
}
