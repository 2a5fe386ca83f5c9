use std::collections::HashMap;

use slipway_models::SlipwayError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::docker::{CreateSpec, DockerLike, MANAGED_LABEL};

/// Runtime lifecycle of a launched container. `Exited` and `Killed` are
/// terminal; there is no restart path through this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerStatus {
    Created,
    Running,
    Exited(i64),
    Killed,
}

#[derive(Debug, Clone)]
pub struct ContainerInfo {
    pub container_id: String,
    pub image: String,
    pub created_at: std::time::Instant,
    pub status: ContainerStatus,
}

/// Tracks containers launched from built images. The entrypoint is invoked
/// exactly once per container: `launch` is the only path that starts one, and
/// a terminal status is never left.
pub struct ContainerManager<D: DockerLike> {
    docker: D,
    active_containers: HashMap<String, ContainerInfo>,
    stop_grace_secs: u64,
}

fn docker_err(e: anyhow::Error) -> SlipwayError {
    SlipwayError::Docker {
        message: e.to_string(),
    }
}

impl<D: DockerLike> ContainerManager<D> {
    pub fn new(docker: D, stop_grace_secs: u64) -> Self {
        Self {
            docker,
            active_containers: HashMap::new(),
            stop_grace_secs,
        }
    }

    /// Create a container from `image` and start its recorded entrypoint.
    #[instrument(skip(self))]
    pub async fn launch(
        &mut self,
        image: &str,
        container_port: u16,
        host_port: Option<u16>,
    ) -> Result<String, SlipwayError> {
        let name = format!("slipway-{}", Uuid::new_v4());
        let spec = CreateSpec {
            image: image.to_string(),
            name: name.clone(),
            container_port,
            host_port,
            labels: vec![(MANAGED_LABEL.to_string(), "true".to_string())],
        };

        let container_id = self.docker.create(spec).await.map_err(docker_err)?;
        self.active_containers.insert(
            container_id.clone(),
            ContainerInfo {
                container_id: container_id.clone(),
                image: image.to_string(),
                created_at: std::time::Instant::now(),
                status: ContainerStatus::Created,
            },
        );

        if let Err(e) = self.docker.start(&container_id).await {
            return Err(SlipwayError::RuntimeStart {
                detail: e.to_string(),
            });
        }
        self.set_status(&container_id, ContainerStatus::Running);

        info!("Launched container {} from image {}", container_id, image);
        Ok(container_id)
    }

    /// Re-read the engine's view of the container and fold it into the state
    /// machine. Terminal states stick.
    #[instrument(skip(self))]
    pub async fn refresh(&mut self, container_id: &str) -> Result<ContainerStatus, SlipwayError> {
        let current = self.status(container_id)?;
        match current {
            ContainerStatus::Exited(_) | ContainerStatus::Killed => Ok(current),
            _ => {
                let observed = self
                    .docker
                    .inspect_state(container_id)
                    .await
                    .map_err(docker_err)?;
                let next = if observed.running {
                    ContainerStatus::Running
                } else if let Some(code) = observed.exit_code {
                    ContainerStatus::Exited(code)
                } else {
                    current
                };
                self.set_status(container_id, next);
                Ok(next)
            }
        }
    }

    /// Block until the container's process exits; returns its exit code, the
    /// only exit taxonomy this layer defines.
    #[instrument(skip(self))]
    pub async fn wait_for_exit(
        &mut self,
        container_id: &str,
        timeout_ms: u64,
    ) -> Result<i64, SlipwayError> {
        let deadline = std::time::Instant::now() + std::time::Duration::from_millis(timeout_ms);
        loop {
            match self.refresh(container_id).await? {
                ContainerStatus::Exited(code) => return Ok(code),
                ContainerStatus::Killed => {
                    return Err(SlipwayError::RuntimeStart {
                        detail: format!("container {} was killed while waited on", container_id),
                    })
                }
                _ if std::time::Instant::now() >= deadline => {
                    return Err(SlipwayError::WaitTimeout { timeout_ms })
                }
                _ => tokio::time::sleep(std::time::Duration::from_millis(100)).await,
            }
        }
    }

    /// Operator-initiated termination. Natural exits land in `Exited`; this
    /// lands in `Killed`.
    #[instrument(skip(self))]
    pub async fn stop(&mut self, container_id: &str) -> Result<(), SlipwayError> {
        if let ContainerStatus::Exited(_) = self.status(container_id)? {
            return Ok(());
        }
        self.docker
            .stop(container_id, self.stop_grace_secs)
            .await
            .map_err(docker_err)?;
        self.set_status(container_id, ContainerStatus::Killed);

        info!("Stopped container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn remove(&mut self, container_id: &str) -> Result<(), SlipwayError> {
        self.docker
            .remove(container_id, true)
            .await
            .map_err(docker_err)?;
        self.active_containers.remove(container_id);

        info!("Removed container: {}", container_id);
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn logs(&self, container_id: &str) -> Result<String, SlipwayError> {
        self.docker.logs(container_id).await.map_err(docker_err)
    }

    /// Host port the container's declared port is published on.
    #[instrument(skip(self))]
    pub async fn published_port(
        &self,
        container_id: &str,
        container_port: u16,
    ) -> Result<Option<u16>, SlipwayError> {
        self.docker
            .published_port(container_id, container_port)
            .await
            .map_err(docker_err)
    }

    pub fn status(&self, container_id: &str) -> Result<ContainerStatus, SlipwayError> {
        self.active_containers
            .get(container_id)
            .map(|info| info.status)
            .ok_or_else(|| SlipwayError::Internal {
                reason: format!("unknown container {}", container_id),
            })
    }

    pub fn containers(&self) -> Vec<&ContainerInfo> {
        self.active_containers.values().collect()
    }

    fn set_status(&mut self, container_id: &str, status: ContainerStatus) {
        if let Some(info) = self.active_containers.get_mut(container_id) {
            info.status = status;
        }
    }
}
