use async_trait::async_trait;
use slipway_invoker::container::{ContainerManager, ContainerStatus};
use slipway_invoker::docker::{CreateSpec, DockerLike, ObservedState};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Default)]
pub struct FakeDocker {
    pub created: Arc<Mutex<Vec<CreateSpec>>>,
    pub started: Arc<Mutex<Vec<String>>>,
    pub stopped: Arc<Mutex<Vec<(String, u64)>>>,
    pub removed: Arc<Mutex<Vec<(String, bool)>>>,
    pub state: Arc<Mutex<ObservedState>>,
    pub next_id: Arc<Mutex<u64>>,
}

impl FakeDocker {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(ObservedState {
                running: false,
                exit_code: None,
            })),
            ..Default::default()
        }
    }

    /// Simulate the entrypoint process exiting with `code`.
    pub async fn finish(&self, code: i64) {
        *self.state.lock().await = ObservedState {
            running: false,
            exit_code: Some(code),
        };
    }

    pub async fn last_created(&self) -> CreateSpec {
        self.created
            .lock()
            .await
            .last()
            .cloned()
            .expect("no create")
    }
}

#[async_trait]
impl DockerLike for FakeDocker {
    async fn create(&self, spec: CreateSpec) -> anyhow::Result<String> {
        self.created.lock().await.push(spec);
        let mut id = self.next_id.lock().await;
        *id += 1;
        Ok(format!("ctr-{}", *id))
    }
    async fn start(&self, container_id: &str) -> anyhow::Result<()> {
        self.started.lock().await.push(container_id.to_string());
        *self.state.lock().await = ObservedState {
            running: true,
            exit_code: None,
        };
        Ok(())
    }
    async fn stop(&self, container_id: &str, timeout_secs: u64) -> anyhow::Result<()> {
        self.stopped
            .lock()
            .await
            .push((container_id.to_string(), timeout_secs));
        *self.state.lock().await = ObservedState {
            running: false,
            exit_code: Some(137),
        };
        Ok(())
    }
    async fn remove(&self, container_id: &str, force: bool) -> anyhow::Result<()> {
        self.removed
            .lock()
            .await
            .push((container_id.to_string(), force));
        Ok(())
    }
    async fn logs(&self, _container_id: &str) -> anyhow::Result<String> {
        Ok("INFO: Uvicorn running on http://0.0.0.0:8000\n".to_string())
    }
    async fn inspect_state(&self, _container_id: &str) -> anyhow::Result<ObservedState> {
        Ok(*self.state.lock().await)
    }
    async fn published_port(
        &self,
        _container_id: &str,
        container_port: u16,
    ) -> anyhow::Result<Option<u16>> {
        assert_eq!(container_port, 8000);
        Ok(Some(49152))
    }
}

#[tokio::test]
async fn launch_creates_then_starts_exactly_once() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 10);

    let id = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    assert_eq!(manager.status(&id).unwrap(), ContainerStatus::Running);

    let spec = docker.last_created().await;
    assert_eq!(spec.image, "slipway/app:abc123");
    assert_eq!(spec.container_port, 8000);
    assert_eq!(spec.host_port, None);
    assert!(spec.name.starts_with("slipway-"));

    // Exactly one start per container instantiation.
    assert_eq!(docker.started.lock().await.clone(), vec![id]);
}

#[tokio::test]
async fn natural_exit_is_observed_as_exited() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 10);

    let id = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    docker.finish(0).await;

    let code = manager.wait_for_exit(&id, 2_000).await.unwrap();
    assert_eq!(code, 0);
    assert_eq!(manager.status(&id).unwrap(), ContainerStatus::Exited(0));
}

#[tokio::test]
async fn nonzero_exit_code_passes_through() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 10);

    let id = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    docker.finish(3).await;

    assert_eq!(manager.wait_for_exit(&id, 2_000).await.unwrap(), 3);
}

#[tokio::test]
async fn stop_is_terminal_killed() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 5);

    let id = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    manager.stop(&id).await.unwrap();
    assert_eq!(manager.status(&id).unwrap(), ContainerStatus::Killed);

    // Killed sticks even though the engine now reports an exit code.
    assert_eq!(manager.refresh(&id).await.unwrap(), ContainerStatus::Killed);
    assert_eq!(docker.stopped.lock().await.clone(), vec![(id, 5)]);
}

#[tokio::test]
async fn stop_after_natural_exit_keeps_exited() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 5);

    let id = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    docker.finish(0).await;
    manager.refresh(&id).await.unwrap();

    manager.stop(&id).await.unwrap();
    assert_eq!(manager.status(&id).unwrap(), ContainerStatus::Exited(0));
    assert!(docker.stopped.lock().await.is_empty());
}

#[tokio::test]
async fn remove_forgets_the_container() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 10);

    let id = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    manager.remove(&id).await.unwrap();

    assert!(manager.status(&id).is_err());
    assert_eq!(docker.removed.lock().await.clone(), vec![(id, true)]);
}

#[tokio::test]
async fn published_port_comes_from_the_engine() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 10);

    let id = manager.launch("slipway/app:abc123", 8000, Some(8080)).await.unwrap();
    let spec = docker.last_created().await;
    assert_eq!(spec.host_port, Some(8080));

    let port = manager.published_port(&id, 8000).await.unwrap();
    assert_eq!(port, Some(49152));
}

#[tokio::test]
async fn each_launch_is_an_independent_container() {
    let docker = FakeDocker::new();
    let mut manager = ContainerManager::new(docker.clone(), 10);

    let a = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    let b = manager.launch("slipway/app:abc123", 8000, None).await.unwrap();
    assert_ne!(a, b);

    let created = docker.created.lock().await.clone();
    assert_eq!(created.len(), 2);
    // Same image, distinct names; the engine gives each its own namespace.
    assert_ne!(created[0].name, created[1].name);
    assert_eq!(created[0].image, created[1].image);
}
