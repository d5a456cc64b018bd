//! In-memory engine.
//!
//! Behaves like a single local daemon closely enough to exercise the lifecycle
//! manager, the port scanner, the daemon monitor and the HTTP gateway without
//! Docker: names are unique, start/stop are idempotent, a host port can only be
//! bound by one running container, and the daemon can be taken "down".

use crate::container::image::POPULAR_TERM;
use crate::container::{
    ContainerPlan, ContainerRecord, Engine, EngineError, EngineResult, ImageDeletion,
    ImageDetails, ImageRecord, PortMapping, PullSummary, SearchHit,
};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Debug, Clone)]
struct MockContainer {
    id: String,
    name: String,
    plan: ContainerPlan,
    running: bool,
}

impl MockContainer {
    fn record(&self) -> ContainerRecord {
        let ports = self
            .plan
            .binding
            .map(|binding| {
                vec![PortMapping {
                    // the engine only publishes while running
                    host_port: if self.running { binding.host_port } else { None },
                    container_port: binding.container_port,
                    protocol: "tcp".to_string(),
                }]
            })
            .unwrap_or_default();

        ContainerRecord {
            id: self.id.clone(),
            name: self.name.clone(),
            image: self.plan.image.clone(),
            state: if self.running { "running" } else { "exited" }.to_string(),
            status: if self.running { "Up" } else { "Exited (0)" }.to_string(),
            ports,
        }
    }
}

#[derive(Debug)]
struct MockState {
    reachable: bool,
    fail_start: bool,
    next_id: u64,
    containers: Vec<MockContainer>,
    images: BTreeMap<String, ImageDetails>,
    catalog: Vec<SearchHit>,
    last_stop_grace: Option<Duration>,
}

/// In-memory [`Engine`] implementation.
#[derive(Debug)]
pub struct MockEngine {
    state: Mutex<MockState>,
    calls: AtomicUsize,
    creates: AtomicUsize,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self {
            state: Mutex::new(MockState {
                reachable: true,
                fail_start: false,
                next_id: 1,
                containers: Vec::new(),
                images: BTreeMap::new(),
                catalog: Vec::new(),
                last_stop_grace: None,
            }),
            calls: AtomicUsize::new(0),
            creates: AtomicUsize::new(0),
        }
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the daemon up or down.
    pub fn set_reachable(&self, reachable: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.reachable = reachable;
        }
    }

    /// Make every subsequent start fail with a server error.
    pub fn set_fail_start(&self, fail: bool) {
        if let Ok(mut state) = self.state.lock() {
            state.fail_start = fail;
        }
    }

    /// Register a local image.
    pub fn add_image(&self, reference: &str, details: ImageDetails) {
        if let Ok(mut state) = self.state.lock() {
            state.images.insert(reference.to_string(), details);
        }
    }

    /// Register a registry search result.
    pub fn add_search_hit(&self, hit: SearchHit) {
        if let Ok(mut state) = self.state.lock() {
            state.catalog.push(hit);
        }
    }

    /// Number of engine calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Number of containers created so far.
    pub fn create_count(&self) -> usize {
        self.creates.load(Ordering::SeqCst)
    }

    /// Number of containers with the given name.
    pub fn containers_named(&self, name: &str) -> usize {
        self.state
            .lock()
            .map(|state| state.containers.iter().filter(|c| c.name == name).count())
            .unwrap_or(0)
    }

    /// Grace period passed to the most recent stop.
    pub fn last_stop_grace(&self) -> Option<Duration> {
        self.state.lock().ok().and_then(|state| state.last_stop_grace)
    }

    fn enter(&self) -> EngineResult<std::sync::MutexGuard<'_, MockState>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let state = self
            .state
            .lock()
            .map_err(|e| EngineError::Other(format!("mutex poisoned: {e}")))?;
        if !state.reachable {
            return Err(EngineError::Unreachable(
                "Cannot connect to the Docker daemon".to_string(),
            ));
        }
        Ok(state)
    }
}

/// Resolve like the daemon does: full id, then exact name, then id prefix.
fn find<'a>(containers: &'a mut [MockContainer], key: &str) -> Option<&'a mut MockContainer> {
    let index = containers
        .iter()
        .position(|c| c.id == key)
        .or_else(|| containers.iter().position(|c| c.name == key))
        .or_else(|| {
            containers
                .iter()
                .position(|c| key.len() >= 4 && c.id.starts_with(key))
        })?;
    containers.get_mut(index)
}

fn no_such_container(key: &str) -> EngineError {
    EngineError::NotFound(format!("No such container: {key}"))
}

#[async_trait]
impl Engine for MockEngine {
    async fn version(&self) -> EngineResult<String> {
        let _state = self.enter()?;
        Ok("mock-1.0".to_string())
    }

    async fn list_containers(&self, all: bool) -> EngineResult<Vec<ContainerRecord>> {
        let state = self.enter()?;
        Ok(state
            .containers
            .iter()
            .filter(|c| all || c.running)
            .map(MockContainer::record)
            .collect())
    }

    async fn inspect_container(&self, name_or_id: &str) -> EngineResult<ContainerRecord> {
        let mut state = self.enter()?;
        find(&mut state.containers, name_or_id)
            .map(|c| c.record())
            .ok_or_else(|| no_such_container(name_or_id))
    }

    async fn create_container(&self, name: &str, plan: &ContainerPlan) -> EngineResult<String> {
        let mut state = self.enter()?;
        if state.containers.iter().any(|c| c.name == name) {
            return Err(EngineError::Rejected {
                status_code: 409,
                message: format!("Conflict. The container name \"/{name}\" is already in use"),
            });
        }

        let id = format!("{:08x}{}", state.next_id, "0".repeat(56));
        state.next_id += 1;
        state.containers.push(MockContainer {
            id: id.clone(),
            name: name.to_string(),
            plan: plan.clone(),
            running: false,
        });
        self.creates.fetch_add(1, Ordering::SeqCst);
        Ok(id)
    }

    async fn start_container(&self, id: &str) -> EngineResult<()> {
        let mut state = self.enter()?;
        if state.fail_start {
            return Err(EngineError::Rejected {
                status_code: 500,
                message: "OCI runtime create failed".to_string(),
            });
        }

        let wanted = {
            let container = find(&mut state.containers, id).ok_or_else(|| no_such_container(id))?;
            if container.running {
                return Ok(());
            }
            (container.id.clone(), container.plan.binding.and_then(|b| b.host_port))
        };

        if let (container_id, Some(host_port)) = &wanted {
            let taken = state.containers.iter().any(|c| {
                c.running
                    && &c.id != container_id
                    && c.plan.binding.and_then(|b| b.host_port) == Some(*host_port)
            });
            if taken {
                return Err(EngineError::Rejected {
                    status_code: 500,
                    message: format!("Bind for 0.0.0.0:{host_port} failed: port is already allocated"),
                });
            }
        }

        if let Some(container) = find(&mut state.containers, &wanted.0) {
            container.running = true;
        }
        Ok(())
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> EngineResult<()> {
        let mut state = self.enter()?;
        state.last_stop_grace = Some(grace);
        let container = find(&mut state.containers, id).ok_or_else(|| no_such_container(id))?;
        container.running = false;
        Ok(())
    }

    async fn remove_container(&self, id: &str, force: bool) -> EngineResult<()> {
        let mut state = self.enter()?;
        let container = find(&mut state.containers, id).ok_or_else(|| no_such_container(id))?;
        if container.running && !force {
            return Err(EngineError::Rejected {
                status_code: 409,
                message: format!("You cannot remove a running container {id}"),
            });
        }
        let target = container.id.clone();
        state.containers.retain(|c| c.id != target);
        Ok(())
    }

    async fn list_images(&self) -> EngineResult<Vec<ImageRecord>> {
        let state = self.enter()?;
        Ok(state
            .images
            .iter()
            .map(|(reference, details)| ImageRecord {
                id: details.id.clone(),
                repo_tags: vec![reference.clone()],
                size: 0,
                created: 0,
            })
            .collect())
    }

    async fn inspect_image(&self, reference: &str) -> EngineResult<ImageDetails> {
        let state = self.enter()?;
        state
            .images
            .get(reference)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("No such image: {reference}")))
    }

    async fn remove_image(&self, reference: &str) -> EngineResult<Vec<ImageDeletion>> {
        let mut state = self.enter()?;
        let details = state
            .images
            .remove(reference)
            .ok_or_else(|| EngineError::NotFound(format!("No such image: {reference}")))?;
        Ok(vec![
            ImageDeletion {
                untagged: Some(reference.to_string()),
                deleted: None,
            },
            ImageDeletion {
                untagged: None,
                deleted: Some(details.id),
            },
        ])
    }

    async fn pull_image(&self, reference: &str) -> EngineResult<PullSummary> {
        let mut state = self.enter()?;
        let id = format!("sha256:{:064x}", state.images.len() + 1);
        state
            .images
            .entry(reference.to_string())
            .or_insert_with(|| ImageDetails {
                id,
                ..Default::default()
            });
        Ok(PullSummary {
            image: reference.to_string(),
            status: format!("Status: Downloaded newer image for {reference}"),
        })
    }

    async fn search_images(&self, term: &str, limit: u32) -> EngineResult<Vec<SearchHit>> {
        let state = self.enter()?;
        Ok(state
            .catalog
            .iter()
            .filter(|hit| term == POPULAR_TERM || hit.name.contains(term))
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn web_plan(host_port: u16) -> ContainerPlan {
        ContainerPlan::builder()
            .image("nginx")
            .port_binding(80, Some(host_port))
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_name_rejected() {
        let engine = MockEngine::new();
        engine.create_container("web", &web_plan(8080)).await.unwrap();
        let err = engine.create_container("web", &web_plan(8081)).await.unwrap_err();
        assert!(matches!(err, EngineError::Rejected { status_code: 409, .. }));
    }

    #[tokio::test]
    async fn test_second_bind_of_host_port_fails_at_start() {
        let engine = MockEngine::new();
        let first = engine.create_container("a", &web_plan(8080)).await.unwrap();
        let second = engine.create_container("b", &web_plan(8080)).await.unwrap();
        engine.start_container(&first).await.unwrap();
        assert!(engine.start_container(&second).await.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_daemon_fails_every_call() {
        let engine = MockEngine::new();
        engine.set_reachable(false);
        assert!(matches!(
            engine.version().await,
            Err(EngineError::Unreachable(_))
        ));
        assert!(engine.list_containers(true).await.is_err());
    }

    #[tokio::test]
    async fn test_exact_name_beats_id_prefix() {
        let engine = MockEngine::new();
        let web = engine.create_container("web", &web_plan(8080)).await.unwrap();
        let named = engine.create_container(&web[..4], &web_plan(9090)).await.unwrap();

        let record = engine.inspect_container(&web[..4]).await.unwrap();
        assert_eq!(record.id, named);
    }

    #[tokio::test]
    async fn test_inspect_by_id_prefix() {
        let engine = MockEngine::new();
        let id = engine.create_container("web", &web_plan(8080)).await.unwrap();
        let record = engine.inspect_container(&id[..12]).await.unwrap();
        assert_eq!(record.name, "web");
    }
}
