//! Host-port occupancy across running containers.

use crate::container::{ContainerError, Engine, Result};
use std::sync::Arc;
use tracing::debug;

/// Scans running containers for published host ports.
///
/// The answer is a point-in-time snapshot; nothing is reserved, so a
/// concurrent create can still take the port before the caller uses it.
#[derive(Clone)]
pub struct PortScanner {
    engine: Arc<dyn Engine>,
}

impl PortScanner {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self { engine }
    }

    /// Whether any running container publishes `host_port`.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::OperationFailed`] if containers cannot be listed.
    pub async fn is_port_in_use(&self, host_port: u16) -> Result<bool> {
        let running = self
            .engine
            .list_containers(false)
            .await
            .map_err(|e| ContainerError::operation("list", "running containers", e))?;

        for container in &running {
            if container
                .ports
                .iter()
                .any(|mapping| mapping.host_port == Some(host_port))
            {
                debug!(
                    "Host port {} is published by container {} ({})",
                    host_port, container.name, container.id
                );
                return Ok(true);
            }
        }

        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{ContainerPlan, MockEngine};

    #[tokio::test]
    async fn test_port_free_when_nothing_runs() {
        let engine = Arc::new(MockEngine::new());
        let scanner = PortScanner::new(engine);
        assert!(!scanner.is_port_in_use(8080).await.unwrap());
    }

    #[tokio::test]
    async fn test_running_container_holds_port() {
        let engine = Arc::new(MockEngine::new());
        let plan = ContainerPlan::builder()
            .image("nginx")
            .port_binding(80, Some(8080))
            .build()
            .unwrap();
        let id = engine.create_container("web", &plan).await.unwrap();
        engine.start_container(&id).await.unwrap();

        let scanner = PortScanner::new(engine);
        assert!(scanner.is_port_in_use(8080).await.unwrap());
        assert!(!scanner.is_port_in_use(8081).await.unwrap());
    }

    #[tokio::test]
    async fn test_stopped_container_does_not_hold_port() {
        let engine = Arc::new(MockEngine::new());
        let plan = ContainerPlan::builder()
            .image("nginx")
            .port_binding(80, Some(8080))
            .build()
            .unwrap();
        engine.create_container("web", &plan).await.unwrap();

        let scanner = PortScanner::new(engine);
        assert!(!scanner.is_port_in_use(8080).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_failure_is_an_error() {
        let engine = Arc::new(MockEngine::new());
        engine.set_reachable(false);

        let scanner = PortScanner::new(engine);
        assert!(matches!(
            scanner.is_port_in_use(8080).await,
            Err(ContainerError::OperationFailed { .. })
        ));
    }
}
