//! Idempotent container provisioning.
//!
//! A run request is keyed by container name: if a container with that name
//! already exists it is started and reused, otherwise a new one is created and
//! started. The manager holds no state of its own between calls; the engine is
//! the only source of truth for what exists and what is running.

use crate::container::{
    ContainerError, ContainerPlan, ContainerRecord, ContainerSpec, Engine, EngineError,
    PortScanner, Result, RunCommand, ValidatedSpec,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Turns run requests into running containers.
#[derive(Clone)]
pub struct ContainerLifecycleManager {
    engine: Arc<dyn Engine>,
    ports: PortScanner,
}

impl ContainerLifecycleManager {
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        let ports = PortScanner::new(Arc::clone(&engine));
        Self { engine, ports }
    }

    /// Get the engine handle.
    pub fn engine(&self) -> &Arc<dyn Engine> {
        &self.engine
    }

    /// Get the port scanner.
    pub fn ports(&self) -> &PortScanner {
        &self.ports
    }

    /// Make sure a container named `spec.container_name` is running and return its id.
    ///
    /// An existing container with that name is started and reused regardless of
    /// the other fields. Otherwise the requested host port is checked against
    /// running containers, then the container is created and started.
    ///
    /// A failed start after a successful create leaves the container behind
    /// under the requested name; calling again reuses it.
    ///
    /// # Errors
    ///
    /// - [`ContainerError::Validation`] before any engine call for a bad spec
    /// - [`ContainerError::PortConflict`] when the host port is published already
    /// - [`ContainerError::OperationFailed`] for engine failures
    pub async fn provision_and_run(&self, spec: &ContainerSpec) -> Result<String> {
        let spec = spec.validate()?;

        if let Some(existing) = self.find_by_name(&spec.name).await? {
            self.engine
                .start_container(&existing.id)
                .await
                .map_err(|e| ContainerError::operation("start", &existing.id, e))?;
            info!(
                "Reusing container '{}' ({}); no new container created",
                spec.name,
                short_id(&existing.id)
            );
            return Ok(existing.id);
        }

        self.create_and_start(&spec).await
    }

    async fn create_and_start(&self, spec: &ValidatedSpec) -> Result<String> {
        if let Some(host_port) = spec.host_port {
            if self.ports.is_port_in_use(host_port).await? {
                warn!(
                    "Refusing to create '{}': host port {} is in use",
                    spec.name, host_port
                );
                return Err(ContainerError::PortConflict(host_port));
            }
        }

        let plan = ContainerPlan::try_from(spec)?;

        let id = self
            .engine
            .create_container(&spec.name, &plan)
            .await
            .map_err(|e| ContainerError::operation("create", &spec.name, e))?;
        debug!("Created container '{}' ({})", spec.name, short_id(&id));

        self.engine
            .start_container(&id)
            .await
            .map_err(|e| ContainerError::operation("start", &id, e))?;

        info!(
            "Container '{}' ({}) is running from {}",
            spec.name,
            short_id(&id),
            spec.image
        );
        Ok(id)
    }

    /// Look a container up by name. `Ok(None)` when the engine does not know it.
    ///
    /// The engine also resolves ids and id prefixes; those matches are
    /// ignored so a name that looks like another container's id is not reused.
    ///
    /// # Errors
    ///
    /// Returns error for engine failures other than not-found.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<ContainerRecord>> {
        match self.engine.inspect_container(name).await {
            Ok(record) if record.name == name => Ok(Some(record)),
            Ok(record) => {
                debug!(
                    "'{}' resolved to container '{}' by id, not by name",
                    name,
                    short_id(&record.id)
                );
                Ok(None)
            }
            Err(EngineError::NotFound(_)) => Ok(None),
            Err(e) => Err(ContainerError::operation("inspect", name, e)),
        }
    }

    /// Start a container that already exists and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::NotFound`] for an unknown id.
    pub async fn start_existing(&self, id: &str) -> Result<String> {
        if id.trim().is_empty() {
            return Err(ContainerError::Validation("id is required".to_string()));
        }

        self.engine
            .start_container(id)
            .await
            .map_err(|e| ContainerError::from_engine("start", id, e))?;

        info!("Started container {}", short_id(id));
        Ok(id.to_string())
    }

    /// Stop a container, giving it `grace` to exit before it is killed.
    ///
    /// Running state is not checked first; stopping a stopped container succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the engine rejects the stop.
    pub async fn stop(&self, id: &str, grace: Duration) -> Result<()> {
        if id.trim().is_empty() {
            return Err(ContainerError::Validation("id is required".to_string()));
        }

        debug!("Stopping container {} (grace {:?})", short_id(id), grace);
        self.engine
            .stop_container(id, grace)
            .await
            .map_err(|e| ContainerError::from_engine("stop", id, e))?;

        info!("Container {} stopped", short_id(id));
        Ok(())
    }

    /// Force-remove a container.
    ///
    /// # Errors
    ///
    /// Returns error if the container does not exist or removal fails.
    pub async fn remove(&self, id: &str) -> Result<()> {
        if id.trim().is_empty() {
            return Err(ContainerError::Validation("id is required".to_string()));
        }

        self.engine
            .remove_container(id, true)
            .await
            .map_err(|e| ContainerError::from_engine("remove", id, e))?;

        info!("Removed container {}", short_id(id));
        Ok(())
    }

    /// All containers, running or not.
    ///
    /// # Errors
    ///
    /// Returns error if listing fails.
    pub async fn list_containers(&self) -> Result<Vec<ContainerRecord>> {
        self.engine
            .list_containers(true)
            .await
            .map_err(|e| ContainerError::operation("list", "containers", e))
    }

    /// Report what an image would run: command, entrypoint and exposed ports.
    ///
    /// # Errors
    ///
    /// - [`ContainerError::NotFound`] if the engine does not know the image
    /// - [`ContainerError::OperationFailed`] for other inspect failures
    /// - [`ContainerError::NoCommandDefined`] if it has neither command nor entrypoint
    pub async fn describe_run_command(&self, image: &str) -> Result<RunCommand> {
        if image.trim().is_empty() {
            return Err(ContainerError::Validation(
                "Image name is required".to_string(),
            ));
        }

        let details = self
            .engine
            .inspect_image(image)
            .await
            .map_err(|e| ContainerError::from_engine("inspect", image, e))?;

        RunCommand::from_details(image, details)
    }
}

fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}
