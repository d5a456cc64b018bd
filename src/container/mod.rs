//! Container and image lifecycle over a Docker-compatible engine.
//!
//! ## Architecture
//!
//! - [`engine`]: the [`Engine`] adapter trait and the records it returns
//! - [`client`]: bollard-backed [`DockerEngine`] with connection fallbacks
//! - [`mock`]: in-memory [`MockEngine`] used by tests and demos
//! - [`config`]: run requests, validation and creation plans
//! - [`ports`]: host-port conflict detection across running containers
//! - [`lifecycle`]: idempotent provisioning, start, stop and removal
//! - [`image`]: image listing, introspection, removal, pull and search
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dockgate::container::{ContainerLifecycleManager, ContainerSpec, DockerEngine};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let engine = Arc::new(DockerEngine::new()?);
//!     let manager = ContainerLifecycleManager::new(engine);
//!
//!     let spec = ContainerSpec {
//!         image_name: "nginx:latest".to_string(),
//!         container_name: "web".to_string(),
//!         host_port: Some("8080".to_string()),
//!         container_port: Some("80".to_string()),
//!         ..Default::default()
//!     };
//!
//!     let id = manager.provision_and_run(&spec).await?;
//!     manager.stop(&id, Duration::from_secs(10)).await?;
//!     Ok(())
//! }
//! ```

pub mod client;
pub mod config;
pub mod engine;
pub mod image;
pub mod lifecycle;
pub mod mock;
pub mod ports;

pub use client::{DockerEngine, EngineClientConfig};
pub use config::{ContainerPlan, ContainerPlanBuilder, ContainerSpec, PlannedBinding, ValidatedSpec};
pub use engine::{
    ContainerRecord, Engine, EngineError, EngineResult, ImageDeletion, ImageDetails, ImageRecord,
    PortMapping, PullSummary, SearchHit,
};
pub use image::{ImageCatalog, RunCommand, SearchLimits};
pub use lifecycle::ContainerLifecycleManager;
pub use mock::MockEngine;
pub use ports::PortScanner;

/// Container lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum ContainerError {
    /// Malformed or missing request fields
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested host port is published by a running container
    #[error("Host port {0} is already in use")]
    PortConflict(u16),

    /// Referenced container or image does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Image declares neither a command nor an entrypoint
    #[error("Image {0} has no CMD or ENTRYPOINT defined")]
    NoCommandDefined(String),

    /// Engine-side failure, cause preserved
    #[error("Failed to {operation} {target}: {source}")]
    OperationFailed {
        operation: &'static str,
        target: String,
        #[source]
        source: EngineError,
    },
}

impl ContainerError {
    /// Wrap an engine failure, surfacing engine `NotFound` as [`ContainerError::NotFound`].
    pub fn from_engine(operation: &'static str, target: &str, source: EngineError) -> Self {
        match source {
            EngineError::NotFound(_) => ContainerError::NotFound(target.to_string()),
            source => ContainerError::OperationFailed {
                operation,
                target: target.to_string(),
                source,
            },
        }
    }

    /// Wrap an engine failure verbatim.
    pub fn operation(operation: &'static str, target: &str, source: EngineError) -> Self {
        ContainerError::OperationFailed {
            operation,
            target: target.to_string(),
            source,
        }
    }
}

/// Result type for container operations.
pub type Result<T> = std::result::Result<T, ContainerError>;
