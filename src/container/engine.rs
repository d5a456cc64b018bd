//! Engine adapter seam.
//!
//! The lifecycle manager, the port scanner and the daemon monitor only ever talk
//! to the engine through the [`Engine`] trait. [`DockerEngine`](super::DockerEngine)
//! implements it over bollard, [`MockEngine`](super::MockEngine) keeps everything
//! in memory for tests.

use super::ContainerPlan;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Errors reported by an engine adapter.
#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    /// The referenced container or image does not exist
    #[error("No such object: {0}")]
    NotFound(String),

    /// The daemon could not be reached at all
    #[error("Engine unreachable: {0}")]
    Unreachable(String),

    /// The daemon answered with an error status
    #[error("Engine rejected request ({status_code}): {message}")]
    Rejected { status_code: u16, message: String },

    /// Anything else
    #[error("Engine error: {0}")]
    Other(String),
}

impl From<bollard::errors::Error> for EngineError {
    fn from(err: bollard::errors::Error) -> Self {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404,
                message,
            } => EngineError::NotFound(message),
            bollard::errors::Error::DockerResponseServerError {
                status_code,
                message,
            } => EngineError::Rejected {
                status_code,
                message,
            },
            other => EngineError::Unreachable(other.to_string()),
        }
    }
}

/// Result type for engine adapter calls.
pub type EngineResult<T> = std::result::Result<T, EngineError>;

/// A published port of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Host port, `None` when the container port is exposed but not published
    pub host_port: Option<u16>,
    pub container_port: u16,
    pub protocol: String,
}

/// The engine's view of a container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContainerRecord {
    pub id: String,
    pub name: String,
    pub image: String,
    /// Engine state (`running`, `exited`, `created`, ...)
    pub state: String,
    /// Human readable status line (`Up 3 minutes`)
    pub status: String,
    pub ports: Vec<PortMapping>,
}

impl ContainerRecord {
    /// Whether the engine reported this container as running.
    pub fn is_running(&self) -> bool {
        self.state.eq_ignore_ascii_case("running")
    }
}

/// Image entry from the engine's image list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageRecord {
    pub id: String,
    pub repo_tags: Vec<String>,
    pub size: i64,
    /// Creation time as a unix timestamp
    pub created: i64,
}

/// Run configuration declared by an image.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDetails {
    pub id: String,
    pub cmd: Vec<String>,
    pub entrypoint: Vec<String>,
    /// Raw exposed port keys as stored by the engine (`8080/tcp`)
    pub exposed_ports: Vec<String>,
}

/// One entry of an image removal report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageDeletion {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub untagged: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deleted: Option<String>,
}

/// Registry search result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchHit {
    pub name: String,
    pub description: String,
    pub star_count: i64,
    pub is_official: bool,
}

/// Outcome of an image pull.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PullSummary {
    pub image: String,
    /// Last status line the engine reported
    pub status: String,
}

/// Administrative API of a container engine.
///
/// Implementations must be safe to share across concurrent requests.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Liveness probe against the version endpoint.
    async fn version(&self) -> EngineResult<String>;

    /// List containers; `all = false` returns only running ones.
    async fn list_containers(&self, all: bool) -> EngineResult<Vec<ContainerRecord>>;

    /// Inspect a container by name or identifier.
    async fn inspect_container(&self, name_or_id: &str) -> EngineResult<ContainerRecord>;

    /// Create a container and return its identifier.
    async fn create_container(&self, name: &str, plan: &ContainerPlan) -> EngineResult<String>;

    /// Start a container. Starting a running container succeeds.
    async fn start_container(&self, id: &str) -> EngineResult<()>;

    /// Stop a container. Stopping a stopped container succeeds.
    async fn stop_container(&self, id: &str, grace: Duration) -> EngineResult<()>;

    async fn remove_container(&self, id: &str, force: bool) -> EngineResult<()>;

    async fn list_images(&self) -> EngineResult<Vec<ImageRecord>>;

    async fn inspect_image(&self, reference: &str) -> EngineResult<ImageDetails>;

    /// Force-remove an image and prune its untagged parents.
    async fn remove_image(&self, reference: &str) -> EngineResult<Vec<ImageDeletion>>;

    async fn pull_image(&self, reference: &str) -> EngineResult<PullSummary>;

    async fn search_images(&self, term: &str, limit: u32) -> EngineResult<Vec<SearchHit>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bollard_not_found_maps_to_not_found() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 404,
            message: "No such container: web".to_string(),
        };
        assert!(matches!(EngineError::from(err), EngineError::NotFound(_)));
    }

    #[test]
    fn test_bollard_server_error_keeps_status() {
        let err = bollard::errors::Error::DockerResponseServerError {
            status_code: 409,
            message: "name in use".to_string(),
        };
        match EngineError::from(err) {
            EngineError::Rejected { status_code, .. } => assert_eq!(status_code, 409),
            other => panic!("unexpected mapping: {other:?}"),
        }
    }

    #[test]
    fn test_running_state_is_case_insensitive() {
        let record = ContainerRecord {
            id: "abc".to_string(),
            name: "web".to_string(),
            image: "nginx".to_string(),
            state: "Running".to_string(),
            status: "Up 1 second".to_string(),
            ports: Vec::new(),
        };
        assert!(record.is_running());
    }
}
