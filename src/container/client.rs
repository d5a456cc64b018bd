//! Docker/Podman engine adapter.
//!
//! Wraps the bollard Docker API behind the [`Engine`] trait with connection
//! fallbacks. Connecting does not contact the daemon, so a handle can be built
//! while the daemon is still down and the daemon monitor can bring it up later.

use crate::container::{
    ContainerPlan, ContainerRecord, Engine, EngineError, EngineResult, ImageDeletion,
    ImageDetails, ImageRecord, PortMapping, PullSummary, SearchHit,
};
use async_trait::async_trait;
use bollard::Docker;
use bollard::models::{ContainerCreateBody, HostConfig, PortBinding};
use bollard::query_parameters::{
    CreateContainerOptions, CreateImageOptions, InspectContainerOptions, ListContainersOptions,
    ListImagesOptions, RemoveContainerOptions, RemoveImageOptions, SearchImagesOptions,
    StartContainerOptions, StopContainerOptions,
};
use futures::stream::StreamExt;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

/// Engine connection configuration.
#[derive(Debug, Clone)]
pub struct EngineClientConfig {
    /// Explicit engine address (`unix:///var/run/docker.sock`, `tcp://host:2375`)
    pub docker_host: Option<String>,
    /// Request timeout in seconds
    pub timeout: u64,
}

impl Default for EngineClientConfig {
    fn default() -> Self {
        Self {
            docker_host: None,
            timeout: 120,
        }
    }
}

/// Engine adapter backed by bollard.
///
/// `Docker` pools its connections and is cheap to clone, so one handle serves
/// every request.
#[derive(Clone)]
pub struct DockerEngine {
    docker: Docker,
}

impl DockerEngine {
    /// Connect with default configuration.
    ///
    /// # Errors
    ///
    /// Returns error if no connection strategy yields a client handle.
    pub fn new() -> EngineResult<Self> {
        Self::with_config(&EngineClientConfig::default())
    }

    /// Connect with custom configuration.
    ///
    /// # Errors
    ///
    /// Returns error if no connection strategy yields a client handle.
    pub fn with_config(config: &EngineClientConfig) -> EngineResult<Self> {
        let docker = match &config.docker_host {
            Some(host) => Self::connect_to(host, config.timeout)?,
            None => Self::connect(config.timeout)?,
        };
        Ok(Self { docker })
    }

    /// Wrap an existing bollard client.
    pub fn from_docker(docker: Docker) -> Self {
        Self { docker }
    }

    fn connect_to(host: &str, timeout: u64) -> EngineResult<Docker> {
        debug!("Connecting to configured engine at {}", host);
        let docker = if host.starts_with("unix://") || host.starts_with('/') {
            Docker::connect_with_socket(host, timeout, bollard::API_DEFAULT_VERSION)
        } else {
            Docker::connect_with_http(host, timeout, bollard::API_DEFAULT_VERSION)
        }
        .map_err(|e| EngineError::Unreachable(format!("{host}: {e}")))?;

        info!("Using container engine at {}", host);
        Ok(docker)
    }

    /// Tries, in order: `DOCKER_HOST`/platform defaults, rootless Podman,
    /// system Podman.
    fn connect(timeout: u64) -> EngineResult<Docker> {
        debug!("Attempting to connect to container engine...");

        match Docker::connect_with_defaults() {
            Ok(docker) => {
                info!("Using container engine via local defaults");
                return Ok(docker);
            }
            Err(e) => {
                debug!("Local defaults failed: {}", e);
            }
        }

        #[cfg(unix)]
        {
            let mut candidates = Vec::new();
            if let Ok(home) = std::env::var("HOME") {
                candidates.push(format!("unix://{home}/run/podman/podman.sock"));
            }
            candidates.push("unix:///run/podman/podman.sock".to_string());

            for socket in candidates {
                debug!("Trying Podman socket: {}", socket);
                match Docker::connect_with_socket(&socket, timeout, bollard::API_DEFAULT_VERSION) {
                    Ok(docker) => {
                        info!("Using Podman via {}", socket);
                        return Ok(docker);
                    }
                    Err(e) => {
                        debug!("Podman socket {} failed: {}", socket, e);
                    }
                }
            }
        }

        #[cfg(not(unix))]
        let _ = timeout;

        Err(EngineError::Unreachable(
            "Failed to connect to Docker or Podman. Please ensure one of them is installed."
                .to_string(),
        ))
    }

    /// Get the underlying Docker client.
    pub fn docker(&self) -> &Docker {
        &self.docker
    }
}

/// `304 Not Modified` means the container already was in the requested state.
fn already_in_state(err: &bollard::errors::Error) -> bool {
    matches!(
        err,
        bollard::errors::Error::DockerResponseServerError {
            status_code: 304,
            ..
        }
    )
}

/// Split an engine port key (`8080/tcp`) into number and protocol.
fn split_port_key(key: &str) -> Option<(u16, String)> {
    let (port, proto) = key.split_once('/').unwrap_or((key, "tcp"));
    port.parse().ok().map(|port| (port, proto.to_string()))
}

fn plan_to_body(plan: &ContainerPlan) -> ContainerCreateBody {
    let port_bindings = plan.binding.map(|binding| {
        let mut bindings: HashMap<String, Option<Vec<PortBinding>>> = HashMap::new();
        bindings.insert(
            binding.port_key(),
            Some(vec![PortBinding {
                host_ip: None,
                host_port: binding.host_port.map(|port| port.to_string()),
            }]),
        );
        bindings
    });

    ContainerCreateBody {
        image: Some(plan.image.clone()),
        cmd: plan.cmd.clone(),
        tty: Some(plan.tty),
        exposed_ports: plan
            .binding
            .map(|binding| HashMap::from([(binding.port_key(), HashMap::new())])),
        host_config: Some(HostConfig {
            port_bindings,
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[async_trait]
impl Engine for DockerEngine {
    async fn version(&self) -> EngineResult<String> {
        let version = self.docker.version().await?;
        let version = version.version.unwrap_or_else(|| "unknown".to_string());
        debug!("Container engine version {}", version);
        Ok(version)
    }

    async fn list_containers(&self, all: bool) -> EngineResult<Vec<ContainerRecord>> {
        let containers = self
            .docker
            .list_containers(Some(ListContainersOptions {
                all,
                ..Default::default()
            }))
            .await?;

        Ok(containers
            .into_iter()
            .map(|c| {
                let name = c
                    .names
                    .unwrap_or_default()
                    .first()
                    .map(|n| n.trim_start_matches('/').to_string())
                    .unwrap_or_default();

                let ports = c
                    .ports
                    .unwrap_or_default()
                    .into_iter()
                    .map(|p| PortMapping {
                        host_port: p.public_port,
                        container_port: p.private_port,
                        protocol: p
                            .typ
                            .map(|t| format!("{t:?}").to_lowercase())
                            .unwrap_or_else(|| "tcp".to_string()),
                    })
                    .collect();

                ContainerRecord {
                    id: c.id.unwrap_or_default(),
                    name,
                    image: c.image.unwrap_or_default(),
                    state: c
                        .state
                        .map(|s| format!("{s:?}").to_lowercase())
                        .unwrap_or_default(),
                    status: c.status.unwrap_or_default(),
                    ports,
                }
            })
            .collect())
    }

    async fn inspect_container(&self, name_or_id: &str) -> EngineResult<ContainerRecord> {
        let inspect = self
            .docker
            .inspect_container(name_or_id, None::<InspectContainerOptions>)
            .await?;

        let ports = inspect
            .network_settings
            .and_then(|settings| settings.ports)
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(key, bindings)| {
                let (container_port, protocol) = split_port_key(&key)?;
                let host_ports: Vec<Option<u16>> = bindings
                    .unwrap_or_default()
                    .into_iter()
                    .map(|b| b.host_port.and_then(|p| p.parse().ok()))
                    .collect();
                let host_ports = if host_ports.is_empty() {
                    vec![None]
                } else {
                    host_ports
                };
                Some(
                    host_ports
                        .into_iter()
                        .map(|host_port| PortMapping {
                            host_port,
                            container_port,
                            protocol: protocol.clone(),
                        })
                        .collect::<Vec<_>>(),
                )
            })
            .flatten()
            .collect();

        let state = inspect
            .state
            .and_then(|s| s.status)
            .map(|s| format!("{s:?}").to_lowercase())
            .unwrap_or_default();

        Ok(ContainerRecord {
            id: inspect
                .id
                .ok_or_else(|| EngineError::Other(format!("Container {name_or_id} has no ID")))?,
            name: inspect
                .name
                .map(|n| n.trim_start_matches('/').to_string())
                .unwrap_or_default(),
            image: inspect.config.and_then(|c| c.image).unwrap_or_default(),
            status: state.clone(),
            state,
            ports,
        })
    }

    async fn create_container(&self, name: &str, plan: &ContainerPlan) -> EngineResult<String> {
        let options = CreateContainerOptions {
            name: Some(name.to_string()),
            ..Default::default()
        };

        debug!("Creating container: {}", name);

        let response = self
            .docker
            .create_container(Some(options), plan_to_body(plan))
            .await?;

        for warning in &response.warnings {
            debug!("Create warning for {}: {}", name, warning);
        }

        Ok(response.id)
    }

    async fn start_container(&self, id: &str) -> EngineResult<()> {
        match self
            .docker
            .start_container(id, None::<StartContainerOptions>)
            .await
        {
            Ok(()) => Ok(()),
            Err(e) if already_in_state(&e) => {
                debug!("Container {} already running", id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn stop_container(&self, id: &str, grace: Duration) -> EngineResult<()> {
        let options = StopContainerOptions {
            t: Some(i32::try_from(grace.as_secs()).unwrap_or(i32::MAX)),
            signal: None,
        };

        match self.docker.stop_container(id, Some(options)).await {
            Ok(()) => Ok(()),
            Err(e) if already_in_state(&e) => {
                debug!("Container {} already stopped", id);
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn remove_container(&self, id: &str, force: bool) -> EngineResult<()> {
        self.docker
            .remove_container(
                id,
                Some(RemoveContainerOptions {
                    force,
                    ..Default::default()
                }),
            )
            .await?;
        Ok(())
    }

    async fn list_images(&self) -> EngineResult<Vec<ImageRecord>> {
        let images = self
            .docker
            .list_images(Some(ListImagesOptions::default()))
            .await?;

        Ok(images
            .into_iter()
            .map(|image| ImageRecord {
                id: image.id,
                repo_tags: image.repo_tags,
                size: image.size,
                created: image.created,
            })
            .collect())
    }

    async fn inspect_image(&self, reference: &str) -> EngineResult<ImageDetails> {
        let inspect = self.docker.inspect_image(reference).await?;
        let config = inspect.config.unwrap_or_default();

        Ok(ImageDetails {
            id: inspect.id.unwrap_or_default(),
            cmd: config.cmd.unwrap_or_default(),
            entrypoint: config.entrypoint.unwrap_or_default(),
            exposed_ports: config
                .exposed_ports
                .unwrap_or_default()
                .into_keys()
                .collect(),
        })
    }

    async fn remove_image(&self, reference: &str) -> EngineResult<Vec<ImageDeletion>> {
        let options = RemoveImageOptions {
            force: true,
            noprune: false,
            ..Default::default()
        };

        let removed = self
            .docker
            .remove_image(reference, Some(options), None)
            .await?;

        Ok(removed
            .into_iter()
            .map(|item| ImageDeletion {
                untagged: item.untagged,
                deleted: item.deleted,
            })
            .collect())
    }

    async fn pull_image(&self, reference: &str) -> EngineResult<PullSummary> {
        let mut stream = self.docker.create_image(
            Some(CreateImageOptions {
                from_image: Some(reference.to_string()),
                ..Default::default()
            }),
            None,
            None,
        );

        let mut last_status = String::new();
        while let Some(result) = stream.next().await {
            let info = result?;
            if let Some(status) = info.status {
                debug!("Pull status: {}", status);
                last_status = status;
            }
            if let Some(progress) = info.progress {
                debug!("Pull progress: {}", progress);
            }
        }

        info!("Successfully pulled image: {}", reference);
        Ok(PullSummary {
            image: reference.to_string(),
            status: last_status,
        })
    }

    async fn search_images(&self, term: &str, limit: u32) -> EngineResult<Vec<SearchHit>> {
        let options = SearchImagesOptions {
            term: term.to_string(),
            limit: Some(i32::try_from(limit).unwrap_or(i32::MAX)),
            ..Default::default()
        };

        let results = self.docker.search_images(options).await?;

        Ok(results
            .into_iter()
            .map(|item| SearchHit {
                name: item.name.unwrap_or_default(),
                description: item.description.unwrap_or_default(),
                star_count: item.star_count.unwrap_or(0),
                is_official: item.is_official.unwrap_or(false),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::ContainerPlan;

    #[test]
    fn test_split_port_key() {
        assert_eq!(split_port_key("8080/tcp"), Some((8080, "tcp".to_string())));
        assert_eq!(split_port_key("53/udp"), Some((53, "udp".to_string())));
        assert_eq!(split_port_key("bogus/tcp"), None);
    }

    #[test]
    fn test_plan_to_body_binds_port() {
        let plan = ContainerPlan::builder()
            .image("nginx:latest")
            .cmd(vec!["nginx", "-g", "daemon off;"])
            .port_binding(80, Some(8080))
            .build()
            .unwrap();

        let body = plan_to_body(&plan);
        assert_eq!(body.image.as_deref(), Some("nginx:latest"));
        assert_eq!(body.tty, Some(false));

        let exposed = body.exposed_ports.unwrap();
        assert_eq!(exposed.keys().collect::<Vec<_>>(), vec!["80/tcp"]);

        let bindings = body.host_config.unwrap().port_bindings.unwrap();
        let binding = bindings["80/tcp"].as_ref().unwrap();
        assert_eq!(binding[0].host_port.as_deref(), Some("8080"));
    }

    #[test]
    fn test_plan_to_body_without_ports() {
        let plan = ContainerPlan::builder().image("alpine").build().unwrap();
        let body = plan_to_body(&plan);
        assert!(body.exposed_ports.is_none());
        assert!(body.host_config.unwrap().port_bindings.is_none());
    }

    #[tokio::test]
    #[ignore] // Requires Docker/Podman to be running
    async fn test_version_probe() {
        let engine = DockerEngine::new().unwrap();
        let version = engine.version().await.unwrap();
        println!("Engine version: {}", version);
    }
}
