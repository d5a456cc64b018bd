//! Run requests and container creation plans.
//!
//! A [`ContainerSpec`] is what a caller asks for. It is validated into a
//! [`ValidatedSpec`] with typed ports, which is then turned into an
//! engine-neutral [`ContainerPlan`] through [`ContainerPlanBuilder`].

use crate::container::{ContainerError, Result};
use serde::{Deserialize, Serialize};

/// A declarative run request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ContainerSpec {
    /// Image reference to run
    pub image_name: String,
    /// Container name, used as the idempotency key
    pub container_name: String,
    /// Command override
    #[serde(default)]
    pub cmd: Option<Vec<String>>,
    /// Host port to publish on
    #[serde(default)]
    pub host_port: Option<String>,
    /// Port inside the container
    #[serde(default)]
    pub container_port: Option<String>,
}

/// A run request whose fields have been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedSpec {
    pub image: String,
    pub name: String,
    pub cmd: Option<Vec<String>>,
    pub host_port: Option<u16>,
    pub container_port: Option<u16>,
}

impl ContainerSpec {
    /// Check required fields and parse ports.
    ///
    /// # Errors
    ///
    /// Returns [`ContainerError::Validation`] for empty image or name, for a
    /// port that is not a number in 1-65535, or for a host port without a
    /// container port to bind it to.
    pub fn validate(&self) -> Result<ValidatedSpec> {
        let image = self.image_name.trim();
        if image.is_empty() {
            return Err(ContainerError::Validation(
                "imageName is required".to_string(),
            ));
        }

        let name = self.container_name.trim();
        if name.is_empty() {
            return Err(ContainerError::Validation(
                "containerName is required".to_string(),
            ));
        }

        let host_port = parse_port("hostPort", self.host_port.as_deref())?;
        let container_port = parse_port("containerPort", self.container_port.as_deref())?;

        if host_port.is_some() && container_port.is_none() {
            return Err(ContainerError::Validation(
                "hostPort requires containerPort".to_string(),
            ));
        }

        let cmd = self.cmd.clone().filter(|cmd| !cmd.is_empty());

        Ok(ValidatedSpec {
            image: image.to_string(),
            name: name.to_string(),
            cmd,
            host_port,
            container_port,
        })
    }
}

/// Parse an optional string-encoded TCP port. Blank counts as absent.
pub fn parse_port(field: &str, raw: Option<&str>) -> Result<Option<u16>> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<u16>() {
        Ok(0) | Err(_) => Err(ContainerError::Validation(format!(
            "{field} must be a port number between 1 and 65535, got '{raw}'"
        ))),
        Ok(port) => Ok(Some(port)),
    }
}

/// Port binding of a plan: `container_port/tcp` published on `host_port`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlannedBinding {
    pub container_port: u16,
    /// `None` lets the engine pick an ephemeral host port
    pub host_port: Option<u16>,
}

impl PlannedBinding {
    /// Engine port key, e.g. `8080/tcp`.
    pub fn port_key(&self) -> String {
        format!("{}/tcp", self.container_port)
    }
}

/// Engine-neutral container creation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerPlan {
    pub image: String,
    pub cmd: Option<Vec<String>>,
    pub tty: bool,
    pub binding: Option<PlannedBinding>,
}

impl ContainerPlan {
    /// Create a new plan builder.
    pub fn builder() -> ContainerPlanBuilder {
        ContainerPlanBuilder::new()
    }
}

impl TryFrom<&ValidatedSpec> for ContainerPlan {
    type Error = ContainerError;

    fn try_from(spec: &ValidatedSpec) -> Result<Self> {
        let mut builder = ContainerPlan::builder().image(&spec.image).tty(false);
        if let Some(cmd) = &spec.cmd {
            builder = builder.cmd(cmd.iter().cloned());
        }
        if let Some(container_port) = spec.container_port {
            builder = builder.port_binding(container_port, spec.host_port);
        }
        builder.build()
    }
}

/// Fluent builder for [`ContainerPlan`].
#[derive(Debug, Default)]
pub struct ContainerPlanBuilder {
    image: Option<String>,
    cmd: Option<Vec<String>>,
    tty: bool,
    binding: Option<PlannedBinding>,
}

impl ContainerPlanBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container image.
    pub fn image<S: Into<String>>(mut self, image: S) -> Self {
        self.image = Some(image.into());
        self
    }

    /// Set the command to run in the container.
    pub fn cmd<I, S>(mut self, cmd: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.cmd = Some(cmd.into_iter().map(|s| s.into()).collect());
        self
    }

    /// Allocate a TTY.
    pub fn tty(mut self, enable: bool) -> Self {
        self.tty = enable;
        self
    }

    /// Publish `container_port/tcp` on `host_port`.
    pub fn port_binding(mut self, container_port: u16, host_port: Option<u16>) -> Self {
        self.binding = Some(PlannedBinding {
            container_port,
            host_port,
        });
        self
    }

    /// Build the plan.
    ///
    /// # Errors
    ///
    /// Returns error if no image was set.
    pub fn build(self) -> Result<ContainerPlan> {
        let image = self
            .image
            .filter(|image| !image.is_empty())
            .ok_or_else(|| ContainerError::Validation("Image is required".to_string()))?;

        Ok(ContainerPlan {
            image,
            cmd: self.cmd,
            tty: self.tty,
            binding: self.binding,
        })
    }
}
