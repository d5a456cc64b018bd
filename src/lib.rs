//! # dockgate
//!
//! HTTP control plane for a local Docker-compatible container engine.
//!
//! ## Architecture Overview
//!
//! - **[`container`]**: engine adapter, idempotent container provisioning,
//!   host-port conflict detection and image passthroughs
//! - **[`daemon`]**: engine liveness probe and platform bootstrap
//! - **[`api`]**: axum gateway exposing both under `/docker/...`
//! - **[`cli`]**: argument parsing and configuration discovery
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use dockgate::api::{ApiServer, AppState};
//! use dockgate::cli::DockgateConfig;
//! use dockgate::container::DockerEngine;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = DockgateConfig::default();
//!     let engine = Arc::new(DockerEngine::with_config(&config.engine_client_config())?);
//!     let state = AppState::from_engine(engine, &config);
//!
//!     ApiServer::new(config.bind, state)
//!         .run_with_shutdown(async {
//!             let _ = tokio::signal::ctrl_c().await;
//!         })
//!         .await
//! }
//! ```

/// Container and image lifecycle over the engine.
pub mod container;

/// Engine daemon availability monitor and bootstrap.
pub mod daemon;

/// HTTP gateway.
pub mod api;

/// Command line parsing and configuration.
pub mod cli;

/// Environment constants and path utilities.
pub mod env;

pub use api::{ApiServer, AppState};
pub use cli::DockgateConfig;
pub use container::{
    ContainerError, ContainerLifecycleManager, ContainerSpec, DockerEngine, Engine, MockEngine,
};
pub use daemon::{DaemonError, DaemonMonitor, DaemonStatus};
