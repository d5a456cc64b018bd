//! HTTP gateway.
//!
//! Maps REST calls under `/docker/...` onto the lifecycle manager, the image
//! catalog and the daemon monitor. Every response body is `{"data": ...}`.

pub mod error;
pub mod extract;
pub mod handlers;
pub mod router;
pub mod server;

pub use error::{ApiError, Envelope};
pub use router::build_router;
pub use server::ApiServer;

use std::sync::Arc;
use std::time::Duration;

use crate::cli::DockgateConfig;
use crate::container::{ContainerLifecycleManager, Engine, ImageCatalog};
use crate::daemon::DaemonMonitor;

/// Shared handler state. Cloned per request; all fields share one engine handle.
#[derive(Clone)]
pub struct AppState {
    pub manager: ContainerLifecycleManager,
    pub images: ImageCatalog,
    pub monitor: DaemonMonitor,
    /// Grace period passed to every stop
    pub stop_grace: Duration,
}

impl AppState {
    pub fn new(
        manager: ContainerLifecycleManager,
        images: ImageCatalog,
        monitor: DaemonMonitor,
        stop_grace: Duration,
    ) -> Self {
        Self {
            manager,
            images,
            monitor,
            stop_grace,
        }
    }

    /// Wire every component to `engine`, with the host's bootstrap launcher.
    pub fn from_engine(engine: Arc<dyn Engine>, config: &DockgateConfig) -> Self {
        Self::new(
            ContainerLifecycleManager::new(Arc::clone(&engine)),
            ImageCatalog::with_limits(Arc::clone(&engine), config.search_limits()),
            DaemonMonitor::new(engine),
            config.stop_grace(),
        )
    }
}
