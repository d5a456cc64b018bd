//! Engine daemon availability.
//!
//! [`DaemonMonitor`] probes the engine's version endpoint and, when the daemon
//! is down, launches the platform's bootstrap commands. Neither entry point
//! waits for the daemon itself to come up. Nothing is cached: every call probes
//! again.

pub mod bootstrap;

pub use bootstrap::{BootstrapCommand, Launcher, Platform, SystemLauncher, strategy_for};

use crate::container::Engine;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Daemon monitor errors.
#[derive(Debug, thiserror::Error)]
pub enum DaemonError {
    /// No bootstrap strategy exists for this OS
    #[error("Unsupported operating system: {0}")]
    UnsupportedPlatform(String),

    /// The daemon did not answer the probe
    #[error("Engine daemon unreachable: {0}")]
    Unreachable(String),

    /// None of the bootstrap commands could be launched
    #[error("Failed to start engine daemon: {0}")]
    BootstrapFailed(String),
}

/// Result type for daemon operations.
pub type Result<T> = std::result::Result<T, DaemonError>;

/// Outcome of a single probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DaemonStatus {
    Up,
    Down,
}

impl DaemonStatus {
    pub fn is_up(self) -> bool {
        self == DaemonStatus::Up
    }
}

/// Probes the engine and bootstraps it when it is down.
#[derive(Clone)]
pub struct DaemonMonitor {
    engine: Arc<dyn Engine>,
    platform: Platform,
    launcher: Arc<dyn Launcher>,
}

impl DaemonMonitor {
    /// Monitor for the current platform using real processes.
    pub fn new(engine: Arc<dyn Engine>) -> Self {
        Self::with_launcher(engine, Platform::current(), Arc::new(SystemLauncher::new()))
    }

    /// Monitor with an explicit platform and launcher.
    pub fn with_launcher(
        engine: Arc<dyn Engine>,
        platform: Platform,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self {
            engine,
            platform,
            launcher,
        }
    }

    pub fn platform(&self) -> &Platform {
        &self.platform
    }

    /// Probe the daemon once. Any error counts as down.
    pub async fn check(&self) -> DaemonStatus {
        match self.engine.version().await {
            Ok(version) => {
                debug!("Engine daemon is up (version {})", version);
                DaemonStatus::Up
            }
            Err(e) => {
                debug!("Engine daemon is down: {}", e);
                DaemonStatus::Down
            }
        }
    }

    /// Probe the daemon, returning its version or [`DaemonError::Unreachable`].
    ///
    /// # Errors
    ///
    /// Returns error if the probe fails.
    pub async fn require_up(&self) -> Result<String> {
        self.engine
            .version()
            .await
            .map_err(|e| DaemonError::Unreachable(e.to_string()))
    }

    /// Make sure the daemon is running or being started.
    ///
    /// Returns [`DaemonStatus::Up`] if the probe succeeds. Otherwise the
    /// platform's bootstrap commands are launched in the background and
    /// [`DaemonStatus::Down`] is returned right away; callers should probe
    /// again after a few seconds.
    ///
    /// # Errors
    ///
    /// - [`DaemonError::UnsupportedPlatform`] when the OS has no strategy
    /// - [`DaemonError::BootstrapFailed`] when none of its tools are installed
    pub async fn ensure_running(&self) -> Result<DaemonStatus> {
        if self.check().await.is_up() {
            return Ok(DaemonStatus::Up);
        }

        let chain = self.bootstrap_plan()?;
        info!(
            "Engine daemon is down; starting it with '{}'. Retry in a few seconds.",
            chain[0]
        );
        self.launcher.spawn(chain);

        Ok(DaemonStatus::Down)
    }

    /// Like [`ensure_running`](Self::ensure_running), but waits for the
    /// bootstrap commands to finish. For one-shot callers that exit afterwards.
    ///
    /// # Errors
    ///
    /// Same as `ensure_running`, plus [`DaemonError::BootstrapFailed`] when
    /// every launched command fails.
    pub async fn start_and_wait(&self) -> Result<DaemonStatus> {
        if self.check().await.is_up() {
            return Ok(DaemonStatus::Up);
        }

        let chain = self.bootstrap_plan()?;
        info!("Engine daemon is down; starting it with '{}'", chain[0]);
        if !self.launcher.run(chain).await {
            return Err(DaemonError::BootstrapFailed(format!(
                "every bootstrap command failed on {}",
                self.platform
            )));
        }

        Ok(DaemonStatus::Down)
    }

    /// Bootstrap commands for this platform whose tools are all installed.
    fn bootstrap_plan(&self) -> Result<Vec<BootstrapCommand>> {
        let strategy = strategy_for(&self.platform)
            .ok_or_else(|| DaemonError::UnsupportedPlatform(self.platform.to_string()))?;

        let chain: Vec<BootstrapCommand> = strategy
            .into_iter()
            .filter(|command| {
                command
                    .requires
                    .iter()
                    .all(|tool| self.launcher.is_available(tool))
            })
            .collect();

        if chain.is_empty() {
            warn!(
                "No bootstrap tool available on {}; cannot start the engine daemon",
                self.platform
            );
            return Err(DaemonError::BootstrapFailed(format!(
                "no bootstrap command available on {}",
                self.platform
            )));
        }

        Ok(chain)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::MockEngine;
    use futures::FutureExt;
    use futures::future::BoxFuture;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingLauncher {
        installed: Vec<&'static str>,
        succeeds: bool,
        launched: Mutex<Vec<Vec<BootstrapCommand>>>,
        awaited: Mutex<Vec<Vec<BootstrapCommand>>>,
    }

    impl Launcher for RecordingLauncher {
        fn is_available(&self, tool: &str) -> bool {
            self.installed.contains(&tool)
        }

        fn run(&self, chain: Vec<BootstrapCommand>) -> BoxFuture<'static, bool> {
            self.awaited.lock().unwrap().push(chain);
            futures::future::ready(self.succeeds).boxed()
        }

        fn spawn(&self, chain: Vec<BootstrapCommand>) {
            self.launched.lock().unwrap().push(chain);
        }
    }

    fn monitor(
        reachable: bool,
        platform: Platform,
        installed: Vec<&'static str>,
    ) -> (DaemonMonitor, Arc<RecordingLauncher>) {
        let engine = Arc::new(MockEngine::new());
        engine.set_reachable(reachable);
        let launcher = Arc::new(RecordingLauncher {
            installed,
            ..Default::default()
        });
        (
            DaemonMonitor::with_launcher(engine, platform, launcher.clone()),
            launcher,
        )
    }

    #[tokio::test]
    async fn test_up_has_no_side_effect() {
        let (monitor, launcher) = monitor(true, Platform::Linux, vec!["sudo", "systemctl"]);
        assert_eq!(monitor.ensure_running().await.unwrap(), DaemonStatus::Up);
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_down_launches_and_returns_promptly() {
        let (monitor, launcher) = monitor(false, Platform::MacOs, vec!["open"]);
        let status = tokio::time::timeout(Duration::from_secs(1), monitor.ensure_running())
            .await
            .expect("ensure_running must not wait for the daemon")
            .unwrap();

        assert_eq!(status, DaemonStatus::Down);
        let launched = launcher.launched.lock().unwrap();
        assert_eq!(launched.len(), 1);
        assert_eq!(launched[0][0].program, "open");
    }

    #[tokio::test]
    async fn test_linux_falls_back_to_service() {
        let (monitor, launcher) = monitor(false, Platform::Linux, vec!["sudo", "service"]);
        monitor.ensure_running().await.unwrap();

        let launched = launcher.launched.lock().unwrap();
        assert_eq!(launched[0].len(), 1);
        assert_eq!(launched[0][0].requires, vec!["sudo", "service"]);
    }

    #[tokio::test]
    async fn test_linux_without_sudo_cannot_bootstrap() {
        let (monitor, launcher) =
            monitor(false, Platform::Linux, vec!["systemctl", "service"]);
        assert!(matches!(
            monitor.ensure_running().await,
            Err(DaemonError::BootstrapFailed(_))
        ));
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_start_and_wait_awaits_whole_chain() {
        let engine = Arc::new(MockEngine::new());
        engine.set_reachable(false);
        let launcher = Arc::new(RecordingLauncher {
            installed: vec!["sudo", "systemctl", "service"],
            succeeds: true,
            ..Default::default()
        });
        let monitor = DaemonMonitor::with_launcher(engine, Platform::Linux, launcher.clone());

        assert_eq!(monitor.start_and_wait().await.unwrap(), DaemonStatus::Down);
        assert!(launcher.launched.lock().unwrap().is_empty());
        let awaited = launcher.awaited.lock().unwrap();
        assert_eq!(awaited.len(), 1);
        assert_eq!(awaited[0].len(), 2);
    }

    #[tokio::test]
    async fn test_start_and_wait_reports_failed_chain() {
        let (monitor, launcher) = monitor(false, Platform::MacOs, vec!["open"]);
        assert!(matches!(
            monitor.start_and_wait().await,
            Err(DaemonError::BootstrapFailed(_))
        ));
        assert_eq!(launcher.awaited.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_platform() {
        let (monitor, launcher) =
            monitor(false, Platform::Other("plan9".to_string()), vec!["open"]);
        assert!(matches!(
            monitor.ensure_running().await,
            Err(DaemonError::UnsupportedPlatform(os)) if os == "plan9"
        ));
        assert!(launcher.launched.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_tools_installed() {
        let (monitor, _launcher) = monitor(false, Platform::Linux, Vec::new());
        assert!(matches!(
            monitor.ensure_running().await,
            Err(DaemonError::BootstrapFailed(_))
        ));
    }

    #[tokio::test]
    async fn test_check_probes_fresh_each_time() {
        let engine = Arc::new(MockEngine::new());
        let monitor = DaemonMonitor::with_launcher(
            engine.clone(),
            Platform::Linux,
            Arc::new(RecordingLauncher::default()),
        );

        assert_eq!(monitor.check().await, DaemonStatus::Up);
        engine.set_reachable(false);
        assert_eq!(monitor.check().await, DaemonStatus::Down);
        assert!(matches!(
            monitor.require_up().await,
            Err(DaemonError::Unreachable(_))
        ));
    }
}
