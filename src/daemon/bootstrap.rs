//! Platform bootstrap strategies for the engine daemon.
//!
//! Each supported platform maps to an ordered list of commands; the first one
//! whose tools are installed is run, later ones are fallbacks if it exits
//! unsuccessfully. The gateway launches the chain in the background since the
//! daemon can take several seconds to come up; one-shot callers await it.

use futures::FutureExt;
use futures::future::BoxFuture;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Host platform family, as far as bootstrapping is concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Platform {
    MacOs,
    Linux,
    Other(String),
}

impl Platform {
    /// The platform this binary runs on.
    pub fn current() -> Self {
        Self::from_os(std::env::consts::OS)
    }

    /// Map an OS identifier (`std::env::consts::OS` style) to a platform.
    pub fn from_os(os: &str) -> Self {
        match os {
            "macos" => Platform::MacOs,
            "linux" => Platform::Linux,
            other => Platform::Other(other.to_string()),
        }
    }

    pub fn id(&self) -> &str {
        match self {
            Platform::MacOs => "macos",
            Platform::Linux => "linux",
            Platform::Other(os) => os,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

/// A command that asks the OS to start the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapCommand {
    pub program: String,
    pub args: Vec<String>,
    /// Tools that must all be on PATH for this command to make sense
    pub requires: Vec<String>,
}

impl BootstrapCommand {
    fn new(program: &str, args: &[&str], requires: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            requires: requires.iter().map(|t| t.to_string()).collect(),
        }
    }
}

impl std::fmt::Display for BootstrapCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.program, self.args.join(" "))
    }
}

type Strategy = (
    &'static str,
    &'static [(&'static str, &'static [&'static str], &'static [&'static str])],
);

/// Bootstrap commands keyed by platform id, in preference order.
///
/// `sudo -n` never prompts; without cached credentials it fails and the next
/// entry is tried.
const STRATEGIES: &[Strategy] = &[
    ("macos", &[("open", &["-a", "Docker"], &["open"])]),
    (
        "linux",
        &[
            (
                "sudo",
                &["-n", "systemctl", "start", "docker"],
                &["sudo", "systemctl"],
            ),
            (
                "sudo",
                &["-n", "service", "docker", "start"],
                &["sudo", "service"],
            ),
        ],
    ),
];

/// Bootstrap commands for a platform, `None` when the platform is unsupported.
pub fn strategy_for(platform: &Platform) -> Option<Vec<BootstrapCommand>> {
    STRATEGIES
        .iter()
        .find(|(id, _)| *id == platform.id())
        .map(|(_, commands)| {
            commands
                .iter()
                .map(|(program, args, requires)| BootstrapCommand::new(program, args, requires))
                .collect()
        })
}

/// Runs bootstrap commands on the host.
pub trait Launcher: Send + Sync {
    /// Whether `tool` is installed.
    fn is_available(&self, tool: &str) -> bool;

    /// Run each command of `chain` in turn until one exits successfully.
    /// Resolves to `true` if one did.
    fn run(&self, chain: Vec<BootstrapCommand>) -> BoxFuture<'static, bool>;

    /// Run `chain` in the background. Returns without waiting for any command.
    fn spawn(&self, chain: Vec<BootstrapCommand>) {
        tokio::spawn(self.run(chain));
    }
}

/// [`Launcher`] that spawns real processes on the tokio runtime.
#[derive(Debug, Clone, Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }

    async fn run_chain(chain: Vec<BootstrapCommand>) -> bool {
        for command in &chain {
            debug!("Running bootstrap command: {}", command);

            let status = Command::new(&command.program)
                .args(&command.args)
                .stdin(Stdio::null())
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .await;

            match status {
                Ok(status) if status.success() => {
                    info!("Engine daemon is starting ({})", command);
                    return true;
                }
                Ok(status) => {
                    warn!("Bootstrap command '{}' exited with {}", command, status);
                }
                Err(e) => {
                    warn!("Bootstrap command '{}' could not be run: {}", command, e);
                }
            }
        }

        warn!("Failed to start the engine daemon; all bootstrap commands failed");
        false
    }
}

impl Launcher for SystemLauncher {
    fn is_available(&self, tool: &str) -> bool {
        which::which(tool).is_ok()
    }

    fn run(&self, chain: Vec<BootstrapCommand>) -> BoxFuture<'static, bool> {
        Self::run_chain(chain).boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_from_os() {
        assert_eq!(Platform::from_os("macos"), Platform::MacOs);
        assert_eq!(Platform::from_os("linux"), Platform::Linux);
        assert_eq!(
            Platform::from_os("freebsd"),
            Platform::Other("freebsd".to_string())
        );
    }

    #[test]
    fn test_macos_opens_desktop_app() {
        let chain = strategy_for(&Platform::MacOs).unwrap();
        assert_eq!(chain.len(), 1);
        assert_eq!(chain[0].program, "open");
        assert_eq!(chain[0].args, vec!["-a", "Docker"]);
    }

    #[test]
    fn test_linux_prefers_systemctl_then_service() {
        let chain = strategy_for(&Platform::Linux).unwrap();
        let required: Vec<_> = chain.iter().map(|c| c.requires.clone()).collect();
        assert_eq!(
            required,
            vec![
                vec!["sudo".to_string(), "systemctl".to_string()],
                vec!["sudo".to_string(), "service".to_string()],
            ]
        );
        assert!(chain.iter().all(|c| c.program == "sudo"));
    }

    #[test]
    fn test_unknown_platform_has_no_strategy() {
        assert!(strategy_for(&Platform::Other("windows".to_string())).is_none());
    }

    #[tokio::test]
    async fn test_failed_chain_reports_failure() {
        let chain = vec![BootstrapCommand::new(
            "dockgate-no-such-binary",
            &[],
            &["dockgate-no-such-binary"],
        )];
        assert!(!SystemLauncher::new().run(chain).await);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_chain_falls_through_to_next_command() {
        let chain = vec![
            BootstrapCommand::new("false", &[], &["false"]),
            BootstrapCommand::new("true", &[], &["true"]),
        ];
        assert!(SystemLauncher::new().run(chain).await);
    }
}
