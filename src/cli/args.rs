//! Command line argument parsing
//!
//! Subcommands:
//! - `serve`: Run the HTTP gateway (default when no subcommand is given)
//! - `check`: Probe the engine daemon once and exit non-zero when it is down
//! - `show-config`: Show configuration discovery information

use clap::{Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Debug, PartialEq)]
pub enum ExecutionMode {
    Serve(ServeConfig),
    Check(CheckConfig),
    ShowConfig { config_override: Option<PathBuf> },
}

#[derive(Debug, Default, PartialEq)]
pub struct ServeConfig {
    pub config_override: Option<PathBuf>,
    pub bind: Option<SocketAddr>,
    pub docker_host: Option<String>,
}

#[derive(Debug, Default, PartialEq)]
pub struct CheckConfig {
    pub config_override: Option<PathBuf>,
    pub docker_host: Option<String>,
    /// Launch the platform bootstrap when the daemon is down
    pub start: bool,
}

#[derive(Debug, Parser)]
#[command(name = "dockgate")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "HTTP control plane for a local Docker-compatible container engine")]
#[command(long_about = None)]
pub struct Args {
    /// Configuration file path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. `debug` or `dockgate=trace` (overrides RUST_LOG)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the HTTP gateway
    Serve {
        /// Listen address, overrides the configured one
        #[arg(short = 'b', long = "bind")]
        bind: Option<SocketAddr>,
        /// Engine address (unix:// or tcp://), overrides the configured one
        #[arg(long = "docker-host")]
        docker_host: Option<String>,
    },
    /// Probe the engine daemon
    Check {
        /// Engine address (unix:// or tcp://), overrides the configured one
        #[arg(long = "docker-host")]
        docker_host: Option<String>,
        /// Try to start the daemon if it is down
        #[arg(long = "start")]
        start: bool,
    },
    /// Show configuration discovery information
    ShowConfig,
}

impl Args {
    pub fn parse() -> Self {
        Parser::parse()
    }

    pub fn mode(&self) -> ExecutionMode {
        let config_override = self.config.clone();
        match &self.command {
            None => ExecutionMode::Serve(ServeConfig {
                config_override,
                ..Default::default()
            }),
            Some(Commands::Serve { bind, docker_host }) => ExecutionMode::Serve(ServeConfig {
                config_override,
                bind: *bind,
                docker_host: docker_host.clone(),
            }),
            Some(Commands::Check { docker_host, start }) => ExecutionMode::Check(CheckConfig {
                config_override,
                docker_host: docker_host.clone(),
                start: *start,
            }),
            Some(Commands::ShowConfig) => ExecutionMode::ShowConfig { config_override },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_no_subcommand_serves() {
        let args = parse(&["dockgate"]);
        assert_eq!(args.mode(), ExecutionMode::Serve(ServeConfig::default()));
    }

    #[test]
    fn test_serve_overrides() {
        let args = parse(&[
            "dockgate",
            "serve",
            "--bind",
            "127.0.0.1:9000",
            "--docker-host",
            "tcp://10.0.0.2:2375",
        ]);

        match args.mode() {
            ExecutionMode::Serve(config) => {
                assert_eq!(config.bind, Some("127.0.0.1:9000".parse().unwrap()));
                assert_eq!(config.docker_host.as_deref(), Some("tcp://10.0.0.2:2375"));
            }
            other => panic!("Expected Serve mode, got {:?}", other),
        }
    }

    #[test]
    fn test_global_config_after_subcommand() {
        let args = parse(&["dockgate", "check", "--start", "-c", "/etc/dg.toml"]);
        assert_eq!(
            args.mode(),
            ExecutionMode::Check(CheckConfig {
                config_override: Some(PathBuf::from("/etc/dg.toml")),
                docker_host: None,
                start: true,
            })
        );
    }

    #[test]
    fn test_show_config() {
        let args = parse(&["dockgate", "show-config"]);
        assert_eq!(
            args.mode(),
            ExecutionMode::ShowConfig {
                config_override: None
            }
        );
    }

    #[test]
    fn test_invalid_bind_rejected() {
        assert!(Args::try_parse_from(["dockgate", "serve", "--bind", "nowhere"]).is_err());
    }
}
