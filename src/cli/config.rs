//! Configuration discovery and loading
//!
//! This module handles the configuration discovery hierarchy:
//! 1. Explicit `--config` path
//! 2. Current directory: ./dockgate.toml
//! 3. User config: ~/.dockgate/config.toml
//! 4. System config: /etc/dockgate/config.toml
//! 5. Built-in defaults

use crate::container::{EngineClientConfig, SearchLimits};
use crate::env;
use serde::{Deserialize, Serialize};
use std::env as std_env;
use std::fs;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Service configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DockgateConfig {
    /// Gateway listen address
    pub bind: SocketAddr,
    /// Grace period handed to the engine on stop, in seconds
    pub stop_grace_secs: u64,
    /// Engine address; `None` uses `DOCKER_HOST` or the local socket
    #[serde(skip_serializing_if = "Option::is_none")]
    pub docker_host: Option<String>,
    /// Engine request timeout, in seconds
    pub connect_timeout_secs: u64,
    /// Result limit for the popular-images listing
    pub search_default_limit: u32,
    /// Result limit for an explicit search
    pub search_query_limit: u32,
}

impl Default for DockgateConfig {
    fn default() -> Self {
        let limits = SearchLimits::default();
        Self {
            bind: SocketAddr::from((Ipv4Addr::UNSPECIFIED, 8081)),
            stop_grace_secs: 10,
            docker_host: None,
            connect_timeout_secs: 120,
            search_default_limit: limits.default_limit,
            search_query_limit: limits.query_limit,
        }
    }
}

impl DockgateConfig {
    /// Load from TOML file
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: DockgateConfig = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Save to TOML file
    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.search_default_limit == 0 || self.search_query_limit == 0 {
            return Err(ConfigError::Invalid(
                "search limits must be greater than zero".to_string(),
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigError::Invalid(
                "connect_timeout_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_secs(self.stop_grace_secs)
    }

    pub fn search_limits(&self) -> SearchLimits {
        SearchLimits {
            default_limit: self.search_default_limit,
            query_limit: self.search_query_limit,
        }
    }

    pub fn engine_client_config(&self) -> EngineClientConfig {
        EngineClientConfig {
            docker_host: self.docker_host.clone(),
            timeout: self.connect_timeout_secs,
        }
    }
}

/// Configuration discovery system
pub struct ConfigDiscovery;

impl ConfigDiscovery {
    /// Load `explicit` if given, otherwise the first file found in the
    /// hierarchy, otherwise defaults. Returns the file that was used.
    pub fn discover_config(explicit: Option<&Path>) -> Result<(DockgateConfig, Option<PathBuf>)> {
        if let Some(path) = explicit {
            info!("Loading configuration override from: {:?}", path);
            return Ok((DockgateConfig::from_toml_file(path)?, Some(path.to_path_buf())));
        }

        if let Some(config_path) = Self::find_config_file() {
            info!("Loading configuration from: {:?}", config_path);
            let config = DockgateConfig::from_toml_file(&config_path)?;
            return Ok((config, Some(config_path)));
        }

        info!("No configuration file found, using defaults");
        Ok((DockgateConfig::default(), None))
    }

    /// Find configuration file using discovery hierarchy
    pub fn find_config_file() -> Option<PathBuf> {
        Self::first_existing(Self::get_config_candidates())
    }

    fn first_existing(candidates: Vec<PathBuf>) -> Option<PathBuf> {
        for candidate in candidates {
            debug!("Checking for config file: {:?}", candidate);
            if candidate.is_file() {
                debug!("Found config file: {:?}", candidate);
                return Some(candidate);
            }
        }

        debug!("No config file found in discovery hierarchy");
        None
    }

    /// Get list of configuration file candidates in priority order
    fn get_config_candidates() -> Vec<PathBuf> {
        let current_dir = std_env::current_dir().ok();
        Self::candidates_from(current_dir.as_deref(), Self::get_home_dir().as_deref())
    }

    fn candidates_from(current_dir: Option<&Path>, home_dir: Option<&Path>) -> Vec<PathBuf> {
        let mut candidates = Vec::new();

        if let Some(dir) = current_dir {
            candidates.push(env::local_config_file_path(dir));
        }

        if let Some(home) = home_dir {
            candidates.push(env::user_config_file_path(home));
        }

        #[cfg(unix)]
        candidates.push(env::system_config_file_path());

        candidates
    }

    /// Get home directory path
    fn get_home_dir() -> Option<PathBuf> {
        std_env::var("HOME")
            .ok()
            .or_else(|| std_env::var("USERPROFILE").ok())
            .map(PathBuf::from)
    }

    /// Show configuration discovery information for debugging
    pub fn show_discovery_info() {
        println!("Configuration Discovery Hierarchy:");
        println!();

        let candidates = Self::get_config_candidates();
        for (i, candidate) in candidates.iter().enumerate() {
            let status = if candidate.exists() {
                if candidate.is_file() {
                    "EXISTS"
                } else {
                    "NOT A FILE"
                }
            } else {
                "NOT FOUND"
            };

            println!("  {}. {:?} - {}", i + 1, candidate, status);
        }

        println!();
        if let Some(found) = Self::find_config_file() {
            println!("Active configuration: {:?}", found);
        } else {
            println!("Active configuration: Built-in defaults");
        }
    }
}
