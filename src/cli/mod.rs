//! CLI-specific functionality
//!
//! Argument parsing and configuration discovery for the `dockgate` binary.

pub mod args;
pub mod config;

pub use args::{Args, CheckConfig, Commands, ExecutionMode, ServeConfig};
pub use config::{ConfigDiscovery, ConfigError, DockgateConfig};
