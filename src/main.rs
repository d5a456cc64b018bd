use anyhow::Context;
use dockgate::api::{ApiServer, AppState};
use dockgate::cli::{Args, CheckConfig, ConfigDiscovery, DockgateConfig, ExecutionMode, ServeConfig};
use dockgate::container::DockerEngine;
use dockgate::daemon::{DaemonMonitor, DaemonStatus};
use dockgate::env;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging
    let filter = match &args.log_level {
        Some(level) => EnvFilter::try_new(level)
            .with_context(|| format!("Invalid log level '{}'", level))?,
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(env::DEFAULT_LOG_FILTER)),
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match args.mode() {
        ExecutionMode::Serve(config) => run_serve(config).await,
        ExecutionMode::Check(config) => run_check(config).await,
        ExecutionMode::ShowConfig { config_override } => {
            ConfigDiscovery::show_discovery_info();
            let config = load_config(config_override.as_deref())?;
            println!();
            println!("Effective configuration:");
            println!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

fn load_config(config_override: Option<&Path>) -> anyhow::Result<DockgateConfig> {
    let (config, _source) = ConfigDiscovery::discover_config(config_override)?;
    Ok(config)
}

fn connect(config: &DockgateConfig) -> anyhow::Result<Arc<DockerEngine>> {
    let engine = DockerEngine::with_config(&config.engine_client_config())
        .context("Failed to create engine client")?;
    Ok(Arc::new(engine))
}

async fn run_serve(serve: ServeConfig) -> anyhow::Result<()> {
    let mut config = load_config(serve.config_override.as_deref())?;
    if let Some(bind) = serve.bind {
        config.bind = bind;
    }
    if serve.docker_host.is_some() {
        config.docker_host = serve.docker_host;
    }

    info!("Starting dockgate {}", env!("CARGO_PKG_VERSION"));
    let engine = connect(&config)?;
    let state = AppState::from_engine(engine, &config);

    // Not fatal: the gateway can start the daemon on request
    match state.monitor.check().await {
        DaemonStatus::Up => info!("Engine daemon is reachable"),
        DaemonStatus::Down => warn!("Engine daemon is not reachable; GET /docker/status/start can launch it"),
    }

    ApiServer::new(config.bind, state)
        .run_with_shutdown(shutdown_signal())
        .await
}

async fn run_check(check: CheckConfig) -> anyhow::Result<()> {
    let mut config = load_config(check.config_override.as_deref())?;
    if check.docker_host.is_some() {
        config.docker_host = check.docker_host;
    }

    let monitor = DaemonMonitor::new(connect(&config)?);
    // The process exits right after, so wait for the bootstrap chain here
    let status = if check.start {
        monitor.start_and_wait().await?
    } else {
        monitor.check().await
    };

    match status {
        DaemonStatus::Up => {
            let version = monitor.require_up().await?;
            println!("docker is running (version {})", version);
            Ok(())
        }
        DaemonStatus::Down if check.start => {
            println!("docker is starting, retry shortly");
            std::process::exit(2);
        }
        DaemonStatus::Down => {
            error!("Engine daemon is not reachable");
            println!("docker not running");
            std::process::exit(1);
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
