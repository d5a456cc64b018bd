//! Integration tests against a live engine.
//!
//! These tests verify the bollard adapter end-to-end with Docker/Podman.
//! Tests are skipped if Docker/Podman is not available or SKIP_CONTAINER_TESTS=1.

use dockgate::container::{
    ContainerError, ContainerLifecycleManager, ContainerSpec, DockerEngine, Engine, ImageCatalog,
};
use dockgate::daemon::{DaemonMonitor, DaemonStatus};
use serial_test::serial;
use std::sync::Arc;
use std::time::Duration;
use test_tag::tag;

const TEST_IMAGE: &str = "alpine:3.20";
const TEST_CONTAINER: &str = "dockgate-integration-test";

/// Check if container tests should run.
fn should_run_container_tests() -> bool {
    if let Ok(value) = std::env::var("SKIP_CONTAINER_TESTS") {
        if value == "1" || value.eq_ignore_ascii_case("true") {
            return false;
        }
    }

    ["docker", "podman"].iter().any(|cli| {
        std::process::Command::new(cli)
            .arg("info")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    })
}

fn engine() -> Arc<DockerEngine> {
    Arc::new(DockerEngine::new().expect("Failed to create engine client"))
}

/// Cleanup helper - removes the test container if it exists.
async fn cleanup(engine: &DockerEngine) {
    let _ = engine.remove_container(TEST_CONTAINER, true).await;
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_daemon_is_up() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests (Docker/Podman not available or SKIP_CONTAINER_TESTS=1)");
        return;
    }

    let monitor = DaemonMonitor::new(engine());
    assert_eq!(monitor.check().await, DaemonStatus::Up);
    let version = monitor.require_up().await.unwrap();
    assert!(!version.is_empty());
}

#[tokio::test]
#[serial]
#[tag(integration, container)]
async fn test_list_images_and_containers() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let engine = engine();
    let catalog = ImageCatalog::new(engine.clone());
    let manager = ContainerLifecycleManager::new(engine);

    assert!(catalog.list().await.is_ok());
    assert!(manager.list_containers().await.is_ok());
}

#[tokio::test]
#[serial]
#[tag(integration, container, slow)]
async fn test_provision_reuse_and_stop() {
    if !should_run_container_tests() {
        eprintln!("Skipping container tests");
        return;
    }

    let engine = engine();
    cleanup(&engine).await;

    let catalog = ImageCatalog::new(engine.clone());
    catalog.pull(TEST_IMAGE).await.expect("Failed to pull test image");

    let manager = ContainerLifecycleManager::new(engine.clone());
    let spec = ContainerSpec {
        image_name: TEST_IMAGE.to_string(),
        container_name: TEST_CONTAINER.to_string(),
        cmd: Some(vec!["sleep".to_string(), "300".to_string()]),
        ..Default::default()
    };

    let id = manager.provision_and_run(&spec).await.unwrap();
    assert!(engine.inspect_container(&id).await.unwrap().is_running());

    let again = manager.provision_and_run(&spec).await.unwrap();
    assert_eq!(id, again);

    manager.stop(&id, Duration::from_secs(1)).await.unwrap();
    manager.stop(&id, Duration::from_secs(1)).await.unwrap();
    assert!(!engine.inspect_container(&id).await.unwrap().is_running());

    let run = manager.describe_run_command(TEST_IMAGE).await.unwrap();
    assert!(!run.cmd.is_empty() || !run.entrypoint.is_empty());

    manager.remove(&id).await.unwrap();
    assert!(matches!(
        manager.stop(&id, Duration::from_secs(1)).await,
        Err(ContainerError::NotFound(_))
    ));
}
