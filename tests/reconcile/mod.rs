use std::sync::Arc;
use std::time::Duration;

use regsync::Reconcile;
use regsync::Runtime;
use regsync::ServiceTarget;
use regsync::Settings;
use tempfile::tempdir;
use tokio::sync::watch;

use crate::common::fast_retry;
use crate::common::registration;
use crate::common::service_config;
use crate::common::wait_for_content;
use crate::common::MemoryRegistry;
use crate::common::MAINTENANCE_KEY;

/// # Case: registrations come and go while the runtime is up
///
/// Expected: the proxy configuration follows every change, maintenance mode
/// replaces the service list while it is set
#[tokio::test]
async fn runtime_should_follow_registry_changes() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));
    registry.set("/state/heartOfGold", "ready");

    let config = service_config(dir.path());
    let target = config.target.clone();
    let settings = Settings {
        retry: fast_retry(),
        service: Some(config),
        ..Default::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let runtime = Runtime::from_settings(registry.clone(), &settings, shutdown_rx).await;

    wait_for_content(&target, "heartOfGold http://8.8.8.8 ready\n").await;

    registry.set(
        "/services/restaurantAtTheEndOfTheUniverse/1",
        &registration("restaurantAtTheEndOfTheUniverse", "8.8.4.4"),
    );
    wait_for_content(
        &target,
        "heartOfGold http://8.8.8.8 ready\nrestaurantAtTheEndOfTheUniverse http://8.8.4.4 not ready\n",
    )
    .await;

    registry.set(MAINTENANCE_KEY, r#"{"title": "Update", "text": "back soon"}"#);
    wait_for_content(&target, "maintenance").await;

    registry.delete(MAINTENANCE_KEY);
    registry.delete("/services/heartOfGold/1");
    wait_for_content(
        &target,
        "restaurantAtTheEndOfTheUniverse http://8.8.4.4 not ready\n",
    )
    .await;

    shutdown_tx.send(()).unwrap();
    runtime.join().await;
}

/// # Case: a registration without the configured tag changes
///
/// Expected: no pass runs, so the post-command does not fire
#[tokio::test]
async fn runtime_should_ignore_irrelevant_changes() {
    let dir = tempdir().unwrap();
    let reloads = dir.path().join("reloads");
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));

    let mut config = service_config(dir.path());
    config.ignore_state = true;
    config.post_command = Some(format!("echo reload >> '{}'", reloads.display()));
    let settings = Settings {
        retry: fast_retry(),
        service: Some(config),
        ..Default::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let runtime = Runtime::from_settings(registry.clone(), &settings, shutdown_rx).await;

    wait_for_content(&reloads, "reload\n").await;

    registry.set(
        "/services/plantuml/1",
        r#"{"name": "plantuml", "service": "1.2.3.4", "tags": ["internal"]}"#,
    );
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert_eq!(std::fs::read_to_string(&reloads).unwrap(), "reload\n");

    registry.set("/services/plantuml/2", &registration("plantuml", "1.2.3.4"));
    wait_for_content(&reloads, "reload\nreload\n").await;

    shutdown_tx.send(()).unwrap();
    runtime.join().await;
}

#[tokio::test]
async fn reconciling_twice_should_produce_identical_artifact() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));
    registry.set("/services/heartOfGold/2", &registration("heartOfGold", "8.8.8.9"));
    registry.set("/state/heartOfGold", "ready");
    let target = ServiceTarget::new(registry, service_config(dir.path()));

    target.reconcile().await.unwrap();
    let first = std::fs::read(target.writer().target()).unwrap();
    target.reconcile().await.unwrap();

    assert_eq!(std::fs::read(target.writer().target()).unwrap(), first);
    assert_eq!(
        String::from_utf8(first).unwrap(),
        "heartOfGold http://8.8.8.8 ready\nheartOfGold http://8.8.8.9 ready\n"
    );
}
