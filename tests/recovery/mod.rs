use std::sync::Arc;
use std::time::Duration;

use regsync::CommitError;
use regsync::Error;
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

/// # Case: the backend goes away and a change happens meanwhile
///
/// Expected: the change produces no event, but the resync after the watch
/// recovers picks it up from a full read
#[tokio::test]
async fn unavailable_backend_should_trigger_resync() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));

    let mut config = service_config(dir.path());
    config.ignore_state = true;
    let target = config.target.clone();
    let settings = Settings {
        retry: fast_retry(),
        service: Some(config),
        ..Default::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let runtime = Runtime::from_settings(registry.clone(), &settings, shutdown_rx).await;
    wait_for_content(&target, "heartOfGold http://8.8.8.8 \n").await;

    registry.set_unavailable(true);
    registry.set_silently("/services/heartOfGold/1", &registration("heartOfGold", "8.8.4.4"));
    tokio::time::sleep(Duration::from_millis(200)).await;
    // passes fail while the backend is gone; the last artifact stays
    assert_eq!(
        std::fs::read_to_string(&target).unwrap(),
        "heartOfGold http://8.8.8.8 \n"
    );

    registry.set_unavailable(false);
    wait_for_content(&target, "heartOfGold http://8.8.4.4 \n").await;

    shutdown_tx.send(()).unwrap();
    runtime.join().await;
}

#[tokio::test]
async fn rejected_candidate_should_keep_previous_artifact() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));

    let mut config = service_config(dir.path());
    config.ignore_state = true;
    config.pre_command = Some(format!("! grep -q 8.8.4.4 '{}'", config.target.display()));
    let target = ServiceTarget::new(registry.clone(), config);

    target.reconcile().await.unwrap();
    let accepted = std::fs::read(target.writer().target()).unwrap();

    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.4.4"));
    let e = target.reconcile().await.unwrap_err();

    assert!(matches!(e, Error::Commit(CommitError::Validation { .. })));
    assert_eq!(std::fs::read(target.writer().target()).unwrap(), accepted);
}

/// # Case: the reload command fails
///
/// Expected: the artifact is committed anyway and later changes still arrive
#[tokio::test]
async fn failing_reload_should_not_stop_runtime() {
    let dir = tempdir().unwrap();
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));

    let mut config = service_config(dir.path());
    config.ignore_state = true;
    config.post_command = Some("exit 1".into());
    let target = config.target.clone();
    let settings = Settings {
        retry: fast_retry(),
        service: Some(config),
        ..Default::default()
    };
    let (shutdown_tx, shutdown_rx) = watch::channel(());
    let runtime = Runtime::from_settings(registry.clone(), &settings, shutdown_rx).await;
    wait_for_content(&target, "heartOfGold http://8.8.8.8 \n").await;

    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.4.4"));
    wait_for_content(&target, "heartOfGold http://8.8.4.4 \n").await;

    shutdown_tx.send(()).unwrap();
    runtime.join().await;
}
