use std::sync::Arc;
use std::time::Duration;

use regsync::ChangeWatcher;
use regsync::FailureClass;
use regsync::Registry;
use regsync::WatchSignal;

use crate::common::fast_retry;
use crate::common::registration;
use crate::common::MemoryRegistry;

/// Longest a watcher may take to report a change that is already recorded
const DELIVERY_TIMEOUT: Duration = Duration::from_millis(500);

async fn next_change(watcher: &mut ChangeWatcher<MemoryRegistry>) -> String {
    match tokio::time::timeout(DELIVERY_TIMEOUT, watcher.next_signal()).await {
        Ok(WatchSignal::Changed(event)) => event.node.value,
        Ok(other) => panic!("expected a change, got {other:?}"),
        Err(_) => panic!("change made before the subscription was never delivered"),
    }
}

/// # Case: a registration changes after the full read but before the watcher
/// subscribes
///
/// Expected: the watcher started after the read's index still delivers it
#[tokio::test]
async fn change_between_read_and_subscription_should_be_delivered() {
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));

    let index = registry.read_index().await.unwrap();
    let read = registry.get("/services").await.unwrap();
    assert_eq!(read.nodes.len(), 1);
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.4.4"));

    let mut watcher =
        ChangeWatcher::new(registry.clone(), "/services", true, fast_retry()).resume_after(index);

    assert_eq!(
        next_change(&mut watcher).await,
        registration("heartOfGold", "8.8.4.4")
    );
}

/// # Case: the watch breaks, the consumer resyncs and a change lands before
/// the watcher subscribes again
///
/// Expected: the watcher resumes after the index it read before requesting
/// the resync, so the change arrives as an event
#[tokio::test]
async fn change_between_resync_and_resubscription_should_be_delivered() {
    let registry = Arc::new(MemoryRegistry::new());
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.8.8"));
    let index = registry.read_index().await.unwrap();
    let mut watcher =
        ChangeWatcher::new(registry.clone(), "/services", true, fast_retry()).resume_after(index);

    registry.set_unavailable(true);
    let (signal, ()) = tokio::join!(watcher.next_signal(), async {
        tokio::time::sleep(Duration::from_millis(20)).await;
        registry.set_unavailable(false);
    });
    assert_eq!(signal, WatchSignal::Resync(FailureClass::BackendUnavailable));

    // the consumer's full read, then a change before the next long-poll
    registry.get("/services").await.unwrap();
    registry.set("/services/heartOfGold/1", &registration("heartOfGold", "8.8.4.4"));

    assert_eq!(
        next_change(&mut watcher).await,
        registration("heartOfGold", "8.8.4.4")
    );
}
