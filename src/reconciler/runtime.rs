use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::info;
use tracing::warn;

use super::run_target;
use super::MaintenanceTarget;
use super::Reconcile;
use super::ServiceTarget;
use super::WarpTarget;
use crate::async_task::spawn_task;
use crate::ChangeWatcher;
use crate::Registry;
use crate::RetryPolicies;
use crate::Settings;

/// Signals a consumer can fall behind before its watchers wait
const SIGNAL_BUFFER: usize = 64;

/// Owns the watcher and consumer tasks of every managed target.
pub struct Runtime<R: Registry> {
    registry: Arc<R>,
    policies: RetryPolicies,
    shutdown: watch::Receiver<()>,
    /// Registry index read before any consumer's initial pass
    start_index: Option<u64>,
    watchers: Vec<JoinHandle<()>>,
    consumers: Vec<JoinHandle<()>>,
}

impl<R: Registry> Runtime<R> {
    pub fn new(
        registry: Arc<R>,
        policies: RetryPolicies,
        shutdown: watch::Receiver<()>,
    ) -> Self {
        Self {
            registry,
            policies,
            shutdown,
            start_index: None,
            watchers: Vec::new(),
            consumers: Vec::new(),
        }
    }

    /// Watchers spawned from now on resume right after `index`. The index
    /// must have been read before the targets are spawned.
    pub fn with_start_index(
        mut self,
        index: u64,
    ) -> Self {
        self.start_index = Some(index);
        self
    }

    /// Reads the registry index once, then spawns every target configured
    /// in `settings`.
    ///
    /// Without an index the watchers read their own and request a resync
    /// before subscribing.
    pub async fn from_settings(
        registry: Arc<R>,
        settings: &Settings,
        shutdown: watch::Receiver<()>,
    ) -> Self {
        let mut runtime = Self::new(registry.clone(), settings.retry, shutdown);
        match registry.read_index().await {
            Ok(index) => {
                info!("watching registry changes after index {index}");
                runtime = runtime.with_start_index(index);
            }
            Err(e) => warn!("failed to read the registry index, watchers will resync: {e}"),
        }

        if let Some(config) = &settings.service {
            runtime.spawn(ServiceTarget::new(registry.clone(), config.clone()));
        }
        if let Some(config) = &settings.warp {
            runtime.spawn(WarpTarget::new(registry.clone(), config.clone()));
        }
        if let Some(config) = &settings.maintenance {
            runtime.spawn(MaintenanceTarget::new(registry, config.clone()));
        }
        runtime
    }

    /// Starts one watcher per watch path of `target` and the consumer that
    /// reconciles it.
    pub fn spawn<T: Reconcile>(
        &mut self,
        target: T,
    ) {
        let target = Arc::new(target);
        let (sender, receiver) = mpsc::channel(SIGNAL_BUFFER);

        for path in target.watch_paths() {
            debug!(
                "[:Runtime:spawn] {} watches {} (recursive={})",
                target.name(),
                path.key,
                path.recursive
            );
            let mut watcher = ChangeWatcher::new(
                self.registry.clone(),
                path.key.clone(),
                path.recursive,
                self.policies,
            );
            if let Some(index) = self.start_index {
                watcher = watcher.resume_after(index);
            }
            let sender = sender.clone();
            let shutdown = self.shutdown.clone();
            spawn_task(
                &format!("watcher {}", path.key),
                move || async move {
                    watcher.run(sender, shutdown).await;
                    Ok(())
                },
                Some(&mut self.watchers),
            );
        }
        // the consumer sees a closed channel once all watchers are gone
        drop(sender);

        info!("managing {} target", target.name());
        let name = target.name().to_string();
        let shutdown = self.shutdown.clone();
        spawn_task(
            &name,
            move || run_target(target, receiver, shutdown),
            Some(&mut self.consumers),
        );
    }

    pub fn target_count(&self) -> usize {
        self.consumers.len()
    }

    /// Waits for every consumer to finish its pass in progress, then aborts
    /// the watchers that are still blocked on a long-poll.
    pub async fn join(self) {
        for consumer in self.consumers {
            if let Err(e) = consumer.await {
                warn!("consumer task failed: {e}");
            }
        }
        for watcher in &self.watchers {
            watcher.abort();
        }
        for watcher in self.watchers {
            // cancelled is the expected outcome here
            let _ = watcher.await;
        }
        info!("all targets stopped");
    }
}
