//! Reconciliation runtime.
//!
//! Every managed artifact is a [`Reconcile`] target. One consumer task per
//! target owns the artifact and serializes all passes; the watchers of the
//! target's registry paths fan in to it over a single channel. The consumer
//! runs an initial pass, then for every signal drains whatever is already
//! queued and runs at most one pass for the whole batch.

mod runtime;
mod targets;

pub use runtime::*;
pub use targets::*;


use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::EntityError;
use crate::Result;
use crate::WatchEvent;
use crate::WatchSignal;

/// Registry path a target depends on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPath {
    pub key: String,
    pub recursive: bool,
}

impl WatchPath {
    pub fn recursive(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            recursive: true,
        }
    }

    pub fn single(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            recursive: false,
        }
    }
}

#[async_trait::async_trait]
pub trait Reconcile: Send + Sync + 'static {
    /// Used in logs and task names
    fn name(&self) -> &str;

    fn watch_paths(&self) -> Vec<WatchPath>;

    /// Whether `event` may change the artifact. An error counts as relevant.
    fn is_relevant(
        &self,
        event: &WatchEvent,
    ) -> std::result::Result<bool, EntityError>;

    /// Rebuilds the model from the registry and commits the artifact.
    async fn reconcile(&self) -> Result<()>;
}

/// Consumer loop of one target.
///
/// Returns when shutdown is signalled or every watcher is gone. A pass that
/// has started always runs to completion.
pub async fn run_target<T: Reconcile + ?Sized>(
    target: Arc<T>,
    mut receiver: mpsc::Receiver<WatchSignal>,
    mut shutdown: watch::Receiver<()>,
) -> Result<()> {
    info!("[{}] initial reconciliation", target.name());
    run_pass(target.as_ref()).await;

    loop {
        tokio::select! {
            // shutdown wins over queued work
            biased;
            _ = shutdown.changed() => {
                info!("[{}] shutdown requested", target.name());
                return Ok(());
            }
            signal = receiver.recv() => {
                let Some(signal) = signal else {
                    warn!("[{}] all watchers stopped", target.name());
                    return Ok(());
                };

                let mut needs_pass = is_pass_needed(target.as_ref(), &signal);
                let mut coalesced = 0;
                while let Ok(queued) = receiver.try_recv() {
                    needs_pass |= is_pass_needed(target.as_ref(), &queued);
                    coalesced += 1;
                }
                if coalesced > 0 {
                    debug!("[{}] coalesced {coalesced} queued signals", target.name());
                }

                if needs_pass {
                    run_pass(target.as_ref()).await;
                }
            }
        }
    }
}

fn is_pass_needed<T: Reconcile + ?Sized>(
    target: &T,
    signal: &WatchSignal,
) -> bool {
    match signal {
        WatchSignal::Resync(class) => {
            info!("[{}] resync after {:?} watch failure", target.name(), class);
            true
        }
        WatchSignal::Changed(event) => match target.is_relevant(event) {
            Ok(true) => {
                info!(
                    "[{}] {} changed, action={:?}",
                    target.name(),
                    event.node.key,
                    event.action
                );
                true
            }
            Ok(false) => {
                debug!(
                    "[{}] ignoring change to {} with action {:?}",
                    target.name(),
                    event.node.key,
                    event.action
                );
                false
            }
            Err(e) => {
                warn!(
                    "[{}] failed to check if the change of {} is relevant, reloading: {e}",
                    target.name(),
                    event.node.key
                );
                true
            }
        },
    }
}

async fn run_pass<T: Reconcile + ?Sized>(target: &T) {
    match target.reconcile().await {
        Ok(()) => info!("[{}] reconciled", target.name()),
        Err(e) if e.is_reload_signal() => {
            warn!("[{}] artifact committed, but reload failed: {e}", target.name())
        }
        Err(e) => error!(
            "[{}] reconciliation failed, keeping previous artifact: {e}",
            target.name()
        ),
    }
}
