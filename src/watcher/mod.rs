//! Change watcher.
//!
//! A [`ChangeWatcher`] long-polls one registry key and turns the results
//! into [`WatchSignal`]s. It owns its resume cursor: after an event at index
//! `i` the next request resumes at `i + 1`, so no change is skipped and none
//! is delivered twice.
//!
//! The first cursor comes from the index of a read taken before the
//! consumer's initial pass (see [`ChangeWatcher::resume_after`]). Any failure
//! drops the cursor and waits according to the [`RetryPolicies`] of its
//! failure class. The watcher then reads a fresh index, and only after that
//! emits [`WatchSignal::Resync`] and subscribes again from that index. The
//! full read triggered by the resync therefore starts after the index, and
//! every change made since then is still delivered as an event.


use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use rand::Rng;
use tokio::sync::mpsc;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::FailureClass;
use crate::Registry;
use crate::RegistryError;
use crate::RetryPolicies;
use crate::WatchEvent;

/// Upper bound of the random delay added to a backoff, as a fraction of it
const JITTER_RATIO: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchSignal {
    /// A change below the watched key
    Changed(WatchEvent),
    /// The watch broke; the consumer must rebuild from a full read
    Resync(FailureClass),
}

pub struct ChangeWatcher<R: Registry> {
    registry: Arc<R>,
    key: String,
    recursive: bool,
    policies: RetryPolicies,
    /// Index the next long-poll resumes from; `None` until one is secured
    cursor: Option<u64>,
    /// Why the cursor was lost, reported with the resync
    lost: FailureClass,
    /// Consecutive failures since the last delivered event
    attempt: u32,
}

impl<R: Registry> ChangeWatcher<R> {
    /// Watcher without a resume position: the first call to
    /// [`next_signal`](Self::next_signal) reads one and requests a resync.
    pub fn new(
        registry: Arc<R>,
        key: impl Into<String>,
        recursive: bool,
        policies: RetryPolicies,
    ) -> Self {
        Self {
            registry,
            key: key.into(),
            recursive,
            policies,
            cursor: None,
            lost: FailureClass::Transient,
            attempt: 0,
        }
    }

    /// Resumes after `index`, the index of a read that happened before the
    /// consumer's full read.
    pub fn resume_after(
        mut self,
        index: u64,
    ) -> Self {
        self.cursor = Some(index.saturating_add(1));
        self
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    /// Index the next long-poll resumes from
    pub fn cursor(&self) -> Option<u64> {
        self.cursor
    }

    /// Waits for the next change or, after a failure, its backoff and a
    /// fresh resume position, a resync request.
    pub async fn next_signal(&mut self) -> WatchSignal {
        loop {
            let Some(cursor) = self.cursor else {
                match self.registry.read_index().await {
                    Ok(index) => {
                        debug!("[:ChangeWatcher:{}] resuming after index {index}", self.key);
                        self.cursor = Some(index.saturating_add(1));
                        return WatchSignal::Resync(self.lost);
                    }
                    Err(e) => {
                        self.back_off("reading the registry index", &e).await;
                        continue;
                    }
                }
            };

            match self
                .registry
                .watch_next(&self.key, self.recursive, Some(cursor))
                .await
            {
                Ok(event) => {
                    debug!(
                        "[:ChangeWatcher:{}] {:?} {} at index {}",
                        self.key, event.action, event.node.key, event.index
                    );
                    self.attempt = 0;
                    self.cursor = Some(event.index.saturating_add(1));
                    return WatchSignal::Changed(event);
                }
                Err(e) => {
                    self.cursor = None;
                    self.back_off("watch", &e).await;
                }
            }
        }
    }

    async fn back_off(
        &mut self,
        what: &str,
        e: &RegistryError,
    ) {
        let class = e.failure_class();
        self.lost = class;
        self.attempt = self.attempt.saturating_add(1);

        let delay = with_jitter(self.policies.policy_for(class).delay(self.attempt));
        warn!(
            "{what} for {} failed (attempt {}): {e}; retrying in {:?}",
            self.key, self.attempt, delay
        );
        tokio::time::sleep(delay).await;
    }

    /// Endless stream of signals
    pub fn into_stream(self) -> impl Stream<Item = WatchSignal> + Send {
        futures::stream::unfold(self, |mut watcher| async move {
            let signal = watcher.next_signal().await;
            Some((signal, watcher))
        })
    }

    /// Forwards signals to `sender` until shutdown or until the receiving
    /// side is gone.
    pub async fn run(
        mut self,
        sender: mpsc::Sender<WatchSignal>,
        mut shutdown: watch::Receiver<()>,
    ) {
        loop {
            tokio::select! {
                // shutdown wins over queued work
                biased;
                _ = shutdown.changed() => {
                    info!("watcher for {} stopped", self.key);
                    return;
                }
                signal = self.next_signal() => {
                    if sender.send(signal).await.is_err() {
                        debug!("[:ChangeWatcher:{}] receiver dropped", self.key);
                        return;
                    }
                }
            }
        }
    }
}

/// Adds up to [`JITTER_RATIO`] of random delay so that several watchers
/// failing together do not retry in lockstep.
pub(crate) fn with_jitter(delay: Duration) -> Duration {
    let max_jitter_ms = (delay.as_millis() as f64 * JITTER_RATIO) as u64;
    if max_jitter_ms == 0 {
        return delay;
    }
    delay + Duration::from_millis(rand::thread_rng().gen_range(0..=max_jitter_ms))
}
