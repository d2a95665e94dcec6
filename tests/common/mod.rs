use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::path::Path;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::Duration;

use regsync::Action;
use regsync::BackoffPolicy;
use regsync::Node;
use regsync::Registry;
use regsync::RegistryError;
use regsync::RetryPolicies;
use regsync::ServiceConfig;
use regsync::SourceConfig;
use regsync::WatchEvent;
use tokio::sync::Notify;

pub const MAINTENANCE_KEY: &str = "/config/_global/maintenance";

pub const PROXY_TEMPLATE: &str = "{{#if maintenance}}maintenance{{else}}{{#each services}}{{name}} {{url}} {{state}}\n{{/each}}{{/if}}";

/// Upper bound for the runtime to pick up a change
pub const SETTLE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Store {
    leaves: BTreeMap<String, (String, u64)>,
    index: u64,
    history: Vec<WatchEvent>,
}

/// Registry kept in memory, with etcd-like indexes and long-poll watches.
#[derive(Default)]
pub struct MemoryRegistry {
    store: Mutex<Store>,
    changed: Notify,
    unavailable: AtomicBool,
}

#[allow(dead_code)]
impl MemoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(
        &self,
        key: &str,
        value: &str,
    ) {
        self.write(key, Some(value), true);
    }

    pub fn delete(
        &self,
        key: &str,
    ) {
        self.write(key, None, true);
    }

    /// Changes the data without producing a watch event, like a change made
    /// while the watchers could not reach the backend
    pub fn set_silently(
        &self,
        key: &str,
        value: &str,
    ) {
        self.write(key, Some(value), false);
    }

    pub fn set_unavailable(
        &self,
        unavailable: bool,
    ) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
        self.changed.notify_waiters();
    }

    fn write(
        &self,
        key: &str,
        value: Option<&str>,
        notify: bool,
    ) {
        let mut store = self.store.lock().unwrap();
        store.index += 1;
        let index = store.index;

        let prev_node = store
            .leaves
            .get(key)
            .map(|(value, modified)| Node {
                modified_index: *modified,
                ..Node::leaf(key, value.as_str())
            });
        let (action, node) = match value {
            Some(value) => {
                store.leaves.insert(key.to_string(), (value.to_string(), index));
                (
                    Action::Set,
                    Node {
                        modified_index: index,
                        ..Node::leaf(key, value)
                    },
                )
            }
            None => {
                store.leaves.remove(key);
                (
                    Action::Delete,
                    Node {
                        modified_index: index,
                        ..Node::leaf(key, "")
                    },
                )
            }
        };

        if notify {
            store.history.push(WatchEvent {
                action,
                node,
                prev_node,
                index,
            });
            drop(store);
            self.changed.notify_waiters();
        }
    }

    fn check_available(&self) -> Result<(), RegistryError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RegistryError::Unavailable("connection refused".into()));
        }
        Ok(())
    }
}

fn below(
    key: &str,
    root: &str,
    recursive: bool,
) -> bool {
    key == root || (recursive && key.starts_with(&format!("{}/", root.trim_end_matches('/'))))
}

#[async_trait::async_trait]
impl Registry for MemoryRegistry {
    async fn get(
        &self,
        key: &str,
    ) -> Result<Node, RegistryError> {
        self.check_available()?;
        let store = self.store.lock().unwrap();

        if let Some((value, modified)) = store.leaves.get(key) {
            return Ok(Node {
                modified_index: *modified,
                ..Node::leaf(key, value.as_str())
            });
        }

        let prefix = format!("{}/", key.trim_end_matches('/'));
        let children: BTreeSet<String> = store
            .leaves
            .keys()
            .filter_map(|k| k.strip_prefix(&prefix))
            .filter_map(|rest| rest.split('/').next())
            .map(|name| format!("{prefix}{name}"))
            .collect();
        if children.is_empty() {
            return Err(RegistryError::KeyNotFound {
                key: key.to_string(),
            });
        }

        let nodes = children
            .into_iter()
            .map(|child| match store.leaves.get(&child) {
                Some((value, modified)) => Node {
                    modified_index: *modified,
                    ..Node::leaf(child.as_str(), value.as_str())
                },
                None => Node::dir(child, vec![]),
            })
            .collect();
        Ok(Node::dir(key, nodes))
    }

    async fn read_index(&self) -> Result<u64, RegistryError> {
        self.check_available()?;
        Ok(self.store.lock().unwrap().index)
    }

    async fn watch_next(
        &self,
        key: &str,
        recursive: bool,
        after_index: Option<u64>,
    ) -> Result<WatchEvent, RegistryError> {
        let from = match after_index {
            Some(index) => index,
            None => self.store.lock().unwrap().index + 1,
        };

        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            self.check_available()?;
            let found = self
                .store
                .lock()
                .unwrap()
                .history
                .iter()
                .find(|e| e.index >= from && below(&e.node.key, key, recursive))
                .cloned();
            if let Some(event) = found {
                return Ok(event);
            }

            notified.await;
        }
    }
}

/// Short backoffs so failure tests settle quickly
#[allow(dead_code)]
pub fn fast_retry() -> RetryPolicies {
    RetryPolicies {
        transient: BackoffPolicy {
            base_delay_ms: 20,
            max_delay_ms: 100,
        },
        unavailable: BackoffPolicy {
            base_delay_ms: 50,
            max_delay_ms: 200,
        },
    }
}

#[allow(dead_code)]
pub fn service_config(dir: &Path) -> ServiceConfig {
    let template = dir.join("app.conf.tpl");
    std::fs::write(&template, PROXY_TEMPLATE).unwrap();

    ServiceConfig {
        source: SourceConfig {
            path: "/services".into(),
        },
        maintenance_mode: MAINTENANCE_KEY.into(),
        target: dir.join("app.conf"),
        template,
        tag: Some("webapp".into()),
        pre_command: None,
        post_command: None,
        ignore_health: false,
        ignore_state: false,
        state_source: "/state".into(),
        buffering_prefix: "/config/nginx/buffering".into(),
        file_mode: 0o644,
    }
}

/// Registration JSON as written by the registrator
#[allow(dead_code)]
pub fn registration(
    name: &str,
    address: &str,
) -> String {
    format!(r#"{{"name": "{name}", "service": "{address}", "tags": ["webapp"]}}"#)
}

/// Polls `path` until its content equals `expected`
#[allow(dead_code)]
pub async fn wait_for_content(
    path: &PathBuf,
    expected: &str,
) {
    let result = tokio::time::timeout(SETTLE_TIMEOUT, async {
        loop {
            if std::fs::read_to_string(path).ok().as_deref() == Some(expected) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    })
    .await;

    if result.is_err() {
        panic!(
            "{path:?} did not settle on {expected:?}, last content: {:?}",
            std::fs::read_to_string(path).ok()
        );
    }
}
