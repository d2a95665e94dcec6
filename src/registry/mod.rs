//! Registry abstraction layer.
//!
//! The reconciliation engine consumes the registry only through the
//! [`Registry`] trait: a one-level `get`, the key space index as of a read
//! (`read_index`) and a long-poll `watch_next` that resumes from an optional
//! index. [`EtcdRegistry`] implements it against the
//! etcd v2 keys API; any backend with the same get/long-poll semantics and a
//! resumable cursor can be substituted.

mod etcd;
pub use etcd::*;


#[cfg(test)]
use mockall::automock;
use serde::Deserialize;

use crate::RegistryError;

/// Node of the hierarchical key space
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub key: String,
    /// Empty for directories
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub dir: bool,
    /// Direct children of a directory (one level, sorted by key)
    #[serde(default)]
    pub nodes: Vec<Node>,
    #[serde(default)]
    pub modified_index: u64,
}

impl Node {
    pub fn leaf(
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            ..Default::default()
        }
    }

    pub fn dir(
        key: impl Into<String>,
        nodes: Vec<Node>,
    ) -> Self {
        Self {
            key: key.into(),
            dir: true,
            nodes,
            ..Default::default()
        }
    }
}

/// Mutation reported by a watch
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    Get,
    Set,
    Create,
    Update,
    Delete,
    Expire,
    CompareAndSwap,
    CompareAndDelete,
    #[serde(other)]
    Unknown,
}

impl Action {
    /// Actions that may add, remove or modify an entity
    pub fn is_modification(&self) -> bool {
        matches!(
            self,
            Action::Create | Action::Delete | Action::Update | Action::Set
        )
    }
}

/// One change delivered by [`Registry::watch_next`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub action: Action,
    pub node: Node,
    pub prev_node: Option<Node>,
    /// Position of the change; resuming from `index + 1` skips it
    pub index: u64,
}

#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync + 'static {
    /// Reads a key. Directories come back with one level of children.
    ///
    /// # Errors
    /// - [`RegistryError::KeyNotFound`] if the key does not exist
    /// - [`RegistryError::Unavailable`] if no endpoint could be reached
    /// - [`RegistryError::Request`] / [`RegistryError::InvalidResponse`] otherwise
    async fn get(
        &self,
        key: &str,
    ) -> Result<Node, RegistryError>;

    /// Current index of the whole key space, taken from a read of the root.
    ///
    /// Every change made after the read carries a greater index, so a watch
    /// resuming from `index + 1` misses nothing a later full read could miss.
    async fn read_index(&self) -> Result<u64, RegistryError>;

    /// Blocks until the watched key (or subtree, with `recursive`) changes.
    ///
    /// `after_index` of `None` subscribes from "now"; `Some(i)` returns the
    /// first change with an index of at least `i`.
    async fn watch_next(
        &self,
        key: &str,
        recursive: bool,
        after_index: Option<u64>,
    ) -> Result<WatchEvent, RegistryError>;
}
