//! Registry-to-model loaders.
//!
//! Each loader reads the full current state of its registry subtree and
//! rebuilds the model of one artifact from scratch:
//! - [`ServiceLoader`] - services below the service root, enriched with state
//!   and proxy buffering, plus the maintenance mode value
//! - [`WarpLoader`] - menu categories from dogu and external sources and the
//!   support category
//! - [`MaintenanceLoader`] - the maintenance page model
//!
//! Malformed entities are logged and skipped; failing to read a directory
//! aborts the pass with [`Error::RootRead`](crate::Error::RootRead) so the
//! previous artifact stays in place.

mod maintenance;
mod service;
mod warp;

pub use maintenance::*;
pub use service::*;
pub use warp::*;


use crate::Error;
use crate::Node;
use crate::Registry;
use crate::RegistryError;
use crate::Result;

/// Reads a key whose absence or failure aborts the pass
pub(crate) async fn read_required<R: Registry + ?Sized>(
    registry: &R,
    key: &str,
) -> Result<Node> {
    registry.get(key).await.map_err(|source| Error::RootRead {
        path: key.to_string(),
        source,
    })
}

/// Reads a key that may legitimately be missing
pub(crate) async fn read_optional<R: Registry + ?Sized>(
    registry: &R,
    key: &str,
) -> std::result::Result<Option<Node>, RegistryError> {
    match registry.get(key).await {
        Ok(node) => Ok(Some(node)),
        Err(e) if e.is_key_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}
