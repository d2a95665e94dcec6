use std::sync::Arc;

use tracing::info;

use super::read_optional;
use crate::EntityError;
use crate::Error;
use crate::MaintenanceConfig;
use crate::PageModel;
use crate::Registry;
use crate::Result;

/// Reads the maintenance page model.
pub struct MaintenanceLoader<R: Registry> {
    registry: Arc<R>,
    config: MaintenanceConfig,
}

impl<R: Registry> MaintenanceLoader<R> {
    pub fn new(
        registry: Arc<R>,
        config: MaintenanceConfig,
    ) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &MaintenanceConfig {
        &self.config
    }

    /// The configured page, or the default page when the key is missing or
    /// empty.
    pub async fn load(&self) -> Result<PageModel> {
        let key = &self.config.source.path;
        let node = read_optional(self.registry.as_ref(), key)
            .await
            .map_err(|source| Error::RootRead {
                path: key.clone(),
                source,
            })?;

        match node {
            Some(node) if !node.value.trim().is_empty() => {
                let page: PageModel =
                    serde_json::from_str(&node.value).map_err(EntityError::InvalidJson)?;
                info!("render maintenance page: {page}");
                Ok(page)
            }
            _ => {
                info!("render default maintenance page");
                Ok(self.config.default.clone())
            }
        }
    }
}
