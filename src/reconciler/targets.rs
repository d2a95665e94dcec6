use std::sync::Arc;

use tracing::debug;

use super::Reconcile;
use super::WatchPath;
use crate::CommandWriter;
use crate::EntityError;
use crate::MaintenanceConfig;
use crate::MaintenanceLoader;
use crate::Registry;
use crate::Renderer;
use crate::Result;
use crate::ServiceConfig;
use crate::ServiceLoader;
use crate::WarpConfig;
use crate::WarpLoader;
use crate::WatchEvent;

/// Reverse-proxy configuration rendered from the service registrations
pub struct ServiceTarget<R: Registry> {
    loader: ServiceLoader<R>,
    writer: CommandWriter,
}

impl<R: Registry> ServiceTarget<R> {
    pub fn new(
        registry: Arc<R>,
        config: ServiceConfig,
    ) -> Self {
        let writer = CommandWriter::new(
            config.target.clone(),
            Renderer::template(config.template.clone(), false),
        )
        .with_pre_command(config.pre_command.clone())
        .with_post_command(config.post_command.clone())
        .with_file_mode(config.file_mode);

        Self {
            loader: ServiceLoader::new(registry, config),
            writer,
        }
    }

    pub fn writer(&self) -> &CommandWriter {
        &self.writer
    }
}

#[async_trait::async_trait]
impl<R: Registry> Reconcile for ServiceTarget<R> {
    fn name(&self) -> &str {
        "service"
    }

    fn watch_paths(&self) -> Vec<WatchPath> {
        let config = self.loader.config();
        vec![
            WatchPath::recursive(config.source.path.clone()),
            WatchPath::single(config.maintenance_mode.clone()),
        ]
    }

    /// Changes of the maintenance key always count; changes below the
    /// source only when they touch a service registration.
    fn is_relevant(
        &self,
        event: &WatchEvent,
    ) -> std::result::Result<bool, EntityError> {
        if event.node.key == self.loader.config().maintenance_mode {
            return Ok(true);
        }
        self.loader.classifier().is_relevant(event)
    }

    async fn reconcile(&self) -> Result<()> {
        let model = self.loader.load().await?;
        debug!(
            "[:ServiceTarget:reconcile] rendering {} services",
            model.services.len()
        );
        self.writer.commit(&model).await?;
        Ok(())
    }
}

/// Navigation menu JSON
pub struct WarpTarget<R: Registry> {
    loader: WarpLoader<R>,
    writer: CommandWriter,
}

impl<R: Registry> WarpTarget<R> {
    pub fn new(
        registry: Arc<R>,
        config: WarpConfig,
    ) -> Self {
        let writer = CommandWriter::new(config.target.clone(), Renderer::Json)
            .with_pre_command(config.pre_command.clone())
            .with_post_command(config.post_command.clone())
            .with_file_mode(config.file_mode);

        Self {
            loader: WarpLoader::new(registry, config),
            writer,
        }
    }

    pub fn writer(&self) -> &CommandWriter {
        &self.writer
    }
}

#[async_trait::async_trait]
impl<R: Registry> Reconcile for WarpTarget<R> {
    fn name(&self) -> &str {
        "warp"
    }

    /// Every source subtree, plus the support control keys when there is a
    /// support category to filter.
    fn watch_paths(&self) -> Vec<WatchPath> {
        let config = self.loader.config();
        let mut paths: Vec<WatchPath> = config
            .sources
            .iter()
            .map(|source| WatchPath::recursive(source.path.clone()))
            .collect();

        if !config.support_sources.is_empty() {
            let keys = &config.control_keys;
            for key in [&keys.block, &keys.disabled, &keys.allowed] {
                paths.push(WatchPath::single(key.clone()));
            }
        }
        paths
    }

    fn is_relevant(
        &self,
        _event: &WatchEvent,
    ) -> std::result::Result<bool, EntityError> {
        Ok(true)
    }

    async fn reconcile(&self) -> Result<()> {
        let categories = self.loader.load().await?;
        debug!(
            "[:WarpTarget:reconcile] writing {} categories",
            categories.len()
        );
        self.writer.commit(&categories).await?;
        Ok(())
    }
}

/// Maintenance page
pub struct MaintenanceTarget<R: Registry> {
    loader: MaintenanceLoader<R>,
    writer: CommandWriter,
}

impl<R: Registry> MaintenanceTarget<R> {
    pub fn new(
        registry: Arc<R>,
        config: MaintenanceConfig,
    ) -> Self {
        let writer = CommandWriter::new(
            config.target.clone(),
            Renderer::template(config.template.clone(), config.escape_html),
        )
        .with_file_mode(config.file_mode);

        Self {
            loader: MaintenanceLoader::new(registry, config),
            writer,
        }
    }

    pub fn writer(&self) -> &CommandWriter {
        &self.writer
    }
}

#[async_trait::async_trait]
impl<R: Registry> Reconcile for MaintenanceTarget<R> {
    fn name(&self) -> &str {
        "maintenance"
    }

    fn watch_paths(&self) -> Vec<WatchPath> {
        vec![WatchPath::single(self.loader.config().source.path.clone())]
    }

    fn is_relevant(
        &self,
        _event: &WatchEvent,
    ) -> std::result::Result<bool, EntityError> {
        Ok(true)
    }

    async fn reconcile(&self) -> Result<()> {
        let page = self.loader.load().await?;
        self.writer.commit(&page).await?;
        Ok(())
    }
}
