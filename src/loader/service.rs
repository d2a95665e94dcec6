use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::read_optional;
use super::read_required;
use crate::constants::PROXY_BUFFERING_OFF;
use crate::constants::PROXY_BUFFERING_ON;
use crate::constants::STATE_NOT_READY;
use crate::EntityError;
use crate::Error;
use crate::Node;
use crate::Registry;
use crate::Result;
use crate::Service;
use crate::ServiceClassifier;
use crate::ServiceConfig;
use crate::TemplateModel;

/// Builds the [`TemplateModel`] of the reverse-proxy configuration.
///
/// Layout: `<source>/<service>/<registration>` leaves hold the JSON
/// registrations written by the registrator.
pub struct ServiceLoader<R: Registry> {
    registry: Arc<R>,
    config: ServiceConfig,
    classifier: ServiceClassifier,
}

impl<R: Registry> ServiceLoader<R> {
    pub fn new(
        registry: Arc<R>,
        config: ServiceConfig,
    ) -> Self {
        let classifier = ServiceClassifier::from_config(&config);
        Self {
            registry,
            config,
            classifier,
        }
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    pub fn classifier(&self) -> &ServiceClassifier {
        &self.classifier
    }

    pub async fn load(&self) -> Result<TemplateModel> {
        let maintenance = self.read_maintenance().await?;
        let services = self.read_services().await?;
        debug!("loaded {} services", services.len());

        Ok(TemplateModel {
            maintenance,
            services,
        })
    }

    /// Value of the maintenance key, empty when the key does not exist
    pub async fn read_maintenance(&self) -> Result<String> {
        let key = &self.config.maintenance_mode;
        match read_optional(self.registry.as_ref(), key).await {
            Ok(Some(node)) => Ok(node.value),
            Ok(None) => Ok(String::new()),
            Err(source) => Err(Error::RootRead {
                path: key.clone(),
                source,
            }),
        }
    }

    /// Every service below the source path, in registry order.
    pub async fn read_services(&self) -> Result<Vec<Service>> {
        let root = read_required(self.registry.as_ref(), &self.config.source.path).await?;

        let mut services = Vec::new();
        for child in &root.nodes {
            let registrations = read_required(self.registry.as_ref(), &child.key).await?;
            services.extend(self.convert_child_nodes(&registrations.nodes));
        }

        for service in &mut services {
            if !self.config.ignore_state {
                service.state = self.read_state(&service.state_node).await;
            }
            service.proxy_buffering = self.read_proxy_buffering(&service.name).await;
        }
        Ok(services)
    }

    /// Converts registration leaves, logging and skipping malformed ones.
    pub(crate) fn convert_child_nodes(
        &self,
        nodes: &[Node],
    ) -> Vec<Service> {
        let mut services = Vec::new();
        for child in nodes.iter().filter(|n| !n.dir) {
            let mut service = match self.classifier.convert_to_service(&child.value) {
                Ok(Some(service)) => service,
                Ok(None) => continue,
                Err(e) => {
                    // a single broken registration must not hide the others
                    warn!("failed to convert node {} to service: {e}", child.key);
                    continue;
                }
            };

            if !self.config.ignore_state {
                match state_node_from_key(&self.config.source.path, &child.key) {
                    Ok(state_node) => service.state_node = state_node,
                    Err(e) => {
                        warn!("skip service {}: {e}", service.name);
                        continue;
                    }
                }
            }
            services.push(service);
        }
        services
    }

    async fn read_state(
        &self,
        state_node: &str,
    ) -> String {
        let key = format!("{}/{state_node}", self.config.state_source.trim_end_matches('/'));
        match self.registry.get(&key).await {
            Ok(node) => node.value,
            Err(e) => {
                debug!("could not get state of {state_node}, assuming {STATE_NOT_READY}: {e}");
                STATE_NOT_READY.to_string()
            }
        }
    }

    /// `off` only if the override key says so, `on` otherwise
    pub(crate) async fn read_proxy_buffering(
        &self,
        name: &str,
    ) -> String {
        let key = format!("{}/{name}", self.config.buffering_prefix.trim_end_matches('/'));
        match self.registry.get(&key).await {
            Ok(node) if node.value == PROXY_BUFFERING_OFF => PROXY_BUFFERING_OFF.to_string(),
            Ok(node) if node.value != PROXY_BUFFERING_ON => {
                warn!("invalid proxy buffering value {:?} for {name}, using {PROXY_BUFFERING_ON}", node.value);
                PROXY_BUFFERING_ON.to_string()
            }
            _ => PROXY_BUFFERING_ON.to_string(),
        }
    }
}

/// Derives the state node from a registration key: the first segment below
/// `source`, without a trailing `-<digits>` instance suffix.
///
/// `/services/redmine/abc` and `/services/redmine-3000/abc` both map to
/// `redmine`.
pub fn state_node_from_key(
    source: &str,
    key: &str,
) -> std::result::Result<String, EntityError> {
    let prefix = format!("{}/", source.trim_end_matches('/'));
    let suffix = key
        .strip_prefix(&prefix)
        .ok_or_else(|| EntityError::UnexpectedKey {
            key: key.to_string(),
            prefix: prefix.clone(),
        })?;

    let segment = suffix.split('/').next().unwrap_or_default();
    if segment.is_empty() {
        return Err(EntityError::UnexpectedKey {
            key: key.to_string(),
            prefix,
        });
    }
    Ok(strip_instance_suffix(segment).to_string())
}

fn strip_instance_suffix(segment: &str) -> &str {
    match segment.rsplit_once('-') {
        Some((base, digits))
            if !base.is_empty() && !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) =>
        {
            base
        }
        _ => segment,
    }
}
