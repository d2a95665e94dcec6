//! Change classification for the service list.
//!
//! A registry watch reports every mutation below the service root, most of
//! which (directory bookkeeping, untagged services, unrelated keys) do not
//! change the rendered proxy configuration. [`ServiceClassifier`] filters
//! those out so a full reload only happens when a service may have been
//! added, removed or modified.


use tracing::trace;

use crate::EntityError;
use crate::Node;
use crate::RawData;
use crate::Service;
use crate::ServiceConfig;
use crate::WatchEvent;

/// Tag filter and conversion rules shared by the classifier and the loader
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServiceClassifier {
    tag: Option<String>,
    ignore_health: bool,
}

impl ServiceClassifier {
    pub fn new(
        tag: Option<String>,
        ignore_health: bool,
    ) -> Self {
        Self {
            tag: tag.filter(|t| !t.is_empty()),
            ignore_health,
        }
    }

    pub fn from_config(config: &ServiceConfig) -> Self {
        Self::new(config.tag().map(str::to_string), config.ignore_health)
    }

    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// Parses a registry value into a service.
    ///
    /// `Ok(None)` when the value describes no service or does not carry the
    /// configured tag.
    pub fn convert_to_service(
        &self,
        value: &str,
    ) -> Result<Option<Service>, EntityError> {
        let raw = RawData::parse(value)?;

        if let Some(tag) = self.tag() {
            if !raw.has_tag("tags", tag)? {
                return Ok(None);
            }
        }

        let mut service = Service::from_raw(&raw)?;
        if self.ignore_health {
            if let Some(service) = service.as_mut() {
                service.health_status.clear();
            }
        }
        Ok(service)
    }

    /// Decides whether `event` could have added, removed or modified a
    /// service.
    ///
    /// An error means the value could not be judged; callers should treat it
    /// as relevant.
    pub fn is_relevant(
        &self,
        event: &WatchEvent,
    ) -> Result<bool, EntityError> {
        if event.node.dir || !event.action.is_modification() {
            trace!("ignoring {:?} on {}", event.action, event.node.key);
            return Ok(false);
        }

        if self.is_service_node(Some(&event.node))? {
            return Ok(true);
        }
        self.is_service_node(event.prev_node.as_ref())
    }

    fn is_service_node(
        &self,
        node: Option<&Node>,
    ) -> Result<bool, EntityError> {
        match node {
            Some(node) if !node.value.is_empty() => {
                Ok(self.convert_to_service(&node.value)?.is_some())
            }
            _ => Ok(false),
        }
    }
}
