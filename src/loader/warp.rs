use std::sync::Arc;

use tracing::debug;
use tracing::warn;

use super::read_optional;
use super::read_required;
use crate::constants::CURRENT_VERSION_KEY;
use crate::Categories;
use crate::Category;
use crate::EntityError;
use crate::Entry;
use crate::EntryWithCategory;
use crate::Error;
use crate::Node;
use crate::RawData;
use crate::Registry;
use crate::Result;
use crate::SourceType;
use crate::SupportSource;
use crate::Target;
use crate::WarpConfig;
use crate::WarpSource;

/// Builds the navigation menu from every configured source.
pub struct WarpLoader<R: Registry> {
    registry: Arc<R>,
    config: WarpConfig,
}

impl<R: Registry> WarpLoader<R> {
    pub fn new(
        registry: Arc<R>,
        config: WarpConfig,
    ) -> Self {
        Self { registry, config }
    }

    pub fn config(&self) -> &WarpConfig {
        &self.config
    }

    /// Merged and sorted categories of all sources plus the support
    /// category.
    pub async fn load(&self) -> Result<Categories> {
        let mut categories = Categories::new();
        // an unreadable source fails the pass; a menu missing it is never written
        for source in &self.config.sources {
            categories.merge(self.read_source(source).await?);
        }

        if let Some(support) = self.read_support().await {
            categories.insert(support);
        }

        categories.sort();
        debug!("loaded {} menu categories", categories.len());
        Ok(categories)
    }

    pub async fn read_source(
        &self,
        source: &WarpSource,
    ) -> Result<Categories> {
        let root = read_required(self.registry.as_ref(), &source.path).await?;

        let entries = match source.source_type {
            SourceType::Dogus => self.read_dogus(&root, source.tag()).await?,
            SourceType::Externals => read_externals(&root),
        };
        Ok(Categories::from_entries(entries, |title| self.config.order_of(title)))
    }

    async fn read_dogus(
        &self,
        root: &Node,
        tag: Option<&str>,
    ) -> Result<Vec<EntryWithCategory>> {
        let mut entries = Vec::new();
        for child in &root.nodes {
            let Some(value) = self.read_current_dogu(&child.key).await? else {
                continue;
            };
            match dogu_entry(&value, tag) {
                Ok(Some(entry)) => entries.push(entry),
                Ok(None) => debug!("dogu {} filtered by tag", child.key),
                Err(e) => warn!("failed to convert dogu {}: {e}", child.key),
            }
        }
        Ok(entries)
    }

    /// Value of the active version of a dogu; `None` when the dogu is not
    /// registered.
    async fn read_current_dogu(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        let current = format!("{key}/{CURRENT_VERSION_KEY}");
        let version = match read_optional(self.registry.as_ref(), &current).await {
            Ok(Some(node)) => node.value,
            Ok(None) => {
                debug!("dogu {key} seems to be unregistered");
                return Ok(None);
            }
            Err(source) => {
                return Err(Error::RootRead {
                    path: current,
                    source,
                })
            }
        };

        let versioned = format!("{key}/{version}");
        let node = read_required(self.registry.as_ref(), &versioned).await?;
        Ok(Some(node.value))
    }

    /// Support category after applying the registry control keys.
    async fn read_support(&self) -> Option<Category> {
        if self.config.support_sources.is_empty() {
            return None;
        }

        let keys = &self.config.control_keys;
        let blocked = self.read_bool(&keys.block).await.unwrap_or_else(|e| {
            warn!("{e}; support category is not blocked");
            false
        });
        let disabled = self.read_strings(&keys.disabled).await.unwrap_or_else(|e| {
            warn!("{e}; no support entry is disabled");
            Vec::new()
        });
        let allowed = self.read_strings(&keys.allowed).await.unwrap_or_else(|e| {
            warn!("{e}; no support entry is explicitly allowed");
            Vec::new()
        });

        support_category(
            &self.config.support_sources,
            &self.config.support_category,
            self.config.order_of(&self.config.support_category),
            blocked,
            &disabled,
            &allowed,
        )
    }

    /// JSON boolean control key; a missing key reads as `false`
    pub async fn read_bool(
        &self,
        key: &str,
    ) -> Result<bool> {
        match self.read_control_value(key).await? {
            Some(value) => serde_json::from_str(value.trim()).map_err(|e| Error::ControlData {
                key: key.to_string(),
                reason: format!("failed to unmarshal value to bool: {e}"),
            }),
            None => Ok(false),
        }
    }

    /// JSON string array control key; a missing key reads as empty
    pub async fn read_strings(
        &self,
        key: &str,
    ) -> Result<Vec<String>> {
        match self.read_control_value(key).await? {
            Some(value) => serde_json::from_str(&value).map_err(|e| Error::ControlData {
                key: key.to_string(),
                reason: format!("failed to unmarshal value to string list: {e}"),
            }),
            None => Ok(Vec::new()),
        }
    }

    async fn read_control_value(
        &self,
        key: &str,
    ) -> Result<Option<String>> {
        match read_optional(self.registry.as_ref(), key).await {
            Ok(node) => Ok(node.map(|n| n.value)),
            Err(e) => Err(Error::ControlData {
                key: key.to_string(),
                reason: format!("failed to read configuration entry: {e}"),
            }),
        }
    }
}

fn read_externals(root: &Node) -> Vec<EntryWithCategory> {
    let mut entries = Vec::new();
    for child in root.nodes.iter().filter(|n| !n.dir) {
        match external_entry(&child.value) {
            Ok(entry) => entries.push(entry),
            Err(e) => warn!("failed to convert external {}: {e}", child.key),
        }
    }
    entries
}

/// Menu entry of a dogu version document.
///
/// `Ok(None)` when a tag is required and the dogu does not carry it.
pub fn dogu_entry(
    value: &str,
    tag: Option<&str>,
) -> std::result::Result<Option<EntryWithCategory>, EntityError> {
    let raw = RawData::parse(value)?;
    if let Some(tag) = tag {
        if !raw.has_tag("Tags", tag)? {
            return Ok(None);
        }
    }

    let name = raw
        .get_str("Name")
        .ok_or(EntityError::MissingField { field: "Name" })?;
    // strip the namespace, `official/redmine` is served at `/redmine`
    let short_name = name.rsplit('/').next().unwrap_or(name);

    Ok(Some(EntryWithCategory {
        entry: Entry {
            display_name: raw.get_str("DisplayName").unwrap_or(name).to_string(),
            href: format!("/{short_name}"),
            title: raw.get_str("Description").unwrap_or_default().to_string(),
            target: Target::Internal,
        },
        category: raw.get_str("Category").unwrap_or_default().to_string(),
    }))
}

/// Menu entry of an external link document
pub fn external_entry(value: &str) -> std::result::Result<EntryWithCategory, EntityError> {
    let raw = RawData::parse(value)?;
    let required = |field: &'static str| {
        raw.get_str(field)
            .map(str::to_string)
            .ok_or(EntityError::MissingField { field })
    };

    Ok(EntryWithCategory {
        entry: Entry {
            display_name: required("DisplayName")?,
            href: required("URL")?,
            title: raw.get_str("Description").unwrap_or_default().to_string(),
            target: Target::External,
        },
        category: required("Category")?,
    })
}

/// Builds the support category.
///
/// When `blocked`, only `allowed` identifiers survive; otherwise the
/// `disabled` ones are removed. `None` when nothing is left.
pub fn support_category(
    sources: &[SupportSource],
    title: &str,
    order: i64,
    blocked: bool,
    disabled: &[String],
    allowed: &[String],
) -> Option<Category> {
    let entries: Vec<Entry> = sources
        .iter()
        .filter(|s| {
            let listed = |list: &[String]| list.iter().any(|id| *id == s.identifier);
            if blocked {
                listed(allowed)
            } else {
                !listed(disabled)
            }
        })
        .map(|s| Entry {
            display_name: String::new(),
            href: s.href.clone(),
            title: s.identifier.clone(),
            target: if s.external {
                Target::External
            } else {
                Target::Internal
            },
        })
        .collect();

    if entries.is_empty() {
        return None;
    }
    Some(Category {
        title: title.to_string(),
        order,
        entries,
    })
}
