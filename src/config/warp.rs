use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use super::require_non_empty;
use super::require_path;
use crate::constants::DEFAULT_ALLOWED_SUPPORT_ENTRIES_KEY;
use crate::constants::DEFAULT_BLOCK_SUPPORT_CATEGORY_KEY;
use crate::constants::DEFAULT_DISABLED_SUPPORT_ENTRIES_KEY;
use crate::constants::DEFAULT_MENU_FILE_MODE;
use crate::constants::DEFAULT_SUPPORT_CATEGORY;
use crate::Error;
use crate::Result;

/// Layout of a menu source in the registry
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    /// `<path>/<name>/current` points to `<path>/<name>/<version>`
    Dogus,
    /// `<path>/<name>` holds the entry itself
    Externals,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WarpSource {
    pub path: String,

    #[serde(rename = "type", alias = "source_type")]
    pub source_type: SourceType,

    /// Only dogus tagged with this value are listed
    #[serde(default)]
    pub tag: Option<String>,
}

impl WarpSource {
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.is_empty())
    }
}

/// Statically configured link of the support category
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SupportSource {
    pub identifier: String,
    #[serde(default)]
    pub external: bool,
    pub href: String,
}

/// Registry keys that filter the support category
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SupportControlKeys {
    /// `true` hides the whole category except allowed entries
    #[serde(default = "default_block_key")]
    pub block: String,
    /// JSON string array of identifiers removed when not blocked
    #[serde(default = "default_disabled_key")]
    pub disabled: String,
    /// JSON string array of identifiers kept when blocked
    #[serde(default = "default_allowed_key")]
    pub allowed: String,
}

impl Default for SupportControlKeys {
    fn default() -> Self {
        Self {
            block: default_block_key(),
            disabled: default_disabled_key(),
            allowed: default_allowed_key(),
        }
    }
}

/// Navigation menu JSON
#[derive(Debug, Deserialize, Clone)]
pub struct WarpConfig {
    pub sources: Vec<WarpSource>,

    pub target: PathBuf,

    /// Category title -> order; higher orders come first
    #[serde(default)]
    pub order: BTreeMap<String, i64>,

    #[serde(default, alias = "support")]
    pub support_sources: Vec<SupportSource>,

    #[serde(default = "default_support_category", alias = "support-category")]
    pub support_category: String,

    #[serde(default, alias = "control-keys")]
    pub control_keys: SupportControlKeys,

    #[serde(default, alias = "pre-command")]
    pub pre_command: Option<String>,

    #[serde(default, alias = "post-command")]
    pub post_command: Option<String>,

    #[serde(default = "default_menu_file_mode", alias = "file-mode")]
    pub file_mode: u32,
}

impl WarpConfig {
    pub fn validate(&self) -> Result<()> {
        if self.sources.is_empty() && self.support_sources.is_empty() {
            return Err(Error::InvalidConfig(
                "warp needs at least one source or support source".into(),
            ));
        }
        for source in &self.sources {
            require_non_empty("warp", "sources.path", &source.path)?;
        }
        require_path("warp", "target", &self.target)?;
        require_non_empty("warp", "support_category", &self.support_category)
    }

    /// Order hint of a category. An exact title wins; otherwise matching
    /// ignores case because configuration keys may be normalized to lower
    /// case on load, and the first key in sorted order decides.
    pub fn order_of(
        &self,
        title: &str,
    ) -> i64 {
        if let Some(order) = self.order.get(title) {
            return *order;
        }
        self.order
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(title))
            .map(|(_, order)| *order)
            .unwrap_or(0)
    }
}

fn default_block_key() -> String {
    DEFAULT_BLOCK_SUPPORT_CATEGORY_KEY.to_string()
}
fn default_disabled_key() -> String {
    DEFAULT_DISABLED_SUPPORT_ENTRIES_KEY.to_string()
}
fn default_allowed_key() -> String {
    DEFAULT_ALLOWED_SUPPORT_ENTRIES_KEY.to_string()
}
fn default_support_category() -> String {
    DEFAULT_SUPPORT_CATEGORY.to_string()
}
fn default_menu_file_mode() -> u32 {
    DEFAULT_MENU_FILE_MODE
}
