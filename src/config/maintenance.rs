use std::path::PathBuf;

use serde::Deserialize;

use super::require_non_empty;
use super::require_path;
use super::service::default_file_mode;
use super::SourceConfig;
use crate::constants::DEFAULT_MAINTENANCE_KEY;
use crate::PageModel;
use crate::Result;

/// Maintenance page
#[derive(Debug, Deserialize, Clone)]
pub struct MaintenanceConfig {
    /// Key holding the `{title, text}` JSON of the page
    #[serde(default = "default_source")]
    pub source: SourceConfig,

    pub target: PathBuf,

    /// Handlebars template rendered with `{title, text}`
    pub template: PathBuf,

    /// Rendered when the source key does not exist
    #[serde(default)]
    pub default: PageModel,

    /// HTML-escape model values while rendering
    #[serde(default = "default_escape_html", alias = "escape-html")]
    pub escape_html: bool,

    #[serde(default = "default_file_mode", alias = "file-mode")]
    pub file_mode: u32,
}

impl MaintenanceConfig {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("maintenance", "source.path", &self.source.path)?;
        require_path("maintenance", "target", &self.target)?;
        require_path("maintenance", "template", &self.template)
    }
}

fn default_source() -> SourceConfig {
    SourceConfig {
        path: DEFAULT_MAINTENANCE_KEY.to_string(),
    }
}
fn default_escape_html() -> bool {
    true
}
