use std::path::PathBuf;

use serde::Deserialize;

use super::require_non_empty;
use super::require_path;
use crate::constants::DEFAULT_BUFFERING_PREFIX;
use crate::constants::DEFAULT_FILE_MODE;
use crate::constants::DEFAULT_MAINTENANCE_KEY;
use crate::constants::DEFAULT_STATE_SOURCE;
use crate::Result;

/// Registry subtree watched by a target
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct SourceConfig {
    pub path: String,
}

/// Reverse-proxy service list
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceConfig {
    /// Root of the service registrations, e.g. `/services`
    pub source: SourceConfig,

    /// Key holding the maintenance mode; its value is passed to the template
    #[serde(default = "default_maintenance_key", alias = "maintenance-mode")]
    pub maintenance_mode: String,

    /// Rendered configuration file
    pub target: PathBuf,

    /// Handlebars template rendered with `{maintenance, services}`
    pub template: PathBuf,

    /// Only services tagged with this value are kept
    #[serde(default)]
    pub tag: Option<String>,

    /// Validates the candidate file at `target`, e.g. `nginx -t`
    #[serde(default, alias = "pre-command")]
    pub pre_command: Option<String>,

    /// Reload signal after a successful commit, e.g. `nginx -s reload`
    #[serde(default, alias = "post-command")]
    pub post_command: Option<String>,

    /// Do not pass `healthStatus` to the template
    #[serde(default, alias = "ignore-health")]
    pub ignore_health: bool,

    /// Skip the state lookup for every service
    #[serde(default, alias = "ignore-state")]
    pub ignore_state: bool,

    /// Root of the state keys
    #[serde(default = "default_state_source", alias = "state-source")]
    pub state_source: String,

    /// Root of the per-service proxy buffering overrides
    #[serde(default = "default_buffering_prefix", alias = "buffering-prefix")]
    pub buffering_prefix: String,

    /// Mode of the rendered file
    #[serde(default = "default_file_mode", alias = "file-mode")]
    pub file_mode: u32,
}

impl ServiceConfig {
    pub fn validate(&self) -> Result<()> {
        require_non_empty("service", "source.path", &self.source.path)?;
        require_non_empty("service", "maintenance_mode", &self.maintenance_mode)?;
        require_path("service", "target", &self.target)?;
        require_path("service", "template", &self.template)?;
        if !self.ignore_state {
            require_non_empty("service", "state_source", &self.state_source)?;
        }
        Ok(())
    }

    /// Configured tag, with empty strings meaning "no filter"
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref().filter(|t| !t.is_empty())
    }
}

fn default_maintenance_key() -> String {
    DEFAULT_MAINTENANCE_KEY.to_string()
}
fn default_state_source() -> String {
    DEFAULT_STATE_SOURCE.to_string()
}
fn default_buffering_prefix() -> String {
    DEFAULT_BUFFERING_PREFIX.to_string()
}
pub(super) fn default_file_mode() -> u32 {
    DEFAULT_FILE_MODE
}
