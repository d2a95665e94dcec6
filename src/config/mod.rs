//! Configuration management for the reconciliation daemon.
//!
//! Provides layered configuration loading with priority:
//! 1. Default values (hardcoded)
//! 2. Config file (YAML or TOML, chosen by extension)
//! 3. Environment variables prefixed with `REGSYNC__` (highest priority)
//!
//! Every reconciled artifact has its own optional section. A section that is
//! absent means the artifact is not managed.

mod logging;
mod maintenance;
mod registry;
mod retry;
mod service;
mod warp;
pub use logging::*;
pub use maintenance::*;
pub use registry::*;
pub use retry::*;
pub use service::*;
pub use warp::*;


//---
use std::path::Path;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;

use crate::Error;
use crate::Result;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Settings {
    /// Registry endpoints and request timeouts
    #[serde(default)]
    pub registry: RegistryConfig,
    /// Backoff policies for the watch loops
    #[serde(default)]
    pub retry: RetryPolicies,
    /// Log level and destination
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Reverse-proxy service list
    #[serde(default)]
    pub service: Option<ServiceConfig>,
    /// Navigation menu JSON
    #[serde(default)]
    pub warp: Option<WarpConfig>,
    /// Maintenance page
    #[serde(default)]
    pub maintenance: Option<MaintenanceConfig>,
}

impl Settings {
    /// Load configuration from the given file, overlaid with environment
    /// variables.
    ///
    /// # Arguments
    /// * `path` - Config file; the format follows the extension
    ///
    /// # Returns
    /// Merged and validated configuration
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let settings: Settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(true))
            .add_source(
                Environment::with_prefix("REGSYNC")
                    .prefix_separator("__")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("registry.endpoints"),
            )
            .build()?
            .try_deserialize()?;

        settings.validate()?;
        Ok(settings)
    }

    /// Validates every configured section
    /// # Errors
    /// Returns `Error::InvalidConfig` on the first violated rule
    pub fn validate(&self) -> Result<()> {
        self.registry.validate()?;
        self.retry.validate()?;

        if self.service.is_none() && self.warp.is_none() && self.maintenance.is_none() {
            return Err(Error::InvalidConfig(
                "at least one of service, warp or maintenance must be configured".into(),
            ));
        }

        if let Some(service) = &self.service {
            service.validate()?;
        }
        if let Some(warp) = &self.warp {
            warp.validate()?;
        }
        if let Some(maintenance) = &self.maintenance {
            maintenance.validate()?;
        }
        Ok(())
    }
}

pub(crate) fn require_non_empty(
    section: &str,
    field: &str,
    value: &str,
) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidConfig(format!("{section}.{field} must not be empty")));
    }
    Ok(())
}

pub(crate) fn require_path(
    section: &str,
    field: &str,
    value: &Path,
) -> Result<()> {
    if value.as_os_str().is_empty() {
        return Err(Error::InvalidConfig(format!("{section}.{field} must not be empty")));
    }
    Ok(())
}
