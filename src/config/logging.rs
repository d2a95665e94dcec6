use std::path::PathBuf;

use serde::Deserialize;

/// Log level and destination. `RUST_LOG` takes precedence over `level`.
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// Default: info
    #[serde(default = "default_level")]
    pub level: String,

    /// Write `regsync.log` into this directory instead of stdout
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            log_dir: None,
        }
    }
}

fn default_level() -> String {
    "info".to_string()
}
