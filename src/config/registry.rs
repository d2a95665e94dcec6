use std::time::Duration;

use serde::Deserialize;

use crate::Error;
use crate::Result;

/// Connection settings of the etcd-compatible registry
#[derive(Debug, Deserialize, Clone)]
pub struct RegistryConfig {
    /// Endpoint URLs, tried in order until one accepts the connection
    /// Default: http://localhost:2379
    #[serde(default = "default_endpoints", alias = "endpoint")]
    pub endpoints: Vec<String>,

    /// Upper bound for a plain read (long-poll watches are not bounded)
    /// Default: 1 second
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Maximum time to establish a TCP connection to one endpoint
    /// Default: 1 second
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            endpoints: default_endpoints(),
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl RegistryConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.endpoints.is_empty() {
            return Err(Error::InvalidConfig(
                "registry.endpoints must contain at least one endpoint".into(),
            ));
        }

        for endpoint in &self.endpoints {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(Error::InvalidConfig(format!(
                    "registry endpoint {endpoint} must start with http:// or https://"
                )));
            }
        }

        if self.request_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "registry.request_timeout_ms must be greater than 0".into(),
            ));
        }
        Ok(())
    }
}

fn default_endpoints() -> Vec<String> {
    vec!["http://localhost:2379".to_string()]
}
fn default_request_timeout_ms() -> u64 {
    1000
}
fn default_connect_timeout_ms() -> u64 {
    1000
}
