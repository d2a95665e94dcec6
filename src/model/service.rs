use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use super::RawData;
use crate::constants::PROXY_BUFFERING_ON;
use crate::EntityError;

/// Rewrite rule of a service, taken from the `rewrite` attribute
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rewrite {
    #[serde(default)]
    pub pattern: String,
    #[serde(default)]
    pub rewrite: String,
}

/// A running service as exposed to the proxy template
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub name: String,
    pub url: String,
    pub health_status: String,
    pub location: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rewrite: Option<Rewrite>,
    pub proxy_buffering: String,
    pub state: String,
    pub state_node: String,
}

impl Service {
    /// Builds a service from a registration.
    ///
    /// Returns `Ok(None)` when `name` or `service` is missing or not a
    /// string. A malformed `rewrite` attribute is an error.
    pub fn from_raw(raw: &RawData) -> Result<Option<Self>, EntityError> {
        let Some(address) = raw.get_str("service") else {
            return Ok(None);
        };
        let Some(name) = raw.get_str("name") else {
            return Ok(None);
        };

        // an empty health status is fine, older registrators do not send one
        let health_status = raw.get_str("healthStatus").unwrap_or_default();
        let location = raw.get_attribute("location").unwrap_or(name);

        let rewrite = match raw.get_attribute("rewrite") {
            Some(rule) => Some(
                serde_json::from_str::<Rewrite>(rule).map_err(EntityError::InvalidRewrite)?,
            ),
            None => None,
        };

        Ok(Some(Service {
            name: name.to_string(),
            url: format!("http://{address}"),
            health_status: health_status.to_string(),
            location: location.to_string(),
            rewrite,
            proxy_buffering: PROXY_BUFFERING_ON.to_string(),
            state: String::new(),
            state_node: String::new(),
        }))
    }
}

impl fmt::Display for Service {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(
            f,
            "{{name={}, URL={}, HealthStatus={}, Location={}, Rewrite={:?}}}",
            self.name, self.url, self.health_status, self.location, self.rewrite
        )
    }
}

/// Input of the proxy template
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TemplateModel {
    /// Raw value of the maintenance key, empty when there is none
    pub maintenance: String,
    pub services: Vec<Service>,
}
