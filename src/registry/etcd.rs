use std::time::Duration;

use reqwest::Client;
use reqwest::Url;
use serde::Deserialize;
use tracing::debug;
use tracing::warn;

use super::Action;
use super::Node;
use super::Registry;
use super::WatchEvent;
use crate::Error;
use crate::RegistryConfig;
use crate::RegistryError;
use crate::Result;

/// etcd v2 error code for a missing key
const ETCD_KEY_NOT_FOUND: u32 = 100;
/// etcd v2 error code for a wait index that fell out of the event history
const ETCD_EVENT_INDEX_CLEARED: u32 = 401;
/// Header carrying the key space index a response was produced at
const ETCD_INDEX_HEADER: &str = "X-Etcd-Index";
const ROOT_KEY: &str = "/";

/// [`Registry`] backed by the etcd v2 keys HTTP API.
///
/// Requests go to the configured endpoints in order; the next endpoint is
/// only tried when the connection itself fails. If every endpoint refuses
/// the connection the error is [`RegistryError::Unavailable`].
#[derive(Debug, Clone)]
pub struct EtcdRegistry {
    client: Client,
    endpoints: Vec<Url>,
    request_timeout: Duration,
}

/// Raw answer of one endpoint
struct Reply {
    status: u16,
    etcd_index: Option<u64>,
    body: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct KeysResponse {
    pub(crate) action: Action,
    pub(crate) node: Node,
    #[serde(default)]
    pub(crate) prev_node: Option<Node>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeysError {
    error_code: u32,
    #[serde(default)]
    message: String,
    #[serde(default)]
    cause: String,
}

impl EtcdRegistry {
    pub fn new(config: &RegistryConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()
            .map_err(|e| Error::Fatal(format!("failed to create registry client: {e}")))?;

        let mut endpoints = Vec::with_capacity(config.endpoints.len());
        for endpoint in &config.endpoints {
            let url = Url::parse(endpoint).map_err(|e| {
                Error::InvalidConfig(format!("invalid registry endpoint {endpoint}: {e}"))
            })?;
            if url.cannot_be_a_base() {
                return Err(Error::InvalidConfig(format!(
                    "invalid registry endpoint {endpoint}: not a base URL"
                )));
            }
            endpoints.push(url);
        }

        Ok(Self {
            client,
            endpoints,
            request_timeout: config.request_timeout(),
        })
    }

    async fn send(
        &self,
        key: &str,
        query: &[(&str, String)],
        timeout: Option<Duration>,
    ) -> std::result::Result<Reply, RegistryError> {
        let mut last_connect_error = None;

        for endpoint in &self.endpoints {
            let url = keys_url(endpoint, key)?;
            debug!("[:EtcdRegistry:send] GET {url} {query:?}");

            let mut request = self.client.get(url.clone()).query(query);
            if let Some(timeout) = timeout {
                request = request.timeout(timeout);
            }

            match request.send().await {
                Ok(response) => {
                    let status = response.status().as_u16();
                    let etcd_index = response
                        .headers()
                        .get(ETCD_INDEX_HEADER)
                        .and_then(|v| v.to_str().ok())
                        .and_then(|v| v.parse().ok());
                    let body = response.text().await.map_err(|e| {
                        RegistryError::Request(format!("failed to read response from {endpoint}: {e}"))
                    })?;
                    return Ok(Reply {
                        status,
                        etcd_index,
                        body,
                    });
                }
                Err(e) if e.is_connect() => {
                    warn!("could not connect to registry endpoint {endpoint}: {e}");
                    last_connect_error = Some(format!("{endpoint}: {e}"));
                }
                Err(e) if e.is_timeout() => {
                    return Err(RegistryError::Request(format!("request to {url} timed out")));
                }
                Err(e) => return Err(RegistryError::Request(format!("request to {url} failed: {e}"))),
            }
        }

        Err(RegistryError::Unavailable(
            last_connect_error.unwrap_or_else(|| "no endpoint configured".to_string()),
        ))
    }
}

#[async_trait::async_trait]
impl Registry for EtcdRegistry {
    async fn get(
        &self,
        key: &str,
    ) -> std::result::Result<Node, RegistryError> {
        let query = [("sorted", "true".to_string())];
        let reply = self.send(key, &query, Some(self.request_timeout)).await?;
        Ok(decode_response(key, reply.status, &reply.body)?.node)
    }

    async fn read_index(&self) -> std::result::Result<u64, RegistryError> {
        let reply = self.send(ROOT_KEY, &[], Some(self.request_timeout)).await?;
        if !(200..300).contains(&reply.status) {
            return Err(decode_error(ROOT_KEY, reply.status, &reply.body));
        }
        reply.etcd_index.ok_or_else(|| {
            RegistryError::InvalidResponse(format!(
                "read of {ROOT_KEY} carries no {ETCD_INDEX_HEADER} header"
            ))
        })
    }

    async fn watch_next(
        &self,
        key: &str,
        recursive: bool,
        after_index: Option<u64>,
    ) -> std::result::Result<WatchEvent, RegistryError> {
        let mut query = vec![("wait", "true".to_string()), ("recursive", recursive.to_string())];
        if let Some(index) = after_index {
            query.push(("waitIndex", index.to_string()));
        }

        // long-poll: only the connect timeout applies
        let reply = self.send(key, &query, None).await?;
        let response = decode_response(key, reply.status, &reply.body)?;
        Ok(WatchEvent {
            index: response.node.modified_index,
            action: response.action,
            node: response.node,
            prev_node: response.prev_node,
        })
    }
}

/// `{endpoint}/v2/keys/{key}` with every key segment percent-encoded.
pub(crate) fn keys_url(
    endpoint: &Url,
    key: &str,
) -> std::result::Result<Url, RegistryError> {
    let mut url = endpoint.clone();
    url.path_segments_mut()
        .map_err(|_| RegistryError::Request(format!("{endpoint} cannot carry a key path")))?
        .pop_if_empty()
        .extend(["v2", "keys"])
        .extend(key.trim_start_matches('/').split('/'));
    Ok(url)
}

/// Decodes an etcd v2 keys API answer into either a response or a
/// classified error.
pub(crate) fn decode_response(
    key: &str,
    status: u16,
    body: &str,
) -> std::result::Result<KeysResponse, RegistryError> {
    if (200..300).contains(&status) {
        return serde_json::from_str(body).map_err(|e| {
            RegistryError::InvalidResponse(format!("failed to decode response for {key}: {e}"))
        });
    }

    Err(decode_error(key, status, body))
}

/// Classifies a non-2xx answer.
fn decode_error(
    key: &str,
    status: u16,
    body: &str,
) -> RegistryError {
    match serde_json::from_str::<KeysError>(body) {
        Ok(error) if error.error_code == ETCD_KEY_NOT_FOUND => RegistryError::KeyNotFound {
            key: key.to_string(),
        },
        Ok(error) if error.error_code == ETCD_EVENT_INDEX_CLEARED => RegistryError::Request(
            format!("event index cleared while watching {key}: {}", error.message),
        ),
        Ok(error) => RegistryError::Request(format!(
            "etcd error {} for {key}: {} ({})",
            error.error_code, error.message, error.cause
        )),
        Err(_) => RegistryError::Request(format!("HTTP {status} for {key}: {}", body.trim())),
    }
}
