//! Elasticsearch document index client
//!
//! Only the two operations the coupler needs are exposed: upserting a
//! document under an explicit id, and reading the greatest value of a field.
//! Hosts are tried in order; a host that cannot be reached fails over to the
//! next one.

use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, warn};

use crate::error::{ClientError, Result};
use crate::{DEFAULT_HTTP_TIMEOUT, build_http_client, handle_empty_response, handle_response, trim_base_url};

/// HTTP client for an Elasticsearch cluster
#[derive(Debug, Clone)]
pub struct IndexClient {
    hosts: Vec<String>,
    credentials: Option<(String, String)>,
    client: Client,
}

impl IndexClient {
    /// Create an index client with the default request timeout
    pub fn new(hosts: Vec<String>) -> Result<Self> {
        Ok(Self::with_client(hosts, build_http_client(DEFAULT_HTTP_TIMEOUT)?))
    }

    pub fn with_client(hosts: Vec<String>, client: Client) -> Self {
        Self {
            hosts: hosts.into_iter().map(trim_base_url).collect(),
            credentials: None,
            client,
        }
    }

    /// Authenticate every request with HTTP Basic credentials
    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.credentials = Some((username.into(), password.into()));
        self
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    // =============================================================================
    // Documents
    // =============================================================================

    /// Index `document` under `id`, replacing any previous version
    pub async fn upsert<T: Serialize + ?Sized>(&self, index: &str, id: &str, document: &T) -> Result<()> {
        let response = self
            .send(|host| {
                let url = document_url(host, index, id)?;
                Ok(self.client.put(url).json(document))
            })
            .await?;

        handle_empty_response(response).await?;
        debug!("Indexed {}/{}", index, id);
        Ok(())
    }

    /// The greatest value of `field` across `index`
    ///
    /// Returns `None` when the index is missing or holds no documents.
    pub async fn latest_value(&self, index: &str, field: &str) -> Result<Option<String>> {
        let body = latest_value_query(field);
        let response = self
            .send(|host| {
                let url = search_url(host, index)?;
                Ok(self.client.post(url).json(&body))
            })
            .await?;

        let hits: Value = match handle_response(response).await {
            Ok(hits) => hits,
            Err(e) if e.is_not_found() => {
                debug!("Index {} does not exist", index);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        Ok(extract_latest(&hits, field))
    }

    // =============================================================================
    // Transport
    // =============================================================================

    async fn send<F>(&self, build: F) -> Result<Response>
    where
        F: Fn(&str) -> Result<RequestBuilder>,
    {
        let mut last_error = None;

        for host in &self.hosts {
            let mut request = build(host)?;
            if let Some((username, password)) = &self.credentials {
                request = request.basic_auth(username, Some(password));
            }

            match request.send().await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    let err = ClientError::RequestFailed(e);
                    if !err.is_transport() {
                        return Err(err);
                    }
                    warn!("Index host {} unreachable: {}", host, err);
                    last_error = Some(err);
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| ClientError::InvalidRequest("no index hosts configured".to_string())))
    }
}

fn endpoint_url(host: &str, segments: &[&str]) -> Result<Url> {
    let mut url = Url::parse(host)
        .map_err(|e| ClientError::InvalidRequest(format!("invalid index host '{}': {}", host, e)))?;
    url.path_segments_mut()
        .map_err(|_| ClientError::InvalidRequest(format!("index host '{}' cannot be a base", host)))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// `{host}/{index}/_doc/{id}`, with `/` inside `id` percent-encoded
fn document_url(host: &str, index: &str, id: &str) -> Result<Url> {
    endpoint_url(host, &[index, "_doc", id])
}

fn search_url(host: &str, index: &str) -> Result<Url> {
    endpoint_url(host, &[index, "_search"])
}

fn latest_value_query(field: &str) -> Value {
    json!({
        "size": 1,
        "sort": [{ field: { "order": "desc", "unmapped_type": "date" } }],
        "_source": [field],
    })
}

fn extract_latest(hits: &Value, field: &str) -> Option<String> {
    hits.pointer("/hits/hits/0/_source")
        .and_then(|source| source.get(field))
        .and_then(Value::as_str)
        .map(str::to_string)
}
