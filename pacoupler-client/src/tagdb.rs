//! Tag database client
//!
//! Stateless lookups; caching is the caller's concern.

use pacoupler_core::domain::{CompanyInfo, DomainTag};
use reqwest::Client;
use tracing::debug;

use crate::error::Result;
use crate::{DEFAULT_HTTP_TIMEOUT, build_http_client, handle_response, trim_base_url};

/// Default tag database endpoint
pub const DEFAULT_TAGDB_URL: &str = "https://ncctagdb.herokuapp.com/2";

/// HTTP client for the third-party tag database
#[derive(Debug, Clone)]
pub struct TagDbClient {
    base_url: String,
    client: Client,
}

impl TagDbClient {
    /// Create a tag database client with the default request timeout
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Ok(Self::with_client(base_url, build_http_client(DEFAULT_HTTP_TIMEOUT)?))
    }

    pub fn with_client(base_url: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Companies and products known to serve `domain`
    pub async fn domain_tags(&self, domain: &str) -> Result<Vec<DomainTag>> {
        let url = format!("{}/tag", self.base_url);
        debug!("Looking up tags for domain {}", domain);
        let response = self
            .client
            .get(&url)
            .query(&[("domain", domain)])
            .send()
            .await?;

        handle_response(response).await
    }

    /// Name and category of a company's product
    pub async fn company_info(&self, company: &str, product: &str) -> Result<Vec<CompanyInfo>> {
        let url = format!("{}/product", self.base_url);
        debug!("Looking up product {} of {}", product, company);
        let response = self
            .client
            .get(&url)
            .query(&[("company", company), ("name", product)])
            .send()
            .await?;

        handle_response(response).await
    }
}
