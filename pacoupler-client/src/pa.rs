//! Performance Analyser API client

use std::fmt;
use std::sync::RwLock;

use pacoupler_core::domain::{JobTemplate, PageObject, TestRun};
use pacoupler_core::dto::ResultsPage;
use pacoupler_core::{Sref, Watermark};
use reqwest::Client;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{ClientError, Result};
use crate::{DEFAULT_HTTP_TIMEOUT, build_http_client, handle_response, trim_base_url};

/// Default PA API endpoint
pub const DEFAULT_PA_URL: &str = "https://paapi.siteconfidence.co.uk";

/// Page size sent on every list call; later pages are never requested
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

const REALM_HEADER: &str = "Realm";

/// Credentials for the PA password grant
#[derive(Clone)]
pub struct PaCredentials {
    pub username: String,
    pub password: String,
    /// Pre-encoded HTTP Basic value identifying the API client
    pub basic_auth: String,
}

impl PaCredentials {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        basic_auth: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            basic_auth: basic_auth.into(),
        }
    }
}

impl fmt::Debug for PaCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PaCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("basic_auth", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

/// HTTP client for the PA API
///
/// `authenticate` must succeed before any list call; the bearer token it
/// obtains is attached to every later request together with the realm.
pub struct PaApiClient {
    /// Base URL (e.g. "https://paapi.siteconfidence.co.uk")
    base_url: String,
    realm: String,
    credentials: PaCredentials,
    page_size: u32,
    client: Client,
    token: RwLock<Option<String>>,
}

impl fmt::Debug for PaApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let authenticated = self
            .token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .is_some();
        f.debug_struct("PaApiClient")
            .field("base_url", &self.base_url)
            .field("realm", &self.realm)
            .field("credentials", &self.credentials)
            .field("page_size", &self.page_size)
            .field("authenticated", &authenticated)
            .finish_non_exhaustive()
    }
}

impl PaApiClient {
    /// Create a new PA client with the default request timeout
    pub fn new(
        base_url: impl Into<String>,
        realm: impl Into<String>,
        credentials: PaCredentials,
    ) -> Result<Self> {
        let client = build_http_client(DEFAULT_HTTP_TIMEOUT)?;
        Ok(Self::with_client(base_url, realm, credentials, client))
    }

    /// Create a new PA client with a configured reqwest Client
    pub fn with_client(
        base_url: impl Into<String>,
        realm: impl Into<String>,
        credentials: PaCredentials,
        client: Client,
    ) -> Self {
        Self {
            base_url: trim_base_url(base_url),
            realm: realm.into(),
            credentials,
            page_size: DEFAULT_PAGE_SIZE,
            client,
            token: RwLock::new(None),
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Get the base URL of the PA API
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, resource: &str) -> String {
        format!("{}/pa/1/{}", self.base_url, resource)
    }

    // =============================================================================
    // Authentication
    // =============================================================================

    /// Exchanges the configured credentials for a bearer token
    pub async fn authenticate(&self) -> Result<()> {
        let url = format!("{}/authorisation/token", self.base_url);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Basic {}", self.credentials.basic_auth))
            .form(&[
                ("username", self.credentials.username.as_str()),
                ("password", self.credentials.password.as_str()),
                ("grant_type", "password"),
            ])
            .send()
            .await?;

        let token: TokenResponse = handle_response(response).await.map_err(|e| match e {
            ClientError::ApiError { status, message } => {
                ClientError::AuthenticationFailed { status, message }
            }
            other => other,
        })?;

        *self
            .token
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(token.access_token);
        debug!("Obtained PA bearer token");
        Ok(())
    }

    fn bearer_token(&self) -> Result<String> {
        self.token
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
            .ok_or(ClientError::NotAuthenticated)
    }

    // =============================================================================
    // Listings
    // =============================================================================

    /// List the job templates of the realm
    pub async fn list_job_templates(&self) -> Result<Vec<JobTemplate>> {
        self.list("jobTemplates", &self.job_templates_query()).await
    }

    /// List test runs of a job template, optionally only those since `since`
    pub async fn list_test_runs(
        &self,
        template: &Sref,
        since: Option<&Watermark>,
    ) -> Result<Vec<TestRun>> {
        self.list("testRuns", &self.test_runs_query(template, since))
            .await
    }

    /// List the page objects measured in a test run
    pub async fn list_page_objects(&self, test_run: &Sref) -> Result<Vec<PageObject>> {
        self.list("objects", &self.page_objects_query(test_run))
            .await
    }

    async fn list<T: DeserializeOwned>(&self, resource: &str, query: &[(&str, String)]) -> Result<Vec<T>> {
        let token = self.bearer_token()?;
        let url = self.api_url(resource);
        debug!("GET {} {:?}", url, query);

        let response = self
            .client
            .get(&url)
            .bearer_auth(token)
            .header(REALM_HEADER, &self.realm)
            .query(query)
            .send()
            .await?;

        let page: ResultsPage<T> = handle_response(response).await?;
        Ok(page.into_results())
    }

    fn job_templates_query(&self) -> Vec<(&'static str, String)> {
        vec![("paginationPageSize", self.page_size.to_string())]
    }

    fn test_runs_query(&self, template: &Sref, since: Option<&Watermark>) -> Vec<(&'static str, String)> {
        let mut query = vec![("jobTemplate", format!("jobTemplates/{}", template.id()))];
        if let Some(since) = since {
            query.push(("fromDate", since.to_string()));
        }
        query.push(("paginationPageSize", self.page_size.to_string()));
        query
    }

    fn page_objects_query(&self, test_run: &Sref) -> Vec<(&'static str, String)> {
        vec![
            ("testRun", format!("testRuns/{}", test_run.id())),
            ("paginationPageSize", self.page_size.to_string()),
        ]
    }
}
