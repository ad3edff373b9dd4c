//! PA Coupler HTTP Clients
//!
//! Type-safe HTTP clients for the three services the coupler talks to:
//! - `PaApiClient`: the Performance Analyser API (token auth, list endpoints)
//! - `TagDbClient`: the third-party tag database (domain and product lookups)
//! - `IndexClient`: the Elasticsearch document index (upserts, latest value)
//!
//! # Example
//!
//! ```no_run
//! use pacoupler_client::{PaApiClient, PaCredentials};
//!
//! # async fn example() -> pacoupler_client::Result<()> {
//! let client = PaApiClient::new(
//!     "https://paapi.siteconfidence.co.uk",
//!     "12345",
//!     PaCredentials::new("user", "secret", "YWJjZGVm"),
//! )?;
//! client.authenticate().await?;
//! let templates = client.list_job_templates().await?;
//! println!("{} job templates", templates.len());
//! # Ok(())
//! # }
//! ```

pub mod error;
mod index;
mod pa;
mod tagdb;

#[cfg(test)]
mod test_server;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use index::IndexClient;
pub use pa::{DEFAULT_PAGE_SIZE, DEFAULT_PA_URL, PaApiClient, PaCredentials};
pub use tagdb::{DEFAULT_TAGDB_URL, TagDbClient};

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;

/// Request timeout used by the `new` constructors
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Builds the shared HTTP client with a bounded request timeout
///
/// Every outbound call made by the coupler goes through a client built here,
/// so no request can block forever.
pub fn build_http_client(timeout: Duration) -> Result<Client> {
    Client::builder()
        .timeout(timeout)
        .connect_timeout(timeout.min(Duration::from_secs(10)))
        .user_agent(concat!("pa-es-coupler/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(ClientError::RequestFailed)
}

// =============================================================================
// Response Handlers
// =============================================================================

/// Handle an API response and deserialize JSON
///
/// This checks the status code and returns an appropriate error if the
/// request failed, or deserializes the response body if successful.
pub(crate) async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    response
        .json()
        .await
        .map_err(|e| ClientError::ParseError(format!("Failed to parse JSON response: {}", e)))
}

/// Handle an API response whose body is not needed
pub(crate) async fn handle_empty_response(response: reqwest::Response) -> Result<()> {
    let status = response.status();

    if !status.is_success() {
        let error_text = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        return Err(ClientError::api_error(status.as_u16(), error_text));
    }

    Ok(())
}

pub(crate) fn trim_base_url(base_url: impl Into<String>) -> String {
    base_url.into().trim_end_matches('/').to_string()
}
