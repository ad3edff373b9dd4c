//! Source repository
//!
//! Read access to the Performance Analyser API:
//! - Authenticating (must happen before any listing)
//! - Listing job templates, test runs and page objects

use async_trait::async_trait;
use pacoupler_client::{PaApiClient, Result};
use pacoupler_core::domain::{JobTemplate, PageObject, TestRun};
use pacoupler_core::{Sref, Watermark};

/// Repository trait for the PA API
#[async_trait]
pub trait SourceRepository: Send + Sync {
    /// Obtains the credentials used by every later call
    async fn authenticate(&self) -> Result<()>;

    /// Lists the realm's job templates, in the order PA returns them
    async fn job_templates(&self) -> Result<Vec<JobTemplate>>;

    /// Lists test runs of a template
    ///
    /// # Arguments
    /// * `template` - The job template reference
    /// * `since` - Only runs after this point; all runs when `None`
    async fn test_runs(&self, template: &Sref, since: Option<&Watermark>) -> Result<Vec<TestRun>>;

    /// Lists the page objects measured in a test run
    async fn page_objects(&self, test_run: &Sref) -> Result<Vec<PageObject>>;
}

#[async_trait]
impl SourceRepository for PaApiClient {
    async fn authenticate(&self) -> Result<()> {
        PaApiClient::authenticate(self).await
    }

    async fn job_templates(&self) -> Result<Vec<JobTemplate>> {
        self.list_job_templates().await
    }

    async fn test_runs(&self, template: &Sref, since: Option<&Watermark>) -> Result<Vec<TestRun>> {
        self.list_test_runs(template, since).await
    }

    async fn page_objects(&self, test_run: &Sref) -> Result<Vec<PageObject>> {
        self.list_page_objects(test_run).await
    }
}
