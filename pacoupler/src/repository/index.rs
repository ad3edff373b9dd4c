//! Index repository
//!
//! The index is the system of record for what has already been synced:
//! documents are upserted under their `sref`, and the newest test run's
//! `ranAt` is read back to compute the next watermark.

use async_trait::async_trait;
use pacoupler_client::{IndexClient, Result};
use pacoupler_core::dto::{PageObjectDocument, TestRunDocument};

const RAN_AT_FIELD: &str = "ranAt";

/// Repository trait for the document index
#[async_trait]
pub trait IndexRepository: Send + Sync {
    /// Writes a test run, replacing any document with the same id
    async fn upsert_test_run(&self, document: &TestRunDocument) -> Result<()>;

    /// Writes a page object, replacing any document with the same id
    async fn upsert_page_object(&self, document: &PageObjectDocument) -> Result<()>;

    /// `ranAt` of the most recent indexed test run, as stored
    ///
    /// Returns `None` when nothing has been indexed yet, including when the
    /// index does not exist.
    async fn latest_test_run_ran_at(&self) -> Result<Option<String>>;
}

/// Elasticsearch implementation of IndexRepository
pub struct ElasticsearchIndex {
    client: IndexClient,
    testrun_index: String,
    pageobject_index: String,
}

impl ElasticsearchIndex {
    /// Creates a new Elasticsearch index repository
    ///
    /// # Arguments
    /// * `client` - Connection to the cluster
    /// * `testrun_index` - Index test runs are written to (e.g. "pa-testruns")
    /// * `pageobject_index` - Index page objects are written to (e.g. "pa-objects")
    pub fn new(client: IndexClient, testrun_index: String, pageobject_index: String) -> Self {
        Self {
            client,
            testrun_index,
            pageobject_index,
        }
    }
}

#[async_trait]
impl IndexRepository for ElasticsearchIndex {
    async fn upsert_test_run(&self, document: &TestRunDocument) -> Result<()> {
        self.client
            .upsert(&self.testrun_index, document.id().as_str(), document)
            .await
    }

    async fn upsert_page_object(&self, document: &PageObjectDocument) -> Result<()> {
        self.client
            .upsert(&self.pageobject_index, document.id().as_str(), document)
            .await
    }

    async fn latest_test_run_ran_at(&self) -> Result<Option<String>> {
        self.client
            .latest_value(&self.testrun_index, RAN_AT_FIELD)
            .await
    }
}
