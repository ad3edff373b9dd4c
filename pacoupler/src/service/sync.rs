//! Sync pipeline
//!
//! Walks job templates → test runs → page objects and writes every test run
//! and page object to the index, denormalized and enriched.
//!
//! Failure isolation:
//! - a template whose test runs can't be listed is skipped
//! - a test run whose page objects can't be listed keeps its own document
//! - a page object that can't be enriched is indexed with defaults
//!
//! Authentication, the template listing and index writes abort the cycle.

use std::fmt;
use std::sync::Arc;

use pacoupler_client::ClientError;
use pacoupler_core::Watermark;
use pacoupler_core::domain::{Enrichment, JobTemplate, PageObject, TestRun};
use pacoupler_core::dto::{PageObjectDocument, TestRunDocument};
use tracing::{debug, info, warn};

use crate::error::SyncError;
use crate::repository::{IndexRepository, SourceRepository};
use crate::service::EnrichmentService;

/// Counters describing one sync
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub templates_seen: usize,
    pub templates_skipped: usize,
    pub templates_failed: usize,
    pub test_runs_indexed: usize,
    pub page_object_listings_failed: usize,
    pub page_objects_indexed: usize,
    pub enrichment_fallbacks: usize,
}

impl fmt::Display for SyncReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} templates ({} filtered, {} failed), {} test runs, {} page objects \
             ({} listings failed, {} without tag info)",
            self.templates_seen,
            self.templates_skipped,
            self.templates_failed,
            self.test_runs_indexed,
            self.page_objects_indexed,
            self.page_object_listings_failed,
            self.enrichment_fallbacks,
        )
    }
}

/// What happened to one job template
enum TemplateOutcome {
    Filtered,
    ListingFailed(ClientError),
    Synced(Vec<RunOutcome>),
}

/// What happened to one test run (its document is always written)
struct RunOutcome {
    page_objects: Result<Vec<bool>, ClientError>,
}

pub struct SyncPipeline {
    source: Arc<dyn SourceRepository>,
    index: Arc<dyn IndexRepository>,
    enrichment: EnrichmentService,
    allowed_kinds: Vec<String>,
}

impl SyncPipeline {
    /// Creates a new pipeline
    ///
    /// # Arguments
    /// * `source` - The PA API
    /// * `index` - Where documents are written
    /// * `enrichment` - Tag lookups for page objects
    /// * `allowed_kinds` - Job template types to sync; empty syncs all
    pub fn new(
        source: Arc<dyn SourceRepository>,
        index: Arc<dyn IndexRepository>,
        enrichment: EnrichmentService,
        allowed_kinds: Vec<String>,
    ) -> Self {
        Self {
            source,
            index,
            enrichment,
            allowed_kinds,
        }
    }

    /// Runs one sync
    ///
    /// # Arguments
    /// * `watermark` - Only test runs after this point are fetched
    /// * `force_full` - Ignore `watermark` and fetch every test run
    pub async fn sync(&self, watermark: Option<&Watermark>, force_full: bool) -> Result<SyncReport, SyncError> {
        let since = if force_full { None } else { watermark };

        self.source
            .authenticate()
            .await
            .map_err(SyncError::Authentication)?;
        info!("Authenticated with PA API");

        let templates = self
            .source
            .job_templates()
            .await
            .map_err(|source| SyncError::ApiQuery {
                what: "job templates",
                source,
            })?;

        let mut report = SyncReport {
            templates_seen: templates.len(),
            ..SyncReport::default()
        };

        for template in &templates {
            match self.sync_template(template, since).await? {
                TemplateOutcome::Filtered => {
                    debug!("Skipping {} of type {}", template.sref, template.kind);
                    report.templates_skipped += 1;
                }
                TemplateOutcome::ListingFailed(e) => {
                    warn!("Couldn't list test runs of {}: {}", template.sref, e);
                    report.templates_failed += 1;
                }
                TemplateOutcome::Synced(runs) => {
                    report.test_runs_indexed += runs.len();
                    for run in runs {
                        match run.page_objects {
                            Ok(objects) => {
                                report.page_objects_indexed += objects.len();
                                report.enrichment_fallbacks +=
                                    objects.iter().filter(|enriched| !**enriched).count();
                            }
                            Err(_) => report.page_object_listings_failed += 1,
                        }
                    }
                }
            }
        }

        Ok(report)
    }

    async fn sync_template(
        &self,
        template: &JobTemplate,
        since: Option<&Watermark>,
    ) -> Result<TemplateOutcome, SyncError> {
        if !template.is_allowed(&self.allowed_kinds) {
            return Ok(TemplateOutcome::Filtered);
        }

        let test_runs = match self.source.test_runs(&template.sref, since).await {
            Ok(test_runs) => test_runs,
            Err(e) => return Ok(TemplateOutcome::ListingFailed(e)),
        };
        info!("Importing {} testruns from Jobtemplate {}", test_runs.len(), template.sref);

        let mut outcomes = Vec::with_capacity(test_runs.len());
        for test_run in test_runs {
            outcomes.push(self.sync_test_run(test_run, template).await?);
        }
        Ok(TemplateOutcome::Synced(outcomes))
    }

    async fn sync_test_run(&self, test_run: TestRun, template: &JobTemplate) -> Result<RunOutcome, SyncError> {
        let document = TestRunDocument::new(test_run, template);
        self.index
            .upsert_test_run(&document)
            .await
            .map_err(|source| SyncError::Index {
                id: document.id().to_string(),
                source,
            })?;
        info!("Indexed testrun {}", document.id());

        let objects = match self.source.page_objects(document.id()).await {
            Ok(objects) => objects,
            Err(e) => {
                warn!("Couldn't list page objects of {}: {}", document.id(), e);
                return Ok(RunOutcome {
                    page_objects: Err(e),
                });
            }
        };

        let mut enriched = Vec::with_capacity(objects.len());
        for object in objects {
            enriched.push(self.sync_page_object(object, &document).await?);
        }
        Ok(RunOutcome {
            page_objects: Ok(enriched),
        })
    }

    /// Indexes one page object; returns whether tag info was found
    async fn sync_page_object(&self, object: PageObject, parent: &TestRunDocument) -> Result<bool, SyncError> {
        let (enrichment, enriched) = match self.enrichment.enrich(&object).await {
            Ok(enrichment) => {
                let known = !enrichment.is_unknown();
                if known {
                    debug!("Retrieved tag info for {}", object.sref);
                }
                (enrichment, known)
            }
            Err(e) => {
                warn!(
                    "Failed to retrieve 3rd party info for '{}': {}",
                    object.url.as_deref().unwrap_or_default(),
                    e
                );
                (Enrichment::unknown(), false)
            }
        };

        let document = PageObjectDocument::new(object, parent, enrichment);
        self.index
            .upsert_page_object(&document)
            .await
            .map_err(|source| SyncError::Index {
                id: document.id().to_string(),
                source,
            })?;
        debug!("Indexed pageobject {}", document.id());
        Ok(enriched)
    }
}
