//! In-memory repositories for tests

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use pacoupler_client::{ClientError, Result};
use pacoupler_core::domain::{CompanyInfo, DomainTag, JobTemplate, PageObject, TestRun};
use pacoupler_core::dto::{PageObjectDocument, TestRunDocument};
use pacoupler_core::{Sref, Watermark};
use serde_json::{Value, json};

use super::{IndexRepository, SourceRepository, TagRepository};

pub fn template(id: u32, kind: &str) -> JobTemplate {
    JobTemplate {
        sref: Sref::new(format!("jobTemplates/{}", id)),
        name: format!("Template {}", id),
        kind: kind.to_string(),
    }
}

pub fn test_run(id: u32, ran_at: &str) -> TestRun {
    serde_json::from_value(json!({
        "sref": format!("testRuns/{}", id),
        "ranAt": ran_at,
        "url": format!("http://site.example/{}", id),
        "pageTitle": format!("Page {}", id),
    }))
    .unwrap()
}

pub fn page_object(id: u32, url: &str) -> PageObject {
    serde_json::from_value(json!({
        "sref": format!("objects/{}", id),
        "url": url,
    }))
    .unwrap()
}

// =============================================================================
// Source
// =============================================================================

#[derive(Default)]
pub struct MemorySource {
    templates: Vec<JobTemplate>,
    test_runs: HashMap<Sref, Vec<TestRun>>,
    page_objects: HashMap<Sref, Vec<PageObject>>,
    failing: HashSet<Sref>,
    reject_auth: bool,
    authenticated: AtomicBool,
    test_run_requests: Mutex<Vec<(Sref, Option<Watermark>)>>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_template(mut self, template: JobTemplate, test_runs: Vec<TestRun>) -> Self {
        self.test_runs.insert(template.sref.clone(), test_runs);
        self.templates.push(template);
        self
    }

    pub fn with_page_objects(mut self, test_run: &str, objects: Vec<PageObject>) -> Self {
        self.page_objects.insert(Sref::from(test_run), objects);
        self
    }

    /// Listing children of `sref` (a template or a test run) fails
    pub fn failing(mut self, sref: &str) -> Self {
        self.failing.insert(Sref::from(sref));
        self
    }

    pub fn rejecting_auth(mut self) -> Self {
        self.reject_auth = true;
        self
    }

    pub fn test_run_requests(&self) -> Vec<(Sref, Option<Watermark>)> {
        self.test_run_requests.lock().unwrap().clone()
    }

    fn check_auth(&self) -> Result<()> {
        if self.authenticated.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    fn check_failing(&self, sref: &Sref) -> Result<()> {
        if self.failing.contains(sref) {
            Err(ClientError::api_error(500, format!("listing under {} failed", sref)))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl SourceRepository for MemorySource {
    async fn authenticate(&self) -> Result<()> {
        if self.reject_auth {
            return Err(ClientError::AuthenticationFailed {
                status: 401,
                message: "invalid_grant".to_string(),
            });
        }
        self.authenticated.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn job_templates(&self) -> Result<Vec<JobTemplate>> {
        self.check_auth()?;
        Ok(self.templates.clone())
    }

    async fn test_runs(&self, template: &Sref, since: Option<&Watermark>) -> Result<Vec<TestRun>> {
        self.check_auth()?;
        self.test_run_requests
            .lock()
            .unwrap()
            .push((template.clone(), since.copied()));
        self.check_failing(template)?;

        let runs = self.test_runs.get(template).cloned().unwrap_or_default();
        Ok(runs
            .into_iter()
            .filter(|run| match since {
                Some(since) => Watermark::parse(&run.ran_at).is_ok_and(|at| at >= *since),
                None => true,
            })
            .collect())
    }

    async fn page_objects(&self, test_run: &Sref) -> Result<Vec<PageObject>> {
        self.check_auth()?;
        self.check_failing(test_run)?;
        Ok(self.page_objects.get(test_run).cloned().unwrap_or_default())
    }
}

// =============================================================================
// Tags
// =============================================================================

#[derive(Default)]
pub struct MemoryTags {
    domains: HashMap<String, Vec<DomainTag>>,
    companies: HashMap<(String, String), Vec<CompanyInfo>>,
    unavailable: bool,
    domain_lookups: AtomicUsize,
    company_lookups: AtomicUsize,
}

impl MemoryTags {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_domain(mut self, domain: &str, company: &str, product: &str, category: &str) -> Self {
        self.domains.insert(
            domain.to_string(),
            vec![DomainTag {
                company: company.to_string(),
                product: product.to_string(),
            }],
        );
        self.companies.insert(
            (company.to_string(), product.to_string()),
            vec![CompanyInfo {
                name: company.to_string(),
                category: category.to_string(),
            }],
        );
        self
    }

    /// A domain that resolves to a product with no company record
    pub fn with_orphan_domain(mut self, domain: &str, company: &str, product: &str) -> Self {
        self.domains.insert(
            domain.to_string(),
            vec![DomainTag {
                company: company.to_string(),
                product: product.to_string(),
            }],
        );
        self
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn domain_lookups(&self) -> usize {
        self.domain_lookups.load(Ordering::SeqCst)
    }

    pub fn company_lookups(&self) -> usize {
        self.company_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TagRepository for MemoryTags {
    async fn domain_tags(&self, domain: &str) -> Result<Vec<DomainTag>> {
        self.domain_lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ClientError::api_error(503, "tag database unavailable"));
        }
        Ok(self.domains.get(domain).cloned().unwrap_or_default())
    }

    async fn company_info(&self, company: &str, product: &str) -> Result<Vec<CompanyInfo>> {
        self.company_lookups.fetch_add(1, Ordering::SeqCst);
        if self.unavailable {
            return Err(ClientError::api_error(503, "tag database unavailable"));
        }
        Ok(self
            .companies
            .get(&(company.to_string(), product.to_string()))
            .cloned()
            .unwrap_or_default())
    }
}

// =============================================================================
// Index
// =============================================================================

/// Index keyed by document id, like Elasticsearch
#[derive(Default)]
pub struct MemoryIndex {
    test_runs: Mutex<BTreeMap<String, Value>>,
    page_objects: Mutex<BTreeMap<String, Value>>,
    reject_writes: bool,
    writes: AtomicUsize,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rejecting_writes() -> Self {
        Self {
            reject_writes: true,
            ..Self::default()
        }
    }

    /// Seeds a previously indexed test run
    pub fn with_test_run(self, id: &str, ran_at: &str) -> Self {
        self.test_runs
            .lock()
            .unwrap()
            .insert(id.to_string(), json!({ "sref": id, "ranAt": ran_at }));
        self
    }

    pub fn test_run(&self, id: &str) -> Option<Value> {
        self.test_runs.lock().unwrap().get(id).cloned()
    }

    pub fn page_object(&self, id: &str) -> Option<Value> {
        self.page_objects.lock().unwrap().get(id).cloned()
    }

    pub fn test_run_count(&self) -> usize {
        self.test_runs.lock().unwrap().len()
    }

    pub fn page_object_count(&self) -> usize {
        self.page_objects.lock().unwrap().len()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn write(&self, collection: &Mutex<BTreeMap<String, Value>>, id: &str, document: Value) -> Result<()> {
        if self.reject_writes {
            return Err(ClientError::api_error(403, "index is read-only"));
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        collection.lock().unwrap().insert(id.to_string(), document);
        Ok(())
    }
}

#[async_trait]
impl IndexRepository for MemoryIndex {
    async fn upsert_test_run(&self, document: &TestRunDocument) -> Result<()> {
        let value = serde_json::to_value(document).unwrap();
        self.write(&self.test_runs, document.id().as_str(), value)
    }

    async fn upsert_page_object(&self, document: &PageObjectDocument) -> Result<()> {
        let value = serde_json::to_value(document).unwrap();
        self.write(&self.page_objects, document.id().as_str(), value)
    }

    // Sorted as strings; fixtures share one offset format so this matches date order.
    async fn latest_test_run_ran_at(&self) -> Result<Option<String>> {
        let runs = self.test_runs.lock().unwrap();
        Ok(runs
            .values()
            .filter_map(|doc| doc["ranAt"].as_str())
            .max()
            .map(str::to_string))
    }
}
