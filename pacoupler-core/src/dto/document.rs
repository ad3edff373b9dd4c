//! Index documents
//!
//! Test runs and page objects are written to the index denormalized: each
//! document carries the fields of its ancestors so it can be queried without
//! joins.

use serde::Serialize;
use serde_json::{Map, Value};

use crate::domain::{Enrichment, JobTemplate, PageObject, TestRun};
use crate::types::Sref;

const TEST_RUN_ADDED_FIELDS: &[&str] = &["jobTemplateUri", "jobTemplateName"];

const PAGE_OBJECT_ADDED_FIELDS: &[&str] = &[
    "company",
    "category",
    "ranAt",
    "jobTemplateUri",
    "jobTemplateName",
    "parentUrl",
    "parentPageTitle",
];

/// Test run as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRunDocument {
    #[serde(flatten)]
    pub test_run: TestRun,
    pub job_template_uri: Sref,
    pub job_template_name: String,
}

impl TestRunDocument {
    pub fn new(mut test_run: TestRun, template: &JobTemplate) -> Self {
        strip_fields(&mut test_run.fields, TEST_RUN_ADDED_FIELDS);
        Self {
            test_run,
            job_template_uri: template.sref.clone(),
            job_template_name: template.name.clone(),
        }
    }

    pub fn id(&self) -> &Sref {
        &self.test_run.sref
    }
}

/// Page object as stored in the index
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageObjectDocument {
    #[serde(flatten)]
    pub page_object: PageObject,
    pub company: String,
    pub category: String,
    pub ran_at: String,
    pub job_template_uri: Sref,
    pub job_template_name: String,
    pub parent_url: Option<String>,
    pub parent_page_title: Option<String>,
}

impl PageObjectDocument {
    /// Builds the document from a page object and its parent test run
    ///
    /// Template fields are taken from the parent document, which already
    /// carries them.
    pub fn new(mut page_object: PageObject, parent: &TestRunDocument, enrichment: Enrichment) -> Self {
        strip_fields(&mut page_object.fields, PAGE_OBJECT_ADDED_FIELDS);
        Self {
            page_object,
            company: enrichment.company,
            category: enrichment.category,
            ran_at: parent.test_run.ran_at.clone(),
            job_template_uri: parent.job_template_uri.clone(),
            job_template_name: parent.job_template_name.clone(),
            parent_url: parent.test_run.url.clone(),
            parent_page_title: parent.test_run.page_title.clone(),
        }
    }

    pub fn id(&self) -> &Sref {
        &self.page_object.sref
    }
}

// Source-provided fields never shadow the ones the coupler adds.
fn strip_fields(fields: &mut Map<String, Value>, names: &[&str]) {
    for name in names {
        fields.remove(*name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> JobTemplate {
        JobTemplate {
            sref: Sref::from("jobTemplates/3"),
            name: "Homepage".to_string(),
            kind: "Single".to_string(),
        }
    }

    fn test_run() -> TestRun {
        serde_json::from_value(serde_json::json!({
            "sref": "testRuns/10",
            "ranAt": "2020-01-01T00:00:00+00:00",
            "url": "http://example.com/",
            "pageTitle": "Example Domain",
            "jobTemplateName": "stale",
        }))
        .unwrap()
    }

    fn page_object() -> PageObject {
        serde_json::from_value(serde_json::json!({
            "sref": "objects/99",
            "url": "http://example.com/x",
            "bytes": 512,
            "company": "from-source",
        }))
        .unwrap()
    }

    #[test]
    fn test_test_run_document_denormalizes_template() {
        let doc = TestRunDocument::new(test_run(), &template());
        assert_eq!(doc.id().as_str(), "testRuns/10");

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["jobTemplateUri"], "jobTemplates/3");
        assert_eq!(value["jobTemplateName"], "Homepage");
        assert_eq!(value["pageTitle"], "Example Domain");
    }

    #[test]
    fn test_page_object_document_copies_parent_fields() {
        let parent = TestRunDocument::new(test_run(), &template());
        let enrichment = Enrichment {
            company: "Acme".to_string(),
            category: "Retail".to_string(),
        };
        let doc = PageObjectDocument::new(page_object(), &parent, enrichment);
        assert_eq!(doc.id().as_str(), "objects/99");

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["company"], "Acme");
        assert_eq!(value["category"], "Retail");
        assert_eq!(value["ranAt"], "2020-01-01T00:00:00+00:00");
        assert_eq!(value["jobTemplateUri"], "jobTemplates/3");
        assert_eq!(value["jobTemplateName"], "Homepage");
        assert_eq!(value["parentUrl"], "http://example.com/");
        assert_eq!(value["parentPageTitle"], "Example Domain");
        assert_eq!(value["bytes"], 512);
    }

    #[test]
    fn test_page_object_document_defaults_to_unknown() {
        let parent = TestRunDocument::new(test_run(), &template());
        let doc = PageObjectDocument::new(page_object(), &parent, Enrichment::unknown());

        let value = serde_json::to_value(&doc).unwrap();
        assert_eq!(value["company"], "Unknown");
        assert_eq!(value["category"], "None");
    }
}
