//! Core domain types
//!
//! Entities read from the Performance Analyser API (job templates, test runs,
//! page objects) and from the third-party tag database.

pub mod job_template;
pub mod page_object;
pub mod tag;
pub mod test_run;

pub use job_template::JobTemplate;
pub use page_object::PageObject;
pub use tag::{CompanyInfo, DomainTag, Enrichment};
pub use test_run::TestRun;
