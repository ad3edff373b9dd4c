//! Job template domain types

use serde::{Deserialize, Serialize};

use crate::types::Sref;

/// A recurring test definition in PA; parent of test runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobTemplate {
    pub sref: Sref,
    pub name: String,
    /// Template kind (e.g. `Single`, `Multi`, `Crawl`, `Scripted`)
    #[serde(rename = "type")]
    pub kind: String,
}

impl JobTemplate {
    /// Checks the template against an allow-list of kinds
    ///
    /// An empty allow-list permits every template.
    pub fn is_allowed(&self, allowed_kinds: &[String]) -> bool {
        allowed_kinds.is_empty() || allowed_kinds.iter().any(|kind| kind == &self.kind)
    }
}
