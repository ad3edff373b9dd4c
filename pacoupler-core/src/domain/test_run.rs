//! Test run domain types

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::Sref;

/// One execution of a job template; parent of page objects
///
/// Only the fields the coupler reads are typed, everything else the PA API
/// returns is carried through to the index untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRun {
    pub sref: Sref,
    /// ISO-8601 timestamp with UTC offset, as returned by PA
    pub ran_at: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub page_title: Option<String>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
