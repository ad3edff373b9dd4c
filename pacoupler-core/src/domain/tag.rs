//! Tag database domain types
//!
//! The tag database maps third-party domains to the companies and products
//! that serve them, and companies/products to a category.

use serde::{Deserialize, Serialize};

/// Company used when no tag information is available
pub const UNKNOWN_COMPANY: &str = "Unknown";

/// Category used when no tag information is available
pub const UNKNOWN_CATEGORY: &str = "None";

/// A company/product pair serving a domain
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainTag {
    pub company: String,
    pub product: String,
}

/// Descriptive information about a company product
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInfo {
    pub name: String,
    pub category: String,
}

/// Third-party attribution attached to a page object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enrichment {
    pub company: String,
    pub category: String,
}

impl Enrichment {
    pub fn unknown() -> Self {
        Self {
            company: UNKNOWN_COMPANY.to_string(),
            category: UNKNOWN_CATEGORY.to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.company == UNKNOWN_COMPANY && self.category == UNKNOWN_CATEGORY
    }
}

impl Default for Enrichment {
    fn default() -> Self {
        Self::unknown()
    }
}

impl From<CompanyInfo> for Enrichment {
    fn from(info: CompanyInfo) -> Self {
        Self {
            company: info.name,
            category: info.category,
        }
    }
}
