//! Enrichment service
//!
//! Attributes page objects to the third-party company serving them, using
//! the tag database. Successful lookups are cached for the lifetime of the
//! service instance; failures are not cached and are retried on next use.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex};

use pacoupler_client::ClientError;
use pacoupler_core::domain::{CompanyInfo, DomainTag, Enrichment, PageObject};
use thiserror::Error;
use tracing::debug;

use crate::repository::TagRepository;

/// Why a page object could not be enriched
///
/// Never fatal: the page object is indexed with default attribution.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("'{url}' has no network location")]
    InvalidUrl { url: String },

    #[error("tag database lookup failed: {0}")]
    Remote(#[from] ClientError),

    #[error("no company information for product '{product}' of '{company}'")]
    NoCompanyInfo { company: String, product: String },
}

/// Cached tag lookups
pub struct EnrichmentService {
    tags: Arc<dyn TagRepository>,
    domains: Mutex<HashMap<String, Vec<DomainTag>>>,
    companies: Mutex<HashMap<(String, String), Vec<CompanyInfo>>>,
}

impl EnrichmentService {
    /// Creates a service with an empty cache
    pub fn new(tags: Arc<dyn TagRepository>) -> Self {
        Self {
            tags,
            domains: Mutex::new(HashMap::new()),
            companies: Mutex::new(HashMap::new()),
        }
    }

    /// Companies and products serving `domain`
    pub async fn domain_info(&self, domain: &str) -> Result<Vec<DomainTag>, LookupError> {
        if let Some(hit) = cached(&self.domains, domain) {
            return Ok(hit);
        }
        let tags = self.tags.domain_tags(domain).await?;
        store(&self.domains, domain.to_string(), &tags);
        Ok(tags)
    }

    /// Name and category of a company's product
    pub async fn company_info(&self, company: &str, product: &str) -> Result<Vec<CompanyInfo>, LookupError> {
        let key = (company.to_string(), product.to_string());
        if let Some(hit) = cached(&self.companies, &key) {
            return Ok(hit);
        }
        let info = self.tags.company_info(company, product).await?;
        store(&self.companies, key, &info);
        Ok(info)
    }

    /// Resolves the attribution of a page object
    ///
    /// A domain the tag database does not know yields the default
    /// attribution. The first tag and the first company record win.
    pub async fn enrich(&self, object: &PageObject) -> Result<Enrichment, LookupError> {
        let domain = object
            .network_location()
            .ok_or_else(|| LookupError::InvalidUrl {
                url: object.url.clone().unwrap_or_default(),
            })?;

        let tags = self.domain_info(&domain).await?;
        let Some(tag) = tags.into_iter().next() else {
            debug!("No tags for domain {}", domain);
            return Ok(Enrichment::unknown());
        };

        let info = self.company_info(&tag.company, &tag.product).await?;
        info.into_iter()
            .next()
            .map(Enrichment::from)
            .ok_or(LookupError::NoCompanyInfo {
                company: tag.company,
                product: tag.product,
            })
    }
}

fn cached<K, Q, V>(cache: &Mutex<HashMap<K, V>>, key: &Q) -> Option<V>
where
    K: Eq + Hash + std::borrow::Borrow<Q>,
    Q: Eq + Hash + ?Sized,
    V: Clone,
{
    cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .get(key)
        .cloned()
}

fn store<K: Eq + Hash, V: Clone>(cache: &Mutex<HashMap<K, V>>, key: K, value: &V) {
    cache
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
        .insert(key, value.clone());
}
