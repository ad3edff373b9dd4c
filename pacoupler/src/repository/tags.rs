//! Tag repository
//!
//! Uncached lookups against the tag database. Caching lives in the
//! enrichment service.

use async_trait::async_trait;
use pacoupler_client::{Result, TagDbClient};
use pacoupler_core::domain::{CompanyInfo, DomainTag};

/// Repository trait for third-party tag lookups
#[async_trait]
pub trait TagRepository: Send + Sync {
    /// Companies and products serving a network location
    async fn domain_tags(&self, domain: &str) -> Result<Vec<DomainTag>>;

    /// Name and category of a company's product
    async fn company_info(&self, company: &str, product: &str) -> Result<Vec<CompanyInfo>>;
}

#[async_trait]
impl TagRepository for TagDbClient {
    async fn domain_tags(&self, domain: &str) -> Result<Vec<DomainTag>> {
        TagDbClient::domain_tags(self, domain).await
    }

    async fn company_info(&self, company: &str, product: &str) -> Result<Vec<CompanyInfo>> {
        TagDbClient::company_info(self, company, product).await
    }
}
