//! Watermark resolution
//!
//! Decides where an incremental sync starts. The index is the only record
//! of what was synced before, so the newest indexed test run wins, then the
//! configured `since`, then a full resync.

use std::sync::Arc;

use pacoupler_core::Watermark;
use tracing::{info, warn};

use crate::error::SyncError;
use crate::repository::IndexRepository;

pub struct WatermarkResolver {
    index: Arc<dyn IndexRepository>,
    configured_since: Option<Watermark>,
}

impl WatermarkResolver {
    pub fn new(index: Arc<dyn IndexRepository>, configured_since: Option<Watermark>) -> Self {
        Self {
            index,
            configured_since,
        }
    }

    /// Resolves the watermark for one cycle; `None` means sync everything
    pub async fn resolve(&self, force_full: bool) -> Result<Option<Watermark>, SyncError> {
        if force_full {
            info!("Fully indexing data from PA");
            return Ok(None);
        }

        let latest = self
            .index
            .latest_test_run_ran_at()
            .await
            .map_err(SyncError::Watermark)?;

        match latest {
            Some(raw) => match Watermark::parse(&raw) {
                Ok(watermark) => {
                    info!("Importing new data from PA since {}", watermark);
                    return Ok(Some(watermark));
                }
                Err(e) => warn!("Ignoring unreadable ranAt in the index: {}", e),
            },
            None => info!("No existing data found in the index"),
        }

        match self.configured_since {
            Some(since) => {
                info!("Importing data from PA since configured {}", since);
                Ok(Some(since))
            }
            None => {
                info!("Fully indexing data from PA");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryIndex;

    fn since(raw: &str) -> Option<Watermark> {
        Some(Watermark::parse_since(raw).unwrap())
    }

    #[tokio::test]
    async fn test_latest_indexed_run_wins() {
        let index = MemoryIndex::new()
            .with_test_run("testRuns/1", "2020-01-01T00:00:00+00:00")
            .with_test_run("testRuns/3", "2020-03-01T00:00:00+00:00")
            .with_test_run("testRuns/2", "2020-02-01T00:00:00+00:00");
        let resolver = WatermarkResolver::new(Arc::new(index), since("2017-01-30T00:00+0000"));

        let watermark = resolver.resolve(false).await.unwrap().unwrap();
        assert_eq!(watermark.to_string(), "2020-03-01T00:00:00Z");
    }

    #[tokio::test]
    async fn test_force_full_ignores_index_and_config() {
        let index = MemoryIndex::new().with_test_run("testRuns/1", "2020-01-01T00:00:00+00:00");
        let resolver = WatermarkResolver::new(Arc::new(index), since("2017-01-30T00:00+0000"));

        assert!(resolver.resolve(true).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_empty_index_falls_back_to_configured_since() {
        let resolver = WatermarkResolver::new(Arc::new(MemoryIndex::new()), since("2017-01-30T00:00+0000"));

        let watermark = resolver.resolve(false).await.unwrap().unwrap();
        assert_eq!(watermark.to_string(), "2017-01-30T00:00:00Z");
    }

    #[tokio::test]
    async fn test_empty_index_without_config_is_full_resync() {
        let resolver = WatermarkResolver::new(Arc::new(MemoryIndex::new()), None);

        assert!(resolver.resolve(false).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_unreadable_ran_at_falls_back() {
        let index = MemoryIndex::new().with_test_run("testRuns/1", "garbage");
        let resolver = WatermarkResolver::new(Arc::new(index), None);

        assert!(resolver.resolve(false).await.unwrap().is_none());
    }
}
