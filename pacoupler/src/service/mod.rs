//! Service layer
//!
//! Services hold the coupler's business logic. They orchestrate the
//! repositories to resolve the sync watermark, enrich page objects and walk
//! the PA hierarchy into the index.

mod enrichment;
mod sync;
mod watermark;

pub use enrichment::EnrichmentService;
pub use sync::{SyncPipeline, SyncReport};
pub use watermark::WatermarkResolver;
