//! Repository layer
//!
//! Repositories are thin adapters over the HTTP clients. They expose the
//! narrow interfaces the services need, without any business logic.
//!
//! All repositories are trait-based to enable testing with in-memory fakes.

mod index;
#[cfg(test)]
pub mod memory;
mod source;
mod tags;

// Re-export traits
pub use index::IndexRepository;
pub use source::SourceRepository;
pub use tags::TagRepository;

// Re-export implementations
pub use index::ElasticsearchIndex;
