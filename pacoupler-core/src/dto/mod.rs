//! Data Transfer Objects
//!
//! - `results`: the envelope the PA API wraps list responses in
//! - `document`: the denormalized documents written to the index

pub mod document;
pub mod results;

pub use document::{PageObjectDocument, TestRunDocument};
pub use results::ResultsPage;
