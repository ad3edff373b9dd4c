//! PA Coupler Core
//!
//! Core types shared by the Performance Analyser coupler crates.
//!
//! This crate contains:
//! - Domain types: entities read from the PA API and the tag database
//! - DTOs: the PA result envelope and the documents written to the index
//! - Shared types: resource references (`Sref`) and sync watermarks

pub mod domain;
pub mod dto;
pub mod types;

pub use types::{Sref, TimestampError, Watermark};
