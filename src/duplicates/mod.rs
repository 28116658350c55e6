//! Duplicate detection module.
//!
//! This module turns the per-tier hashes held by a
//! [`crate::catalog::FileCatalog`] into candidate-duplicate groups:
//! - Size tier: files of equal length
//! - Quick tier: equal length and equal leading-bytes hash
//! - Full tier: equal length, prefix and whole-content hash

pub mod groups;
pub mod summary;

pub use groups::{DuplicateGrouper, SimilarFileSet, SimilarGroup};
pub use summary::ScanSummary;
