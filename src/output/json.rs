//! JSON output formatter.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "tier": "full",
//!   "groups": [
//!     {
//!       "key": ["1024", "af13...", "9c0e..."],
//!       "size": 1024,
//!       "wasted": 1024,
//!       "files": ["/data/a.bin", "/data/b.bin"]
//!     }
//!   ],
//!   "summary": {
//!     "total_files": 100,
//!     "duplicate_groups": 1,
//!     "reclaimable_space": 1024,
//!     "exit_code": 0,
//!     "exit_code_name": "TD000"
//!   }
//! }
//! ```
//!
//! Key entries are decimal for the size tier and lowercase hex digests for
//! the quick and full tiers.

use std::io::Write;

use serde::Serialize;

use crate::duplicates::{ScanSummary, SimilarFileSet, SimilarGroup};
use crate::error::ExitCode;
use crate::scanner::HashTier;

/// One group in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonGroup {
    /// Shared hashes from the size tier upward
    pub key: Vec<String>,
    /// Size of each member in bytes
    pub size: u64,
    /// Bytes held by redundant copies
    pub wasted: u64,
    /// Member paths in discovery order
    pub files: Vec<String>,
}

impl JsonGroup {
    fn from_group(group: &SimilarGroup) -> Self {
        Self {
            key: group.key().iter().map(ToString::to_string).collect(),
            size: group.size(),
            wasted: group.wasted_space(),
            files: group
                .files()
                .iter()
                .map(|f| f.path().to_string_lossy().into_owned())
                .collect(),
        }
    }
}

/// Summary statistics in JSON form.
#[derive(Debug, Clone, Serialize)]
pub struct JsonSummary {
    /// Files in the catalog
    pub total_files: usize,
    /// Combined size in bytes
    pub total_size: u64,
    /// Groups with 2+ members
    pub duplicate_groups: usize,
    /// Redundant copies
    pub duplicate_files: usize,
    /// Bytes reclaimable by keeping one file per group
    pub reclaimable_space: u64,
    /// Files whose hashing failed
    pub failed_files: usize,
    /// Files left out of the grouping
    pub excluded_files: usize,
    /// Walk errors
    pub walk_errors: usize,
    /// Walk phase in milliseconds
    pub walk_duration_ms: u64,
    /// Hashing after the walk, in milliseconds
    pub hash_duration_ms: u64,
    /// Whether the scan was interrupted
    pub interrupted: bool,
    /// Numeric exit code
    pub exit_code: i32,
    /// Exit code name, e.g. `"TD000"`
    pub exit_code_name: String,
}

impl JsonSummary {
    fn from_summary(summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            total_files: summary.total_files,
            total_size: summary.total_size,
            duplicate_groups: summary.duplicate_groups,
            duplicate_files: summary.duplicate_files,
            reclaimable_space: summary.reclaimable_space,
            failed_files: summary.failed_files,
            excluded_files: summary.excluded_files,
            walk_errors: summary.walk_errors,
            walk_duration_ms: summary.walk_duration.as_millis() as u64,
            hash_duration_ms: summary.hash_duration.as_millis() as u64,
            interrupted: summary.interrupted,
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix().to_string(),
        }
    }
}

/// Complete JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput {
    /// Tier the groups were built at
    pub tier: HashTier,
    /// Groups in discovery order
    pub groups: Vec<JsonGroup>,
    /// Scan statistics
    pub summary: JsonSummary,
}

impl JsonOutput {
    /// Build the document for `set`.
    #[must_use]
    pub fn new(set: &SimilarFileSet, summary: &ScanSummary, exit_code: ExitCode) -> Self {
        Self {
            tier: set.tier(),
            groups: set.iter().map(JsonGroup::from_group).collect(),
            summary: JsonSummary::from_summary(summary, exit_code),
        }
    }

    /// Serialize to compact JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Serialize to pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the document followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W, pretty: bool) -> Result<(), JsonOutputError> {
        let json = if pretty {
            self.to_json_pretty()?
        } else {
            self.to_json()?
        };
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Errors that can occur during JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    /// JSON serialization error
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O error during writing
    #[error("I/O error during JSON generation: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FileDescriptor;
    use crate::duplicates::DuplicateGrouper;
    use crate::scanner::HashValue;
    use std::path::PathBuf;
    use std::sync::Arc;

    fn sized(name: &str, size: u64) -> Arc<FileDescriptor> {
        let d = FileDescriptor::new(PathBuf::from(name), size);
        d.record(HashTier::Size, Ok(HashValue::Size(size)));
        Arc::new(d)
    }

    #[test]
    fn test_json_document_shape() {
        let files = vec![sized("/x/a", 7), sized("/x/b", 7), sized("/x/c", 9)];
        let set = DuplicateGrouper::default().group_descriptors(&files, HashTier::Size);
        let summary = ScanSummary {
            total_files: 3,
            duplicate_groups: 1,
            ..ScanSummary::default()
        };

        let output = JsonOutput::new(&set, &summary, ExitCode::Success);
        let value: serde_json::Value = serde_json::from_str(&output.to_json().unwrap()).unwrap();

        assert_eq!(value["tier"], "size");
        assert_eq!(value["groups"][0]["key"][0], "7");
        assert_eq!(value["groups"][0]["wasted"], 7);
        assert_eq!(value["groups"][0]["files"][1], "/x/b");
        assert_eq!(value["summary"]["exit_code_name"], "TD000");
        assert_eq!(value["summary"]["total_files"], 3);
    }

    #[test]
    fn test_write_to_appends_newline() {
        let set = DuplicateGrouper::default().group_descriptors(&[], HashTier::Full);
        let output = JsonOutput::new(&set, &ScanSummary::default(), ExitCode::NoDuplicates);

        let mut buf = Vec::new();
        output.write_to(&mut buf, true).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.ends_with("}\n"));
        assert!(text.contains("\"groups\": []"));
    }
}
