//! Summary statistics for one scan.

use std::time::Duration;

use bytesize::ByteSize;

use crate::scanner::HashTier;

/// Counts and timings reported after a scan.
#[derive(Debug, Clone, Default)]
pub struct ScanSummary {
    /// Tier the results were grouped by
    pub tier: HashTier,
    /// Files added to the catalog
    pub total_files: usize,
    /// Combined size of cataloged files in bytes
    pub total_size: u64,
    /// Groups with two or more members
    pub duplicate_groups: usize,
    /// Extra copies (members minus one per group)
    pub duplicate_files: usize,
    /// Bytes freed by keeping one file per group
    pub reclaimable_space: u64,
    /// Files whose hashing failed at some tier
    pub failed_files: usize,
    /// Files left out of the grouping (failed or pending)
    pub excluded_files: usize,
    /// Paths the walker could not read
    pub walk_errors: usize,
    /// Time spent discovering files
    pub walk_duration: Duration,
    /// Time from the end of the walk until the tier was complete
    pub hash_duration: Duration,
    /// Whether Ctrl+C stopped the scan
    pub interrupted: bool,
}

impl ScanSummary {
    /// Percentage of the scanned bytes taken by redundant copies.
    #[must_use]
    pub fn wasted_percentage(&self) -> f64 {
        if self.total_size == 0 {
            0.0
        } else {
            (self.reclaimable_space as f64 / self.total_size as f64) * 100.0
        }
    }

    /// Reclaimable space in IEC units, e.g. `"1.5 MiB"`.
    #[must_use]
    pub fn reclaimable_display(&self) -> String {
        ByteSize::b(self.reclaimable_space).to_string()
    }

    /// Total size in IEC units.
    #[must_use]
    pub fn total_size_display(&self) -> String {
        ByteSize::b(self.total_size).to_string()
    }

    /// Whether anything went wrong short of a fatal error.
    #[must_use]
    pub fn has_problems(&self) -> bool {
        self.failed_files > 0 || self.walk_errors > 0
    }
}
