//! Plain-text report.

use std::io::{self, Write};

use bytesize::ByteSize;

use crate::duplicates::{ScanSummary, SimilarFileSet};

/// Human-readable rendering of a [`SimilarFileSet`].
pub struct TextOutput<'a> {
    set: &'a SimilarFileSet,
    summary: &'a ScanSummary,
}

impl<'a> TextOutput<'a> {
    /// Wrap a result set and its summary.
    #[must_use]
    pub fn new(set: &'a SimilarFileSet, summary: &'a ScanSummary) -> Self {
        Self { set, summary }
    }

    /// Write one block per group, then a summary line.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        for (i, group) in self.set.iter().enumerate() {
            let last = group.key().last().map(ToString::to_string).unwrap_or_default();
            writeln!(
                writer,
                "Group {} ({} files, {} each, {} {}):",
                i + 1,
                group.len(),
                ByteSize::b(group.size()),
                self.set.tier(),
                abbreviate(&last)
            )?;
            for file in group.files() {
                writeln!(writer, "  {}", file.path().display())?;
            }
            writeln!(writer)?;
        }

        let s = self.summary;
        writeln!(
            writer,
            "{} files scanned ({}), {} duplicate groups at {} tier, {} redundant files, {} reclaimable ({:.1}%)",
            s.total_files,
            s.total_size_display(),
            s.duplicate_groups,
            self.set.tier(),
            s.duplicate_files,
            s.reclaimable_display(),
            s.wasted_percentage()
        )?;
        if s.failed_files > 0 || s.excluded_files > 0 || s.walk_errors > 0 {
            writeln!(
                writer,
                "{} files failed to hash, {} excluded, {} walk errors",
                s.failed_files, s.excluded_files, s.walk_errors
            )?;
        }
        if s.interrupted {
            writeln!(writer, "Scan interrupted; results are partial")?;
        }
        Ok(())
    }
}

/// Shorten a hex digest to 16 characters.
fn abbreviate(key: &str) -> &str {
    key.get(..16).unwrap_or(key)
}
