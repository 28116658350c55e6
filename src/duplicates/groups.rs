//! Partitioning a catalog into duplicate-candidate groups.
//!
//! # Overview
//!
//! [`DuplicateGrouper`] reads whatever hashes a [`FileCatalog`] has already
//! computed and partitions its files by their key through a tier: the tuple
//! of hashes at `Size` and every tier up to the requested one. It never
//! triggers hashing; callers that need a complete answer wait for the tier
//! first.
//!
//! The result is a [`SimilarFileSet`] snapshot. By default only groups with
//! two or more members are kept. With singletons included, the set also
//! holds one single-member group per file that is known to be unique, either
//! because its key at the tier is unique or because it was gated out at an
//! earlier tier by a unique key there.
//!
//! Files whose hashing failed, or whose hashes are still pending, are left
//! out and counted by [`SimilarFileSet::excluded`].
//!
//! # Example
//!
//! ```no_run
//! use tierdupe::catalog::FileCatalog;
//! use tierdupe::duplicates::DuplicateGrouper;
//! use tierdupe::scanner::HashTier;
//!
//! let catalog = FileCatalog::new(".").unwrap();
//! catalog.compute_tier(HashTier::Size);
//!
//! let set = DuplicateGrouper::default().group(&catalog, HashTier::Size);
//! for group in set.iter() {
//!     println!("{} files of {} bytes", group.len(), group.size());
//! }
//! ```

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::{FileCatalog, FileDescriptor};
use crate::scanner::{HashTier, HashValue};

/// Files sharing one key through a tier.
#[derive(Debug, Clone)]
pub struct SimilarGroup {
    key: Vec<HashValue>,
    files: Vec<Arc<FileDescriptor>>,
}

impl SimilarGroup {
    /// Hashes shared by every member, from `Size` upward.
    ///
    /// For a singleton gated out early this is shorter than the tier asked for.
    #[must_use]
    pub fn key(&self) -> &[HashValue] {
        &self.key
    }

    /// Members in catalog insertion order.
    #[must_use]
    pub fn files(&self) -> &[Arc<FileDescriptor>] {
        &self.files
    }

    /// Number of files in this group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Whether the group has 2+ files.
    #[must_use]
    pub fn has_duplicates(&self) -> bool {
        self.files.len() > 1
    }

    /// Size of each member in bytes.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.files.first().map_or(0, |f| f.size())
    }

    /// Total size of all files in this group.
    #[must_use]
    pub fn total_size(&self) -> u64 {
        self.files.iter().map(|f| f.size()).sum()
    }

    /// Total wasted space (all copies minus one).
    #[must_use]
    pub fn wasted_space(&self) -> u64 {
        self.size() * self.files.len().saturating_sub(1) as u64
    }

    /// Get just the paths of files in this group.
    #[must_use]
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.iter().map(|f| f.path().to_path_buf()).collect()
    }
}

/// Grouping snapshot for one tier.
#[derive(Debug, Clone)]
pub struct SimilarFileSet {
    tier: HashTier,
    groups: Vec<SimilarGroup>,
    excluded: usize,
}

impl SimilarFileSet {
    /// Tier this set was built for.
    #[must_use]
    pub fn tier(&self) -> HashTier {
        self.tier
    }

    /// Groups ordered by the insertion index of their first member.
    #[must_use]
    pub fn groups(&self) -> &[SimilarGroup] {
        &self.groups
    }

    /// Iterate over groups.
    pub fn iter(&self) -> std::slice::Iter<'_, SimilarGroup> {
        self.groups.iter()
    }

    /// Look up the group with exactly this key.
    #[must_use]
    pub fn get(&self, key: &[HashValue]) -> Option<&SimilarGroup> {
        self.groups.iter().find(|g| g.key == key)
    }

    /// Number of groups.
    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    /// Whether there are no groups.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Files left out because they failed or are still pending.
    #[must_use]
    pub fn excluded(&self) -> usize {
        self.excluded
    }

    /// Groups with 2+ members.
    pub fn duplicate_groups(&self) -> impl Iterator<Item = &SimilarGroup> {
        self.groups.iter().filter(|g| g.has_duplicates())
    }

    /// Extra copies across all groups (members minus one per group).
    #[must_use]
    pub fn duplicate_files(&self) -> usize {
        self.groups.iter().map(|g| g.len().saturating_sub(1)).sum()
    }

    /// Bytes reclaimable by keeping one file per group.
    #[must_use]
    pub fn reclaimable_bytes(&self) -> u64 {
        self.groups.iter().map(SimilarGroup::wasted_space).sum()
    }
}

impl<'a> IntoIterator for &'a SimilarFileSet {
    type Item = &'a SimilarGroup;
    type IntoIter = std::slice::Iter<'a, SimilarGroup>;

    fn into_iter(self) -> Self::IntoIter {
        self.groups.iter()
    }
}

/// Builds [`SimilarFileSet`]s from a catalog.
#[derive(Debug, Clone, Copy, Default)]
pub struct DuplicateGrouper {
    include_singletons: bool,
}

impl DuplicateGrouper {
    /// Create a grouper; singletons are dropped unless `include_singletons`.
    #[must_use]
    pub fn new(include_singletons: bool) -> Self {
        Self { include_singletons }
    }

    /// Group the catalog's current files by their key through `tier`.
    #[must_use]
    pub fn group(&self, catalog: &FileCatalog, tier: HashTier) -> SimilarFileSet {
        self.group_descriptors(&catalog.descriptors(), tier)
    }

    /// Group `files` (in insertion order) by their key through `tier`.
    #[must_use]
    pub fn group_descriptors(
        &self,
        files: &[Arc<FileDescriptor>],
        tier: HashTier,
    ) -> SimilarFileSet {
        let prefixes: Vec<Vec<HashValue>> = files.iter().map(|f| f.computed_prefix(tier)).collect();
        let depth = tier.index() + 1;

        // How many files share each key prefix, at every length.
        let mut prefix_counts: HashMap<&[HashValue], usize> = HashMap::new();
        for prefix in &prefixes {
            for len in 1..=prefix.len() {
                *prefix_counts.entry(&prefix[..len]).or_default() += 1;
            }
        }

        let mut groups: Vec<SimilarGroup> = Vec::new();
        let mut index: HashMap<&[HashValue], usize> = HashMap::new();
        let mut excluded = 0;

        for (file, prefix) in files.iter().zip(&prefixes) {
            if prefix.len() == depth {
                let slot = *index.entry(prefix.as_slice()).or_insert_with(|| {
                    groups.push(SimilarGroup {
                        key: prefix.clone(),
                        files: Vec::new(),
                    });
                    groups.len() - 1
                });
                groups[slot].files.push(Arc::clone(file));
            } else if prefix.is_empty() || file.has_failed() {
                excluded += 1;
            } else if prefix_counts.get(prefix.as_slice()).copied() == Some(1) {
                // Gated out by a unique key at an earlier tier.
                if self.include_singletons {
                    groups.push(SimilarGroup {
                        key: prefix.clone(),
                        files: vec![Arc::clone(file)],
                    });
                }
            } else {
                excluded += 1;
            }
        }

        if !self.include_singletons {
            groups.retain(SimilarGroup::has_duplicates);
        }

        log::debug!(
            "Grouped {} files at {} tier into {} groups ({} excluded)",
            files.len(),
            tier,
            groups.len(),
            excluded
        );

        SimilarFileSet {
            tier,
            groups,
            excluded,
        }
    }
}
