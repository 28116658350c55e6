//! A discovered file and its memoized per-tier hashes.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::scanner::{HashError, HashTier, HashValue};

/// Hash state of one descriptor at one tier.
#[derive(Debug, Clone)]
pub enum TierState {
    /// Not attempted yet, or skipped by tier gating.
    NotComputed,
    /// Hash computed; never changes afterwards.
    Computed(HashValue),
    /// Hashing failed; the file is excluded from this and later tiers.
    Failed(HashError),
}

impl TierState {
    /// The computed value, if any.
    #[must_use]
    pub fn value(&self) -> Option<HashValue> {
        match self {
            TierState::Computed(v) => Some(*v),
            _ => None,
        }
    }

    /// Whether this tier has a final outcome (value or failure).
    #[must_use]
    pub fn is_settled(&self) -> bool {
        !matches!(self, TierState::NotComputed)
    }
}

/// One regular file found under the scan root.
///
/// Path and size are fixed at discovery. Each tier slot
/// is written at most once; later writes are ignored and the first outcome
/// is returned, so concurrent writers cannot disagree.
#[derive(Debug)]
pub struct FileDescriptor {
    path: PathBuf,
    size: u64,
    tiers: [OnceLock<Result<HashValue, HashError>>; 3],
}

impl FileDescriptor {
    /// Create a descriptor with every tier not computed.
    #[must_use]
    pub fn new(path: PathBuf, size: u64) -> Self {
        Self {
            path,
            size,
            tiers: [OnceLock::new(), OnceLock::new(), OnceLock::new()],
        }
    }

    /// Absolute path of the file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Size in bytes when discovered.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Current state at `tier`.
    #[must_use]
    pub fn state(&self, tier: HashTier) -> TierState {
        match self.tiers[tier.index()].get() {
            None => TierState::NotComputed,
            Some(Ok(v)) => TierState::Computed(*v),
            Some(Err(e)) => TierState::Failed(e.clone()),
        }
    }

    /// Computed hash at `tier`, if any.
    #[must_use]
    pub fn hash(&self, tier: HashTier) -> Option<HashValue> {
        self.tiers[tier.index()].get().and_then(|r| r.as_ref().ok().copied())
    }

    /// Whether any tier recorded a failure.
    #[must_use]
    pub fn has_failed(&self) -> bool {
        self.tiers.iter().any(|t| matches!(t.get(), Some(Err(_))))
    }

    /// Record the outcome of hashing at `tier` and return the stored state.
    ///
    /// Interrupted results are discarded and leave the tier not computed.
    pub fn record(&self, tier: HashTier, outcome: Result<HashValue, HashError>) -> TierState {
        if matches!(outcome, Err(ref e) if e.is_interrupted()) {
            return self.state(tier);
        }
        let _ = self.tiers[tier.index()].set(outcome);
        self.state(tier)
    }

    /// Return the cached state at `tier`, computing it with `compute` if unset.
    ///
    /// A second call never invokes `compute`.
    pub fn get_or_compute<F>(&self, tier: HashTier, compute: F) -> TierState
    where
        F: FnOnce() -> Result<HashValue, HashError>,
    {
        if self.tiers[tier.index()].get().is_some() {
            return self.state(tier);
        }
        self.record(tier, compute())
    }

    /// Hashes at every tier from `Size` through `tier`.
    ///
    /// Returns `None` unless all of them are computed.
    #[must_use]
    pub fn key_through(&self, tier: HashTier) -> Option<Vec<HashValue>> {
        tier.through().iter().map(|&t| self.hash(t)).collect()
    }

    /// Longest run of computed hashes starting at `Size`, capped at `tier`.
    #[must_use]
    pub fn computed_prefix(&self, tier: HashTier) -> Vec<HashValue> {
        tier.through().iter().map_while(|&t| self.hash(t)).collect()
    }
}
