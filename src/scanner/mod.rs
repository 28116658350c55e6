//! Scanner module for directory traversal and tiered file hashing.
//!
//! This module provides functionality for:
//! - Parallel directory walking using jwalk
//! - Per-tier content fingerprints with BLAKE3
//!
//! # Architecture
//!
//! The scanner is divided into submodules:
//! - [`walker`]: Directory traversal and file discovery
//! - [`hasher`]: Size, quick and full hash computation for a single file
//!
//! # Example
//!
//! ```no_run
//! use tierdupe::scanner::{HashTier, Hasher, Walker, WalkerConfig};
//! use std::path::Path;
//!
//! let walker = Walker::new(Path::new("."), WalkerConfig::default());
//! let hasher = Hasher::new();
//! for path in walker.walk().filter_map(Result::ok) {
//!     let size = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
//!     match hasher.compute(&path, size, HashTier::Quick, &|| false) {
//!         Ok(value) => println!("{}: {}", path.display(), value),
//!         Err(e) => eprintln!("Warning: {}", e),
//!     }
//! }
//! ```

pub mod hasher;
pub mod walker;

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

// Re-export main types
pub use hasher::{hash_to_hex, hex_to_hash, Hash, Hasher, PREHASH_SIZE};
pub use walker::Walker;

/// Hash tiers, ordered from cheapest to most discriminating.
///
/// A later tier is only meaningful for files that agree at every earlier one.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum HashTier {
    /// File length in bytes, metadata only.
    Size,
    /// BLAKE3 of a bounded prefix of the file.
    Quick,
    /// BLAKE3 of the entire file content.
    #[default]
    Full,
}

impl HashTier {
    /// All tiers in computation order.
    pub const ALL: [HashTier; 3] = [HashTier::Size, HashTier::Quick, HashTier::Full];

    /// Position of this tier in [`HashTier::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The tier computed immediately before this one.
    #[must_use]
    pub fn previous(self) -> Option<HashTier> {
        match self {
            HashTier::Size => None,
            HashTier::Quick => Some(HashTier::Size),
            HashTier::Full => Some(HashTier::Quick),
        }
    }

    /// Tiers from `Size` up to and including this one.
    #[must_use]
    pub fn through(self) -> &'static [HashTier] {
        &Self::ALL[..=self.index()]
    }

    /// Short name used in logs and progress phases.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            HashTier::Size => "size",
            HashTier::Quick => "quick",
            HashTier::Full => "full",
        }
    }
}

impl fmt::Display for HashTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A computed fingerprint at some tier.
///
/// Values from different tiers never compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HashValue {
    /// Byte length (size tier).
    Size(u64),
    /// BLAKE3 digest (quick and full tiers).
    Digest(Hash),
}

impl fmt::Display for HashValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashValue::Size(size) => write!(f, "{}", size),
            HashValue::Digest(hash) => f.write_str(&hash_to_hex(hash)),
        }
    }
}

/// Configuration for directory walking.
///
/// Controls filtering, symlink handling, and other walk behavior.
#[derive(Debug, Clone, Default)]
pub struct WalkerConfig {
    /// Follow symbolic links during traversal.
    /// Warning: May cause infinite loops with symlink cycles.
    pub follow_symlinks: bool,

    /// Skip hidden files and directories (names starting with `.`).
    pub skip_hidden: bool,

    /// Minimum file size to include (in bytes).
    pub min_size: Option<u64>,

    /// Maximum file size to include (in bytes).
    pub max_size: Option<u64>,

    /// Glob patterns to ignore (gitignore-style).
    pub ignore_patterns: Vec<String>,
}

/// Errors that can occur during directory scanning.
#[derive(thiserror::Error, Debug)]
pub enum ScanError {
    /// Permission was denied when accessing a file or directory.
    #[error("Permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// The specified path was not found.
    #[error("Path not found: {0}")]
    NotFound(PathBuf),

    /// The specified path is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// An I/O error occurred while accessing a file.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Errors that can occur while hashing a single file.
///
/// Cloneable so a failure can be memoized on the descriptor.
#[derive(thiserror::Error, Debug, Clone)]
pub enum HashError {
    /// The file vanished or can no longer be opened.
    #[error("File unavailable: {0}")]
    FileUnavailable(PathBuf),

    /// Any other I/O error while reading the file.
    #[error("Hash computation failed for {path}: {source}")]
    ComputationFailure {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: Arc<std::io::Error>,
    },

    /// Hashing stopped by a cancellation request; never cached.
    #[error("Hashing interrupted: {0}")]
    Interrupted(PathBuf),
}

impl HashError {
    /// Classify an I/O error raised while hashing `path`.
    #[must_use]
    pub fn from_io(path: &std::path::Path, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound | std::io::ErrorKind::PermissionDenied => {
                HashError::FileUnavailable(path.to_path_buf())
            }
            _ => HashError::ComputationFailure {
                path: path.to_path_buf(),
                source: Arc::new(err),
            },
        }
    }

    /// Whether this error came from cancellation rather than the file.
    #[must_use]
    pub fn is_interrupted(&self) -> bool {
        matches!(self, HashError::Interrupted(_))
    }
}
