//! BLAKE3 file hasher with streaming and memory-mapped support.
//!
//! # Overview
//!
//! [`Hasher`] computes the fingerprint of one file at one [`HashTier`]:
//!
//! - `Size`: confirms the file still exists and returns the discovery size
//! - `Quick`: BLAKE3 of the first [`PREHASH_SIZE`] bytes (configurable)
//! - `Full`: BLAKE3 of the whole file, streamed or memory-mapped
//!
//! Hashing never mutates the filesystem. Cancellation is polled between
//! chunks, and an interrupted read returns [`HashError::Interrupted`]
//! instead of a partial digest.
//!
//! # Example
//!
//! ```no_run
//! use tierdupe::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new().with_quick_sample_size(8192);
//! let quick = hasher.prehash(Path::new("photo.jpg")).unwrap();
//! let full = hasher.full_hash(Path::new("photo.jpg")).unwrap();
//! println!("{} / {}", tierdupe::scanner::hash_to_hex(&quick), tierdupe::scanner::hash_to_hex(&full));
//! ```

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use super::{HashError, HashTier, HashValue};

/// A 32-byte BLAKE3 digest.
pub type Hash = [u8; 32];

/// Default number of leading bytes covered by the quick tier.
pub const PREHASH_SIZE: usize = 4096;

/// Read buffer used when streaming a file.
const BUFFER_SIZE: usize = 64 * 1024;

/// Files at or above this size are memory-mapped for full hashing.
pub const DEFAULT_MMAP_THRESHOLD: u64 = 64 * 1024 * 1024;

/// Chunk fed to the parallel BLAKE3 updater between cancellation checks.
const MMAP_CHUNK: usize = 16 * 1024 * 1024;

/// Tiered file hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    quick_sample_size: usize,
    use_mmap: bool,
    mmap_threshold: u64,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher with the default quick sample size and mmap enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            quick_sample_size: PREHASH_SIZE,
            use_mmap: true,
            mmap_threshold: DEFAULT_MMAP_THRESHOLD,
        }
    }

    /// Set how many leading bytes the quick tier covers (minimum 1).
    #[must_use]
    pub fn with_quick_sample_size(mut self, bytes: usize) -> Self {
        self.quick_sample_size = bytes.max(1);
        self
    }

    /// Enable or disable memory-mapped full hashing.
    #[must_use]
    pub fn with_mmap(mut self, enabled: bool) -> Self {
        self.use_mmap = enabled;
        self
    }

    /// Minimum file size for memory-mapped full hashing.
    #[must_use]
    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }

    /// Number of leading bytes the quick tier covers.
    #[must_use]
    pub fn quick_sample_size(&self) -> usize {
        self.quick_sample_size
    }

    /// Whether a quick digest of a file this size already covers all of it.
    #[must_use]
    pub fn quick_covers_whole_file(&self, size: u64) -> bool {
        size <= self.quick_sample_size as u64
    }

    /// Compute the fingerprint of `path` at `tier`.
    ///
    /// `size` is the length recorded at discovery; it is the size tier's value.
    /// `cancelled` is polled between read chunks.
    ///
    /// # Errors
    ///
    /// - [`HashError::FileUnavailable`] if the file is gone or unreadable
    /// - [`HashError::ComputationFailure`] for any other I/O error
    /// - [`HashError::Interrupted`] if `cancelled` returned true mid-file
    pub fn compute(
        &self,
        path: &Path,
        size: u64,
        tier: HashTier,
        cancelled: &dyn Fn() -> bool,
    ) -> Result<HashValue, HashError> {
        match tier {
            HashTier::Size => {
                std::fs::metadata(path).map_err(|e| HashError::from_io(path, e))?;
                Ok(HashValue::Size(size))
            }
            HashTier::Quick => self.prehash(path).map(HashValue::Digest),
            HashTier::Full => self
                .full_hash_cancellable(path, cancelled)
                .map(HashValue::Digest),
        }
    }

    /// Hash the first `quick_sample_size` bytes of a file.
    ///
    /// Files shorter than the sample are hashed whole.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or read.
    pub fn prehash(&self, path: &Path) -> Result<Hash, HashError> {
        let file = open(path)?;
        let mut buf = Vec::with_capacity(self.quick_sample_size);
        file.take(self.quick_sample_size as u64)
            .read_to_end(&mut buf)
            .map_err(|e| HashError::from_io(path, e))?;
        Ok(*blake3::hash(&buf).as_bytes())
    }

    /// Hash the entire content of a file.
    ///
    /// # Errors
    ///
    /// Returns a [`HashError`] if the file cannot be opened or read.
    pub fn full_hash(&self, path: &Path) -> Result<Hash, HashError> {
        self.full_hash_cancellable(path, &|| false)
    }

    /// Hash the entire content of a file, polling `cancelled` between chunks.
    ///
    /// # Errors
    ///
    /// Returns [`HashError::Interrupted`] when cancelled; the partial state
    /// is dropped.
    pub fn full_hash_cancellable(
        &self,
        path: &Path,
        cancelled: &dyn Fn() -> bool,
    ) -> Result<Hash, HashError> {
        let file = open(path)?;
        let len = file
            .metadata()
            .map_err(|e| HashError::from_io(path, e))?
            .len();

        if self.use_mmap && len > 0 && len >= self.mmap_threshold {
            match self.mmap_hash(path, &file, cancelled) {
                Ok(hash) => return Ok(hash),
                Err(HashError::Interrupted(p)) => return Err(HashError::Interrupted(p)),
                Err(e) => {
                    log::debug!(
                        "mmap hashing failed for {}, falling back to streaming: {}",
                        path.display(),
                        e
                    );
                }
            }
        }

        stream_hash(path, file, cancelled)
    }

    fn mmap_hash(
        &self,
        path: &Path,
        file: &File,
        cancelled: &dyn Fn() -> bool,
    ) -> Result<Hash, HashError> {
        // SAFETY: the mapping is read-only and dropped before returning. A
        // concurrent truncation by another process can fault, which is the
        // documented memmap2 caveat for read-only scanning tools.
        let map = unsafe { memmap2::Mmap::map(file) }.map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = blake3::Hasher::new();
        for chunk in map.chunks(MMAP_CHUNK) {
            if cancelled() {
                return Err(HashError::Interrupted(path.to_path_buf()));
            }
            hasher.update_rayon(chunk);
        }
        Ok(*hasher.finalize().as_bytes())
    }
}

fn open(path: &Path) -> Result<File, HashError> {
    File::open(path).map_err(|e| HashError::from_io(path, e))
}

fn stream_hash(
    path: &Path,
    mut file: File,
    cancelled: &dyn Fn() -> bool,
) -> Result<Hash, HashError> {
    let mut hasher = blake3::Hasher::new();
    let mut buf = vec![0u8; BUFFER_SIZE];
    loop {
        if cancelled() {
            return Err(HashError::Interrupted(path.to_path_buf()));
        }
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(HashError::from_io(path, e)),
        };
        hasher.update(&buf[..n]);
    }
    Ok(*hasher.finalize().as_bytes())
}

/// Render a digest as 64 lowercase hex characters.
#[must_use]
pub fn hash_to_hex(hash: &Hash) -> String {
    blake3::Hash::from(*hash).to_hex().to_string()
}

/// Parse 64 hex characters back into a digest.
#[must_use]
pub fn hex_to_hash(hex: &str) -> Option<Hash> {
    blake3::Hash::from_hex(hex).ok().map(|h| *h.as_bytes())
}
