//! File catalog and tiered hash orchestration.
//!
//! # Overview
//!
//! A [`FileCatalog`] owns every [`FileDescriptor`] discovered under one scan
//! root, plus one "all hashes done" flag per [`HashTier`]. It drives tier
//! computation over the whole set and is the handle consumers use to start
//! background hashing, wait for a tier, and request groupings.
//!
//! The catalog is a cheap [`Clone`] handle over shared state, so discovery
//! on the caller's thread and hashing on the background worker can run at
//! the same time. Adding a file clears every tier-complete flag; a tier is
//! only marked complete by a pass that saw no concurrent additions.
//!
//! ## Tier gating
//!
//! A file is hashed at `Quick` or `Full` only if its hashes at every earlier
//! tier are shared by at least one other file. Files of a unique size never
//! get read at all.
//!
//! # Example
//!
//! ```no_run
//! use tierdupe::catalog::FileCatalog;
//! use tierdupe::scanner::HashTier;
//! use std::time::Duration;
//!
//! let catalog = FileCatalog::new("/data/photos").unwrap();
//! catalog.add_file("/data/photos/a.jpg").unwrap();
//! catalog.add_file("/data/photos/b.jpg").unwrap();
//!
//! catalog.start_background_hashing().unwrap();
//! if catalog.wait_for_tier(HashTier::Full, Duration::from_secs(60)) {
//!     for group in catalog.group(HashTier::Full, false).iter() {
//!         println!("{} copies", group.len());
//!     }
//! }
//! ```

pub mod descriptor;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use rayon::prelude::*;

use crate::duplicates::{DuplicateGrouper, SimilarFileSet};
use crate::progress::ProgressCallback;
use crate::scanner::{HashError, HashTier, HashValue, Hasher, PREHASH_SIZE};
use crate::scheduler::{BackgroundHashScheduler, SchedulerError};

pub use descriptor::{FileDescriptor, TierState};

/// Errors surfaced by catalog operations.
#[derive(thiserror::Error, Debug)]
pub enum CatalogError {
    /// The scan root does not exist or is not a directory.
    #[error("Invalid scan root: {0}")]
    InvalidRoot(PathBuf),

    /// The path does not resolve to an existing regular file.
    #[error("Not a file: {0}")]
    NotAFile(PathBuf),

    /// The path is already in the catalog.
    #[error("Already cataloged: {0}")]
    AlreadyCataloged(PathBuf),
}

/// Configuration for a catalog's hashing.
#[derive(Clone)]
pub struct CatalogConfig {
    /// Worker threads used inside one tier pass.
    pub io_threads: usize,
    /// Leading bytes covered by the quick tier.
    pub quick_sample_size: usize,
    /// Minimum size for memory-mapped full hashing.
    pub mmap_threshold: u64,
    /// Optional shutdown flag for graceful termination.
    pub shutdown_flag: Option<Arc<AtomicBool>>,
    /// Optional progress callback.
    pub progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for CatalogConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogConfig")
            .field("io_threads", &self.io_threads)
            .field("quick_sample_size", &self.quick_sample_size)
            .field("mmap_threshold", &self.mmap_threshold)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            io_threads: 4,
            quick_sample_size: PREHASH_SIZE,
            mmap_threshold: crate::scanner::hasher::DEFAULT_MMAP_THRESHOLD,
            shutdown_flag: None,
            progress_callback: None,
        }
    }
}

impl CatalogConfig {
    /// Set the per-tier thread count (minimum 1).
    #[must_use]
    pub fn with_io_threads(mut self, threads: usize) -> Self {
        self.io_threads = threads.max(1);
        self
    }

    /// Set the quick tier sample size (minimum 1).
    #[must_use]
    pub fn with_quick_sample_size(mut self, bytes: usize) -> Self {
        self.quick_sample_size = bytes.max(1);
        self
    }

    /// Set the memory-map threshold for full hashing.
    #[must_use]
    pub fn with_mmap_threshold(mut self, bytes: u64) -> Self {
        self.mmap_threshold = bytes;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }
}

/// Statistics from one `compute_tier` call.
#[derive(Debug, Clone, Default)]
pub struct TierStats {
    /// Tier that was computed
    pub tier: HashTier,
    /// Files in the catalog during the last pass
    pub input_files: usize,
    /// Files newly hashed by this call
    pub hashed_files: usize,
    /// Files left unhashed by gating or an earlier failure
    pub skipped_files: usize,
    /// Files whose hashing failed
    pub failed_files: usize,
    /// Per-file errors, in no particular order
    pub errors: Vec<HashError>,
    /// Whether cancellation stopped the tier before completion
    pub interrupted: bool,
}

impl TierStats {
    fn new(tier: HashTier) -> Self {
        Self {
            tier,
            ..Default::default()
        }
    }

    fn absorb(&mut self, other: TierStats) {
        self.failed_files += other.failed_files;
        self.errors.extend(other.errors);
        self.interrupted |= other.interrupted;
    }
}

#[derive(Debug, Default)]
struct CatalogState {
    files: Vec<Arc<FileDescriptor>>,
    paths: HashSet<PathBuf>,
    complete: [bool; 3],
    /// Bumped by `reset` so in-flight passes never mark a fresh catalog.
    epoch: u64,
}

struct Shared {
    root: PathBuf,
    config: CatalogConfig,
    hasher: Hasher,
    pool: Option<rayon::ThreadPool>,
    state: Mutex<CatalogState>,
    tier_done: Condvar,
    scheduler: BackgroundHashScheduler,
}

enum PassOutcome {
    Hashed,
    Failed(HashError),
    Interrupted,
}

/// The set of files for one scan root.
#[derive(Clone)]
pub struct FileCatalog {
    shared: Arc<Shared>,
}

impl std::fmt::Debug for FileCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileCatalog")
            .field("root", &self.shared.root)
            .field("files", &self.len())
            .field("config", &self.shared.config)
            .finish()
    }
}

impl FileCatalog {
    /// Create an empty catalog for `root` with default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidRoot`] if `root` is not a directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::with_config(root, CatalogConfig::default())
    }

    /// Create an empty catalog for `root`.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogError::InvalidRoot`] if `root` is not a directory.
    pub fn with_config(root: impl AsRef<Path>, config: CatalogConfig) -> Result<Self, CatalogError> {
        let root = root.as_ref();
        let root = match std::fs::canonicalize(root) {
            Ok(p) if p.is_dir() => p,
            _ => return Err(CatalogError::InvalidRoot(root.to_path_buf())),
        };

        let pool = match rayon::ThreadPoolBuilder::new()
            .num_threads(config.io_threads.max(1))
            .thread_name(|i| format!("tierdupe-io-{i}"))
            .build()
        {
            Ok(pool) => Some(pool),
            Err(e) => {
                log::warn!(
                    "Failed to create hashing thread pool ({}), using global pool with {} threads",
                    e,
                    rayon::current_num_threads()
                );
                None
            }
        };

        let hasher = Hasher::new()
            .with_quick_sample_size(config.quick_sample_size)
            .with_mmap_threshold(config.mmap_threshold);

        log::info!("Catalog now working in directory '{}'", root.display());

        Ok(Self {
            shared: Arc::new(Shared {
                root,
                config,
                hasher,
                pool,
                state: Mutex::new(CatalogState::default()),
                tier_done: Condvar::new(),
                scheduler: BackgroundHashScheduler::new(),
            }),
        })
    }

    fn lock_state(&self) -> MutexGuard<'_, CatalogState> {
        self.shared
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shared
            .config
            .shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Canonical scan root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.shared.root
    }

    /// The hasher used for every tier.
    #[must_use]
    pub fn hasher(&self) -> &Hasher {
        &self.shared.hasher
    }

    /// Number of cataloged files.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock_state().files.len()
    }

    /// Whether the catalog holds no files.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all descriptors in insertion order.
    #[must_use]
    pub fn descriptors(&self) -> Vec<Arc<FileDescriptor>> {
        self.lock_state().files.clone()
    }

    /// Add one file to the catalog.
    ///
    /// The path is canonicalized and must name an existing regular file.
    /// Every tier-complete flag is cleared.
    ///
    /// # Errors
    ///
    /// - [`CatalogError::NotAFile`] if the path is missing or not a regular file
    /// - [`CatalogError::AlreadyCataloged`] if the path was added before
    pub fn add_file(&self, path: impl AsRef<Path>) -> Result<Arc<FileDescriptor>, CatalogError> {
        let path = path.as_ref();
        let not_a_file = || CatalogError::NotAFile(path.to_path_buf());

        let canonical = std::fs::canonicalize(path).map_err(|_| not_a_file())?;
        let metadata = std::fs::metadata(&canonical).map_err(|_| not_a_file())?;
        if !metadata.is_file() {
            return Err(not_a_file());
        }

        let descriptor = Arc::new(FileDescriptor::new(canonical.clone(), metadata.len()));

        let mut state = self.lock_state();
        if !state.paths.insert(canonical.clone()) {
            return Err(CatalogError::AlreadyCataloged(canonical));
        }
        state.files.push(Arc::clone(&descriptor));
        state.complete = [false; 3];
        drop(state);

        log::trace!("Cataloged {} ({} bytes)", canonical.display(), descriptor.size());
        Ok(descriptor)
    }

    /// Whether `tier` is computed for every file currently cataloged.
    #[must_use]
    pub fn is_tier_complete(&self, tier: HashTier) -> bool {
        self.lock_state().complete[tier.index()]
    }

    /// Block until `tier` is complete or `timeout` elapses.
    ///
    /// Returns `true` if the tier completed within the timeout.
    #[must_use]
    pub fn wait_for_tier(&self, tier: HashTier, timeout: Duration) -> bool {
        let guard = self.lock_state();
        let (guard, _) = self
            .shared
            .tier_done
            .wait_timeout_while(guard, timeout, |s| !s.complete[tier.index()])
            .unwrap_or_else(PoisonError::into_inner);
        guard.complete[tier.index()]
    }

    /// Compute `tier` for every file lacking it, on the calling thread.
    ///
    /// Earlier tiers that are not complete are computed first. Per-file
    /// failures are logged and collected in the returned stats.
    pub fn compute_tier(&self, tier: HashTier) -> TierStats {
        let never = AtomicBool::new(false);
        self.compute_tier_cancellable(tier, &never)
    }

    /// Like [`compute_tier`](Self::compute_tier), stopping between files
    /// once `cancel` is set. An interrupted tier is not marked complete.
    pub fn compute_tier_cancellable(&self, tier: HashTier, cancel: &AtomicBool) -> TierStats {
        let mut stats = TierStats::new(tier);
        let cancelled = || cancel.load(Ordering::SeqCst) || self.is_shutdown_requested();

        loop {
            if let Some(prev) = tier.previous() {
                if !self.is_tier_complete(prev) {
                    stats.absorb(self.compute_tier_cancellable(prev, cancel));
                    if stats.interrupted {
                        return stats;
                    }
                }
            }

            let (snapshot, epoch) = {
                let state = self.lock_state();
                (state.files.clone(), state.epoch)
            };

            log::debug!(
                "Start computing {} hashes for all {} known files",
                tier,
                snapshot.len()
            );
            let interrupted = self.run_pass(tier, &snapshot, &cancelled, &mut stats);
            if interrupted || cancelled() {
                stats.interrupted = true;
                log::info!("Computing {} hashes interrupted", tier);
                return stats;
            }

            let mut state = self.lock_state();
            if state.epoch != epoch {
                log::debug!("Catalog reset while computing {} hashes", tier);
                stats.interrupted = true;
                return stats;
            }
            let earlier_complete = tier
                .previous()
                .map_or(true, |p| state.complete[p.index()]);
            if state.files.len() == snapshot.len() && earlier_complete {
                state.complete[tier.index()] = true;
                drop(state);
                self.shared.tier_done.notify_all();
                log::debug!(
                    "Done computing {} hashes for all {} known files",
                    tier,
                    snapshot.len()
                );
                return stats;
            }
            log::debug!("Files added while computing {} hashes, rescanning", tier);
        }
    }

    /// Hash every eligible file in `snapshot` at `tier`.
    ///
    /// Returns `true` if any file was interrupted.
    fn run_pass(
        &self,
        tier: HashTier,
        snapshot: &[Arc<FileDescriptor>],
        cancelled: &(dyn Fn() -> bool + Sync),
        stats: &mut TierStats,
    ) -> bool {
        let (pending, skipped) = eligible_for(tier, snapshot);
        stats.input_files = snapshot.len();
        stats.skipped_files = skipped;

        if pending.is_empty() {
            return false;
        }

        let callback = self.shared.config.progress_callback.as_ref();
        if let Some(cb) = callback {
            cb.on_phase_start(tier.name(), pending.len());
        }

        let done = AtomicUsize::new(0);
        let hash_one = |descriptor: &Arc<FileDescriptor>| {
            if cancelled() {
                return PassOutcome::Interrupted;
            }
            if let Some(cb) = callback {
                let current = done.fetch_add(1, Ordering::Relaxed) + 1;
                cb.on_progress(tier.name(), current, descriptor.path().to_string_lossy().as_ref());
            }
            let outcome = self.hash_descriptor(descriptor, tier, cancelled);
            if let Some(cb) = callback {
                cb.on_item_completed(descriptor.size());
            }
            outcome
        };

        let outcomes: Vec<PassOutcome> = match &self.shared.pool {
            Some(pool) => pool.install(|| pending.par_iter().map(hash_one).collect()),
            None => pending.par_iter().map(hash_one).collect(),
        };

        if let Some(cb) = callback {
            cb.on_phase_end(tier.name());
        }

        let mut interrupted = false;
        for outcome in outcomes {
            match outcome {
                PassOutcome::Hashed => stats.hashed_files += 1,
                PassOutcome::Failed(e) => {
                    stats.failed_files += 1;
                    stats.errors.push(e);
                }
                PassOutcome::Interrupted => interrupted = true,
            }
        }
        interrupted
    }

    fn hash_descriptor(
        &self,
        descriptor: &FileDescriptor,
        tier: HashTier,
        cancelled: &(dyn Fn() -> bool + Sync),
    ) -> PassOutcome {
        let hasher = &self.shared.hasher;
        let state = descriptor.get_or_compute(tier, || {
            // A quick digest of a short file already covers all of it, unless
            // the file changed length since discovery.
            if tier == HashTier::Full
                && hasher.quick_covers_whole_file(descriptor.size())
                && length_unchanged(descriptor)
            {
                if let Some(quick @ HashValue::Digest(_)) = descriptor.hash(HashTier::Quick) {
                    return Ok(quick);
                }
            }
            hasher.compute(descriptor.path(), descriptor.size(), tier, cancelled)
        });

        match state {
            TierState::Computed(_) => PassOutcome::Hashed,
            TierState::Failed(e) => {
                log::warn!("Failed to compute {} hash: {}", tier, e);
                PassOutcome::Failed(e)
            }
            TierState::NotComputed => PassOutcome::Interrupted,
        }
    }

    /// Start hashing all tiers on a background thread.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ConcurrentStartRejected`] if a run is
    /// already in flight for this catalog.
    pub fn start_background_hashing(&self) -> Result<(), SchedulerError> {
        self.shared.scheduler.start(self.clone())
    }

    /// Request cooperative cancellation of the background run, if any.
    pub fn cancel_background_hashing(&self) {
        self.shared.scheduler.cancel();
    }

    /// Wait for the background run to exit.
    ///
    /// Returns `Some(true)` if it finished every tier, `Some(false)` if it was
    /// cancelled or panicked, and `None` if no run was started.
    pub fn join_background_hashing(&self) -> Option<bool> {
        self.shared.scheduler.join()
    }

    /// Whether a background run is in flight.
    #[must_use]
    pub fn is_background_hashing(&self) -> bool {
        self.shared.scheduler.is_running()
    }

    /// Partition the catalog by hashes through `tier`.
    ///
    /// Only hashes already computed are used; this never triggers hashing.
    #[must_use]
    pub fn group(&self, tier: HashTier, include_singletons: bool) -> SimilarFileSet {
        DuplicateGrouper::new(include_singletons).group(self, tier)
    }

    /// Return the catalog to its just-constructed state.
    ///
    /// Any background run is cancelled and joined first.
    pub fn reset(&self) {
        self.shared.scheduler.cancel();
        self.shared.scheduler.join();

        let mut state = self.lock_state();
        state.files.clear();
        state.paths.clear();
        state.complete = [false; 3];
        state.epoch += 1;
        drop(state);

        log::info!("Reset of catalog successful");
    }
}

fn length_unchanged(descriptor: &FileDescriptor) -> bool {
    std::fs::metadata(descriptor.path()).is_ok_and(|m| m.len() == descriptor.size())
}

/// Files in `snapshot` that should be hashed at `tier`, and how many
/// unsettled files gating left out.
///
/// Above `Size`, a file qualifies only if its key through the previous tier
/// is shared with at least one other file. Each file's state is read once,
/// so both numbers agree even while another caller settles files.
fn eligible_for(
    tier: HashTier,
    snapshot: &[Arc<FileDescriptor>],
) -> (Vec<Arc<FileDescriptor>>, usize) {
    let keys: Option<Vec<Option<Vec<HashValue>>>> = tier
        .previous()
        .map(|prev| snapshot.iter().map(|d| d.key_through(prev)).collect());
    let mut counts: HashMap<&[HashValue], usize> = HashMap::new();
    for key in keys.iter().flatten().flatten() {
        *counts.entry(key.as_slice()).or_default() += 1;
    }

    let mut pending = Vec::new();
    let mut skipped = 0;
    for (i, descriptor) in snapshot.iter().enumerate() {
        if descriptor.state(tier).is_settled() {
            continue;
        }
        let shared = match &keys {
            None => true,
            Some(keys) => keys[i]
                .as_deref()
                .is_some_and(|k| counts.get(k).copied().unwrap_or(0) >= 2),
        };
        if shared {
            pending.push(Arc::clone(descriptor));
        } else {
            skipped += 1;
        }
    }
    (pending, skipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_new_rejects_missing_root() {
        let dir = TempDir::new().unwrap();
        let result = FileCatalog::new(dir.path().join("nope"));
        assert!(matches!(result, Err(CatalogError::InvalidRoot(_))));
    }

    #[test]
    fn test_add_file_rejects_directory_and_missing() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();

        assert!(matches!(
            catalog.add_file(dir.path()),
            Err(CatalogError::NotAFile(_))
        ));
        assert!(matches!(
            catalog.add_file(dir.path().join("missing")),
            Err(CatalogError::NotAFile(_))
        ));
        assert!(catalog.is_empty());
    }

    #[test]
    fn test_add_file_rejects_duplicate_path() {
        let dir = TempDir::new().unwrap();
        let a = write(&dir, "a.txt", b"a");
        let catalog = FileCatalog::new(dir.path()).unwrap();

        catalog.add_file(&a).unwrap();
        assert!(matches!(
            catalog.add_file(&a),
            Err(CatalogError::AlreadyCataloged(_))
        ));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn test_compute_size_marks_complete() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        catalog.add_file(write(&dir, "a.txt", b"0123456789")).unwrap();

        assert!(!catalog.is_tier_complete(HashTier::Size));
        let stats = catalog.compute_tier(HashTier::Size);

        assert!(catalog.is_tier_complete(HashTier::Size));
        assert_eq!(stats.hashed_files, 1);
        assert!(!stats.interrupted);
    }

    #[test]
    fn test_compute_full_completes_earlier_tiers() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        catalog.add_file(write(&dir, "a.txt", b"same")).unwrap();
        catalog.add_file(write(&dir, "b.txt", b"same")).unwrap();

        catalog.compute_tier(HashTier::Full);

        for tier in HashTier::ALL {
            assert!(catalog.is_tier_complete(tier), "{tier} incomplete");
        }
        for d in catalog.descriptors() {
            assert!(d.hash(HashTier::Full).is_some());
        }
    }

    #[test]
    fn test_gating_skips_unique_sizes() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        let a = catalog.add_file(write(&dir, "a.txt", b"same")).unwrap();
        let b = catalog.add_file(write(&dir, "b.txt", b"same")).unwrap();
        let c = catalog.add_file(write(&dir, "c.txt", b"longer")).unwrap();

        let stats = catalog.compute_tier(HashTier::Quick);

        assert!(a.hash(HashTier::Quick).is_some());
        assert!(b.hash(HashTier::Quick).is_some());
        assert!(c.hash(HashTier::Quick).is_none());
        assert_eq!(stats.skipped_files, 1);
    }

    #[test]
    fn test_eligible_for_counts_only_unsettled_files() {
        let sized = |name: &str, size: u64| {
            let d = FileDescriptor::new(PathBuf::from(name), size);
            d.record(HashTier::Size, Ok(HashValue::Size(size)));
            Arc::new(d)
        };
        let a = sized("/t/a", 4);
        let b = sized("/t/b", 4);
        let c = sized("/t/c", 9);
        // Settled by another caller before this pass looked.
        a.record(HashTier::Quick, Ok(HashValue::Digest([7; 32])));

        let (pending, skipped) = eligible_for(HashTier::Quick, &[a, Arc::clone(&b), c]);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].path(), b.path());
        assert_eq!(skipped, 1);

        b.record(HashTier::Quick, Ok(HashValue::Digest([7; 32])));
        let (pending, _) = eligible_for(HashTier::Quick, &[b]);
        assert!(pending.is_empty());
    }

    #[test]
    fn test_full_reuses_quick_for_small_files() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        let a = catalog.add_file(write(&dir, "a.txt", b"same")).unwrap();
        catalog.add_file(write(&dir, "b.txt", b"same")).unwrap();

        catalog.compute_tier(HashTier::Full);
        assert_eq!(a.hash(HashTier::Quick), a.hash(HashTier::Full));
    }

    #[test]
    fn test_full_ignores_quick_after_file_grew() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        let a_path = write(&dir, "a.txt", b"same");
        let b_path = write(&dir, "b.txt", b"same");
        let a = catalog.add_file(&a_path).unwrap();
        let b = catalog.add_file(&b_path).unwrap();
        catalog.compute_tier(HashTier::Size);

        // Both grow past the quick sample and differ only beyond it.
        let mut grown_a = vec![b'x'; PREHASH_SIZE];
        let mut grown_b = grown_a.clone();
        grown_a.extend_from_slice(b"tail-a");
        grown_b.extend_from_slice(b"tail-b");
        fs::write(&a_path, &grown_a).unwrap();
        fs::write(&b_path, &grown_b).unwrap();

        catalog.compute_tier(HashTier::Full);

        assert_eq!(a.hash(HashTier::Quick), b.hash(HashTier::Quick));
        assert_ne!(a.hash(HashTier::Full), a.hash(HashTier::Quick));
        assert_ne!(a.hash(HashTier::Full), b.hash(HashTier::Full));
        assert!(catalog.group(HashTier::Full, false).is_empty());
    }

    #[test]
    fn test_add_after_complete_clears_flag() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        catalog.add_file(write(&dir, "a.txt", b"a")).unwrap();
        catalog.compute_tier(HashTier::Size);
        assert!(catalog.is_tier_complete(HashTier::Size));

        catalog.add_file(write(&dir, "b.txt", b"b")).unwrap();
        assert!(!catalog.is_tier_complete(HashTier::Size));

        catalog.compute_tier(HashTier::Size);
        assert!(catalog.is_tier_complete(HashTier::Size));
    }

    #[test]
    fn test_vanished_file_is_recorded_as_failure() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        let a = write(&dir, "a.txt", b"same");
        let b = write(&dir, "b.txt", b"same");
        catalog.add_file(&a).unwrap();
        let gone = catalog.add_file(&b).unwrap();
        fs::remove_file(&b).unwrap();

        let stats = catalog.compute_tier(HashTier::Full);

        assert_eq!(stats.failed_files, 1);
        assert!(matches!(stats.errors[0], HashError::FileUnavailable(_)));
        assert!(gone.has_failed());
        assert!(catalog.is_tier_complete(HashTier::Full));
    }

    #[test]
    fn test_cancelled_compute_does_not_mark_complete() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        catalog.add_file(write(&dir, "a.txt", b"a")).unwrap();

        let cancel = AtomicBool::new(true);
        let stats = catalog.compute_tier_cancellable(HashTier::Size, &cancel);

        assert!(stats.interrupted);
        assert!(!catalog.is_tier_complete(HashTier::Size));
    }

    #[test]
    fn test_shutdown_flag_interrupts() {
        let dir = TempDir::new().unwrap();
        let config = CatalogConfig::default().with_shutdown_flag(Arc::new(AtomicBool::new(true)));
        let catalog = FileCatalog::with_config(dir.path(), config).unwrap();
        catalog.add_file(write(&dir, "a.txt", b"a")).unwrap();

        let stats = catalog.compute_tier(HashTier::Size);
        assert!(stats.interrupted);
        assert!(!catalog.is_tier_complete(HashTier::Size));
    }

    #[test]
    fn test_wait_for_tier_times_out_when_incomplete() {
        let dir = TempDir::new().unwrap();
        let catalog = FileCatalog::new(dir.path()).unwrap();
        assert!(!catalog.wait_for_tier(HashTier::Size, Duration::from_millis(10)));
    }

    #[test]
    fn test_config_builder_clamps() {
        let config = CatalogConfig::default()
            .with_io_threads(0)
            .with_quick_sample_size(0);
        assert_eq!(config.io_threads, 1);
        assert_eq!(config.quick_sample_size, 1);
    }
}


