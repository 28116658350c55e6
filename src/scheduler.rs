//! Background hashing worker.
//!
//! # Overview
//!
//! [`BackgroundHashScheduler`] runs `Size`, then `Quick`, then `Full` over a
//! whole [`FileCatalog`] on a dedicated, named thread, so the caller can keep
//! discovering files or querying state. Each catalog owns exactly one
//! scheduler and at most one run is in flight at a time.
//!
//! The run checks a cooperative cancellation flag between files (and between
//! read chunks inside a file). Tiers finished before cancellation keep their
//! results; the interrupted tier is never marked complete.
//!
//! Callers learn about completion through
//! [`FileCatalog::wait_for_tier`], which blocks on a condition variable.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};

use crate::catalog::FileCatalog;
use crate::scanner::HashTier;

/// Errors from starting a background run.
#[derive(thiserror::Error, Debug)]
pub enum SchedulerError {
    /// A run is already in flight for this catalog.
    #[error("Background hashing is already running")]
    ConcurrentStartRejected,

    /// The worker thread could not be spawned.
    #[error("Failed to spawn hashing thread: {0}")]
    Spawn(#[from] std::io::Error),
}

#[derive(Debug)]
struct Worker {
    handle: Option<JoinHandle<bool>>,
    cancel: Arc<AtomicBool>,
    active: Arc<AtomicBool>,
}

/// Owner of a catalog's background hashing thread.
#[derive(Debug, Default)]
pub struct BackgroundHashScheduler {
    worker: Mutex<Option<Worker>>,
}

/// Clears the `active` flag however the worker exits.
struct ActiveGuard(Arc<AtomicBool>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl BackgroundHashScheduler {
    /// Create an idle scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_worker(&self) -> MutexGuard<'_, Option<Worker>> {
        self.worker.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start computing every tier of `catalog` without blocking.
    ///
    /// A scheduler whose previous run has exited can be started again; the
    /// old thread is joined first.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::ConcurrentStartRejected`] if a run is still
    /// in flight. Nothing changes in that case.
    pub fn start(&self, catalog: FileCatalog) -> Result<(), SchedulerError> {
        let mut slot = self.lock_worker();

        if let Some(worker) = slot.as_mut() {
            if worker.active.load(Ordering::SeqCst) {
                log::warn!("Background hashing already running, start rejected");
                return Err(SchedulerError::ConcurrentStartRejected);
            }
            if let Some(handle) = worker.handle.take() {
                let _ = handle.join();
            }
        }

        let cancel = Arc::new(AtomicBool::new(false));
        let active = Arc::new(AtomicBool::new(true));
        let run_cancel = Arc::clone(&cancel);
        let guard = ActiveGuard(Arc::clone(&active));

        let handle = thread::Builder::new()
            .name("tierdupe-hasher".to_string())
            .spawn(move || {
                let _guard = guard;
                process_hashing(&catalog, &run_cancel)
            })?;

        *slot = Some(Worker {
            handle: Some(handle),
            cancel,
            active,
        });
        Ok(())
    }

    /// Whether a run is in flight.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.lock_worker()
            .as_ref()
            .is_some_and(|w| w.active.load(Ordering::SeqCst))
    }

    /// Ask the current run to stop at the next file boundary.
    pub fn cancel(&self) {
        if let Some(worker) = self.lock_worker().as_ref() {
            if worker.active.load(Ordering::SeqCst) {
                log::info!("Cancelling background hashing");
            }
            worker.cancel.store(true, Ordering::SeqCst);
        }
    }

    /// Wait for the current run to exit.
    ///
    /// Returns `Some(true)` if every tier completed, `Some(false)` if the
    /// run was cancelled or panicked, and `None` if there is nothing to join.
    pub fn join(&self) -> Option<bool> {
        // Take the handle so the lock is not held while joining.
        let handle = self.lock_worker().as_mut()?.handle.take()?;
        match handle.join() {
            Ok(finished) => Some(finished),
            Err(_) => {
                log::error!("Background hashing thread panicked");
                Some(false)
            }
        }
    }
}

/// Compute every tier in order. Returns `true` if all tiers completed.
fn process_hashing(catalog: &FileCatalog, cancel: &AtomicBool) -> bool {
    log::info!(
        "Start background hashing of {} known files",
        catalog.len()
    );

    for tier in HashTier::ALL {
        let stats = catalog.compute_tier_cancellable(tier, cancel);
        if stats.interrupted {
            log::info!("Background hashing stopped during {} tier", tier);
            return false;
        }
        log::info!(
            "{} tier complete: {} hashed, {} skipped, {} failed",
            tier,
            stats.hashed_files,
            stats.skipped_files,
            stats.failed_files
        );
    }
    true
}
