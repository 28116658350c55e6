//! Ctrl+C handling for graceful shutdown.
//!
//! The handler sets a shared `AtomicBool`. The walker stops yielding paths,
//! and the catalog stops hashing between files and between read chunks,
//! so a cancelled tier never caches a partial hash.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Shared shutdown flag.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandler {
    flag: Arc<AtomicBool>,
}

impl ShutdownHandler {
    /// Create a handler with no shutdown requested.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Manually request a shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// The flag to hand to the walker and the catalog.
    #[must_use]
    pub fn get_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.flag)
    }

    /// Clear the flag.
    pub fn reset(&self) {
        self.flag.store(false, Ordering::SeqCst);
    }
}

/// Error type for signal handler installation.
#[derive(Debug, thiserror::Error)]
pub enum SignalError {
    /// Failed to install the Ctrl+C handler.
    #[error("Failed to install signal handler: {0}")]
    InstallFailed(#[from] ctrlc::Error),
}

static GLOBAL_HANDLER: OnceLock<ShutdownHandler> = OnceLock::new();

/// Install the process-wide Ctrl+C handler, or reuse the installed one.
///
/// Repeated calls (e.g. several `run_app` invocations in one test process)
/// return the same handler with its flag cleared.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the hook cannot be registered
/// and no handler was installed before.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    let mut install_error = None;
    let handler = GLOBAL_HANDLER.get_or_init(|| {
        let handler = ShutdownHandler::new();
        let flag = handler.get_flag();
        if let Err(e) = ctrlc::set_handler(move || {
            flag.store(true, Ordering::SeqCst);
            let _ = writeln!(std::io::stderr(), "\nInterrupted. Cleaning up...");
            let _ = std::io::stderr().flush();
            log::info!("Shutdown signal received");
        }) {
            install_error = Some(e);
        }
        handler
    });

    if let Some(e) = install_error {
        log::debug!("Ctrl+C handler not installed: {}", e);
        if !matches!(e, ctrlc::Error::MultipleHandlers) {
            return Err(SignalError::InstallFailed(e));
        }
    }

    handler.reset();
    Ok(handler.clone())
}
