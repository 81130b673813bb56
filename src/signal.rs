//! Ctrl+C handling.
//!
//! A single process-wide handler sets an `AtomicBool`. The flag is handed to
//! the walker, hasher and finder, which check it between entries and between
//! blocks and stop with [`FinderError::Interrupted`].
//!
//! [`FinderError::Interrupted`]: crate::duplicates::FinderError::Interrupted
//!
//! ```rust,no_run
//! use fildup::duplicates::FinderConfig;
//! use fildup::signal::install_handler;
//!
//! let handler = install_handler().expect("signal handler");
//! let config = FinderConfig::default().with_shutdown_flag(handler.get_flag());
//! ```

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

    /// Whether Ctrl+C was pressed or [`request_shutdown`](Self::request_shutdown) was called.
    #[must_use]
    pub fn is_shutdown_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Request shutdown.
    pub fn request_shutdown(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Clone of the flag for the walker, hasher and finder.
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

/// Install the process-wide Ctrl+C handler, or reuse it if one exists.
///
/// Reusing clears the flag, so repeated runs in one process (tests calling
/// `run_app`) each start fresh.
///
/// # Errors
///
/// Returns [`SignalError::InstallFailed`] if the OS rejects the handler.
pub fn install_handler() -> Result<ShutdownHandler, SignalError> {
    if let Some(handler) = GLOBAL_HANDLER.get() {
        handler.reset();
        return Ok(handler.clone());
    }

    let handler = ShutdownHandler::new();
    let flag = handler.get_flag();

    match ctrlc::set_handler(move || {
        flag.store(true, Ordering::SeqCst);
        let _ = writeln!(std::io::stderr(), "\nInterrupted. Stopping scan...");
        log::info!("Shutdown signal received");
    }) {
        Ok(()) => {
            // Lost a race with another thread: keep the handler ctrlc now owns.
            if GLOBAL_HANDLER.set(handler.clone()).is_err() {
                log::debug!("Signal handler registered concurrently");
            }
            Ok(handler)
        }
        Err(ctrlc::Error::MultipleHandlers) => {
            let existing = GLOBAL_HANDLER.get_or_init(|| {
                log::debug!("Ctrl+C handler already registered, using unhooked flag");
                ShutdownHandler::new()
            });
            existing.reset();
            Ok(existing.clone())
        }
        Err(e) => Err(SignalError::InstallFailed(e)),
    }
}
