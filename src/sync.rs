//! Synchronization primitives shared by the control and search threads.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// A thread-safe stop flag for controlling search termination.
///
/// Wraps `Arc<AtomicBool>` so the control thread, the search thread, and
/// tests can share one cancellation signal without repeating the pattern.
#[derive(Clone, Debug, Default)]
pub struct StopFlag(Arc<AtomicBool>);

impl StopFlag {
    /// Create a new stop flag (initially not stopped).
    #[must_use]
    pub fn new() -> Self {
        StopFlag(Arc::new(AtomicBool::new(false)))
    }

    /// Check if the stop flag is set.
    #[inline]
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Set the stop flag.
    #[inline]
    pub fn stop(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Clear the stop flag.
    #[inline]
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}

/// Serialized writer for protocol output.
///
/// Both the control thread (readyok, notices) and the search worker
/// (bestmove, info lines) write protocol lines; the lock keeps whole
/// lines from interleaving. Every line is flushed immediately, since
/// GUIs block on engine responses.
pub struct SyncOut {
    out: Mutex<io::Stdout>,
}

impl SyncOut {
    #[must_use]
    pub fn new() -> Self {
        SyncOut {
            out: Mutex::new(io::stdout()),
        }
    }

    /// Write one line of protocol output.
    pub fn line(&self, text: &str) {
        let mut out = self.out.lock();
        let _ = writeln!(out, "{text}");
        let _ = out.flush();
    }
}

impl Default for SyncOut {
    fn default() -> Self {
        Self::new()
    }
}
