//! The cancellation signal a reporter polls.

use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// A shared, polled cancellation flag.
///
/// Reading the flag never consumes it. Only the first reason is kept, and it
/// is visible to every reader that observes the flag.
#[derive(Default)]
pub struct CancellationToken {
    cancelled: AtomicBool,
    reason: RwLock<Option<String>>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Later requests keep the first reason.
    pub fn cancel(&self, reason: impl Into<String>) {
        let mut slot = self.reason.write();
        if self.cancelled.load(Ordering::SeqCst) {
            return;
        }
        let reason = reason.into();
        debug!(reason = %reason, "Cancellation requested");
        *slot = Some(reason);
        // Published only once the reason is in place.
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns whether cancellation has been requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Returns the cancellation reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<String> {
        self.reason.read().clone()
    }
}

impl std::fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .field("reason", &self.reason())
            .finish()
    }
}
