//! Cooperative cancellation for long-running computations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::AnalyticsError;

/// Shared flag checked by the bootstrap and clustering loops at iteration
/// boundaries.
///
/// Clones share the same flag, so the HTTP layer can keep one clone and
/// hand another to the worker thread.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    /// Creates a token that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    /// Returns `true` once [`Self::cancel`] has been called on any clone.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }

    /// Returns [`AnalyticsError::Cancelled`] if cancellation was requested.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyticsError::Cancelled`] if the token was cancelled.
    pub fn check(&self) -> Result<(), AnalyticsError> {
        if self.is_cancelled() {
            Err(AnalyticsError::Cancelled)
        } else {
            Ok(())
        }
    }

    /// Returns a guard that cancels this token when dropped unless
    /// [`CancelOnDrop::disarm`] was called first.
    #[must_use]
    pub fn cancel_on_drop(&self) -> CancelOnDrop {
        CancelOnDrop {
            token: self.clone(),
            armed: true,
        }
    }
}

/// Cancels its token on drop. Held by a request future so that a dropped
/// request abandons the worker computation.
#[derive(Debug)]
pub struct CancelOnDrop {
    token: CancelToken,
    armed: bool,
}

impl CancelOnDrop {
    /// Prevents cancellation on drop.
    pub const fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for CancelOnDrop {
    fn drop(&mut self) {
        if self.armed {
            self.token.cancel();
        }
    }
}
