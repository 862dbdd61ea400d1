//! Cooperative cancellation for long-running operations.
//!
//! Traversals, duplicate detection, diffing, and analytics poll a
//! [`CancelToken`] at well-defined points (once per generation expansion,
//! once per block, once per record pair). A cancelled operation returns
//! [`GedcomError::Cancelled`] instead of partial results.

use crate::GedcomError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A cloneable cancellation signal, optionally carrying a deadline.
#[derive(Clone, Debug, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Creates a token that never expires on its own.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a token that reports cancellation after `timeout` elapses.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline: Some(Instant::now() + timeout),
            }),
        }
    }

    /// Signals cancellation to every clone of this token.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    /// True once [`cancel`](Self::cancel) was called or the deadline passed.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        match self.inner.deadline {
            Some(deadline) => Instant::now() >= deadline,
            None => false,
        }
    }

    /// Polls the token, returning [`GedcomError::Cancelled`] when tripped.
    ///
    /// # Errors
    ///
    /// Returns `GedcomError::Cancelled` if the token was cancelled or its
    /// deadline has passed.
    pub fn check(&self) -> Result<(), GedcomError> {
        if self.is_cancelled() {
            Err(GedcomError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// Polls an optional token; `None` never cancels.
pub(crate) fn check_opt(token: Option<&CancelToken>) -> Result<(), GedcomError> {
    match token {
        Some(token) => token.check(),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancel_propagates_to_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        token.cancel();
        assert!(clone.is_cancelled());
        assert!(matches!(clone.check(), Err(GedcomError::Cancelled)));
    }

    #[test]
    fn test_expired_deadline_cancels() {
        let token = CancelToken::with_timeout(Duration::from_millis(0));
        assert!(token.is_cancelled());
    }
}
