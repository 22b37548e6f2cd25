//! Cooperative cancellation for pagination calls.
//!
//! A [`CancelToken`] fires when it is cancelled explicitly, when its deadline
//! passes, or when any ancestor token fires. Children are cheap to derive, so
//! the engine hands each query its own child and can abort one sibling
//! without touching the caller's token.

use crate::source::SourceError;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

#[derive(Debug, Default)]
struct Inner {
    cancelled: AtomicBool,
    deadline: Option<Instant>,
    parent: Option<CancelToken>,
}

impl CancelToken {
    /// A token that only fires when cancelled explicitly.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A root token that fires once `timeout` has elapsed.
    #[must_use]
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::new().child_with_timeout(timeout)
    }

    /// Derive a child that fires whenever `self` fires.
    #[must_use]
    pub fn child(&self) -> Self {
        self.derive(None)
    }

    /// Derive a child that additionally fires after `timeout`.
    #[must_use]
    pub fn child_with_timeout(&self, timeout: Duration) -> Self {
        self.derive(Instant::now().checked_add(timeout))
    }

    fn derive(&self, deadline: Option<Instant>) -> Self {
        Self {
            inner: Arc::new(Inner {
                cancelled: AtomicBool::new(false),
                deadline,
                parent: Some(self.clone()),
            }),
        }
    }

    /// Fire this token and every child derived from it.
    pub fn cancel(&self) {
        self.inner.cancelled.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        if self.inner.cancelled.load(Ordering::Acquire) {
            return true;
        }
        if self
            .inner
            .deadline
            .is_some_and(|deadline| Instant::now() >= deadline)
        {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(Self::is_cancelled)
    }

    /// Return `Err(SourceError::Cancelled)` if the token has fired.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Cancelled`] when the token has fired.
    pub fn check(&self) -> Result<(), SourceError> {
        if self.is_cancelled() {
            Err(SourceError::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CancelToken;
    use std::time::Duration;

    #[test]
    fn fresh_token_is_live() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(token.check().is_ok());
    }

    #[test]
    fn parent_cancellation_reaches_children() {
        let parent = CancelToken::new();
        let child = parent.child();
        let grandchild = child.child();

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn child_cancellation_does_not_reach_parent() {
        let parent = CancelToken::new();
        let child = parent.child();
        let sibling = parent.child();

        child.cancel();
        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
        assert!(!sibling.is_cancelled());
    }

    #[test]
    fn zero_timeout_fires_immediately() {
        let token = CancelToken::with_timeout(Duration::ZERO);
        assert!(token.is_cancelled());
        assert!(token.check().is_err());
    }

    #[test]
    fn expired_parent_deadline_fires_long_lived_child() {
        let outer = CancelToken::with_timeout(Duration::ZERO);
        let inner = outer.child_with_timeout(Duration::from_secs(60));
        assert!(inner.is_cancelled());
    }
}
