//! Cooperative cancellation for tree walks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{Error, Result};

/// Shared cancellation flag with an optional deadline.
///
/// Clones share the flag. Walkers call [`CancelToken::check`] between files,
/// never in the middle of one.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// A token that expires at `deadline`.
    pub fn with_deadline(deadline: Instant) -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            deadline: Some(deadline),
        }
    }

    /// Derive a token sharing this flag, expiring after `timeout` at the latest.
    pub fn child_with_timeout(&self, timeout: Option<Duration>) -> Self {
        let candidate = timeout.map(|t| Instant::now() + t);
        let deadline = match (self.deadline, candidate) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        };
        Self {
            flag: Arc::clone(&self.flag),
            deadline,
        }
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        if self.flag.load(Ordering::SeqCst) {
            return true;
        }
        self.deadline.is_some_and(|d| Instant::now() >= d)
    }

    /// Returns `Error::Cancelled` once the flag is set or the deadline passed.
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_token_is_live() {
        let token = CancelToken::new();
        assert!(token.check().is_ok());
    }

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancelToken::new();
        let clone = token.clone();
        clone.cancel();
        assert!(matches!(token.check(), Err(Error::Cancelled)));
    }

    #[test]
    fn test_expired_deadline() {
        let token = CancelToken::with_deadline(Instant::now());
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_child_keeps_earliest_deadline() {
        let parent = CancelToken::with_deadline(Instant::now());
        let child = parent.child_with_timeout(Some(Duration::from_secs(3600)));
        assert!(child.is_cancelled());

        let open = CancelToken::new().child_with_timeout(Some(Duration::ZERO));
        assert!(open.is_cancelled());

        let none = CancelToken::new().child_with_timeout(None);
        assert!(!none.is_cancelled());
    }
}
